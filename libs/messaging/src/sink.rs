//! Destinations for consumed events.

use async_trait::async_trait;
use courier_events::EventPayload;
use reqwest::StatusCode;
use tracing::debug;

use crate::SinkError;

/// Receives events handled by the consumer.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn log_event(&self, payload: &EventPayload) -> Result<(), SinkError>;
}

/// Posts events as JSON to the logging service.
///
/// The logging service answers `202 Accepted`; any other status is an error.
#[derive(Debug, Clone)]
pub struct HttpLogSink {
    client: reqwest::Client,
    url: String,
}

impl HttpLogSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl EventSink for HttpLogSink {
    async fn log_event(&self, payload: &EventPayload) -> Result<(), SinkError> {
        let response = self.client.post(&self.url).json(payload).send().await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            return Err(SinkError::UnexpectedStatus(status.as_u16()));
        }

        debug!(name = %payload.name, url = %self.url, "Event logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_posts_json_and_accepts_202() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/log"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"name": "log", "data": "x"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let sink = HttpLogSink::new(format!("{}/log", server.uri()));
        sink.log_event(&EventPayload::new("log", "x")).await.unwrap();
    }

    #[tokio::test]
    async fn test_other_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let sink = HttpLogSink::new(server.uri());
        let err = sink
            .log_event(&EventPayload::new("event", "y"))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::UnexpectedStatus(200)));
    }

    #[tokio::test]
    async fn test_unreachable_sink_is_request_error() {
        let sink = HttpLogSink::new("http://127.0.0.1:1/log");
        let err = sink
            .log_event(&EventPayload::new("log", "z"))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Request(_)));
    }
}
