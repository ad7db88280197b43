//! JSON-over-HTTP adapter for the authentication and mail services.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::Adapter;
use crate::envelope::ResponseEnvelope;
use crate::error::TransportError;

/// Posts the payload to a fixed URL and decodes the reply envelope.
///
/// The downstream status code is copied into the envelope. No retry and no
/// request timeout.
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: reqwest::Client,
    url: String,
}

impl HttpAdapter {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<P> Adapter<P> for HttpAdapter
where
    P: Serialize + Send + Sync + 'static,
{
    async fn call(&self, payload: P) -> Result<ResponseEnvelope, TransportError> {
        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();

        let mut envelope: ResponseEnvelope = response.json().await?;
        envelope.status_code = Some(status.as_u16());

        debug!(
            url = %self.url,
            status = status.as_u16(),
            error = envelope.error,
            "Downstream replied"
        );
        Ok(envelope)
    }
}
