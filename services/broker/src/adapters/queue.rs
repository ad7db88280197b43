//! Queue publisher adapter.

use async_trait::async_trait;
use courier_events::{EventPayload, Severity};
use courier_messaging::{EventEmitter, MessagingError};
use tracing::debug;

use super::Adapter;
use crate::envelope::{LogPayload, ResponseData, ResponseEnvelope};
use crate::error::TransportError;

/// Message returned once the event has been handed to the broker.
pub const QUEUED_MESSAGE: &str = "The event info is sent to the queue.";

/// Something that can put an event on the topic exchange.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, payload: &EventPayload, severity: Severity)
        -> Result<(), MessagingError>;
}

#[async_trait]
impl EventPublisher for EventEmitter {
    async fn publish(
        &self,
        payload: &EventPayload,
        severity: Severity,
    ) -> Result<(), MessagingError> {
        self.push(payload, severity).await
    }
}

/// Publishes log payloads as events, fire-and-forget.
///
/// Generic log events go out as informational.
pub struct QueueAdapter<E = EventEmitter> {
    publisher: E,
}

impl<E: EventPublisher> QueueAdapter<E> {
    pub fn new(publisher: E) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl<E: EventPublisher> Adapter<LogPayload> for QueueAdapter<E> {
    async fn call(&self, payload: LogPayload) -> Result<ResponseEnvelope, TransportError> {
        let event = EventPayload::from(payload.clone());
        self.publisher.publish(&event, Severity::Info).await?;

        debug!(name = %payload.name, severity = %Severity::Info, "Event queued");
        Ok(ResponseEnvelope::success(QUEUED_MESSAGE).with_data(ResponseData::Log(payload)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakePublisher {
        published: Mutex<Vec<(EventPayload, Severity)>>,
        fail: bool,
    }

    #[async_trait]
    impl EventPublisher for FakePublisher {
        async fn publish(
            &self,
            payload: &EventPayload,
            severity: Severity,
        ) -> Result<(), MessagingError> {
            if self.fail {
                return Err(MessagingError::ConsumerClosed);
            }
            self.published
                .lock()
                .unwrap()
                .push((payload.clone(), severity));
            Ok(())
        }
    }

    fn log() -> LogPayload {
        LogPayload {
            name: "test".to_string(),
            data: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publishes_info_event_and_echoes_payload() {
        let adapter = QueueAdapter::new(FakePublisher::default());
        let envelope = adapter.call(log()).await.unwrap();

        assert!(!envelope.error);
        assert_eq!(envelope.message, QUEUED_MESSAGE);
        assert_eq!(envelope.data, Some(ResponseData::Log(log())));

        let published = adapter.publisher.published.lock().unwrap();
        assert_eq!(
            *published,
            vec![(EventPayload::new("test", "hello"), Severity::Info)]
        );
    }

    #[tokio::test]
    async fn test_publish_failure_is_transport_error() {
        let adapter = QueueAdapter::new(FakePublisher {
            fail: true,
            ..Default::default()
        });
        let err = adapter.call(log()).await.unwrap_err();
        assert!(matches!(err, TransportError::Publish(_)));
    }
}
