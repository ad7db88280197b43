//! Topic exchange publisher.

use courier_events::{EventPayload, Severity, EXCHANGE_NAME};
use lapin::options::BasicPublishOptions;
use lapin::BasicProperties;
use tracing::{debug, warn};

use crate::topology::declare_exchange;
use crate::{BrokerHandle, MessagingError};

/// Publishes events on a transient channel of the shared connection.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    broker: BrokerHandle,
}

impl EventEmitter {
    pub fn new(broker: BrokerHandle) -> Self {
        Self { broker }
    }

    /// Publish `payload` with the routing key of `severity`.
    ///
    /// Publisher confirms are off, so success means the client accepted the
    /// frame. Nothing waits for a consumer.
    pub async fn push(
        &self,
        payload: &EventPayload,
        severity: Severity,
    ) -> Result<(), MessagingError> {
        let body = payload.to_body()?;
        let channel = self.broker.open_channel().await?;

        let published = async {
            declare_exchange(&channel).await?;
            channel
                .basic_publish(
                    EXCHANGE_NAME,
                    severity.routing_key(),
                    BasicPublishOptions::default(),
                    &body,
                    BasicProperties::default().with_content_type("text/plain".into()),
                )
                .await?;
            Ok::<(), lapin::Error>(())
        }
        .await;

        if let Err(e) = channel.close(200, "OK").await {
            warn!(error = %e, "Failed to close publish channel");
        }

        published?;
        debug!(
            name = %payload.name,
            routing_key = severity.routing_key(),
            "Published event"
        );
        Ok(())
    }
}
