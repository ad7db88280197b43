//! Topic exchange consumer.
//!
//! Binds a server-named, exclusive queue to the exchange for a static list of
//! topic patterns and consumes it with automatic acknowledgement. A message
//! counts as delivered once it leaves the broker, so a crash before the sink
//! call completes loses it.

use std::sync::Arc;

use courier_events::{EventPayload, EXCHANGE_NAME};
use futures_util::{Stream, StreamExt};
use lapin::options::BasicConsumeOptions;
use lapin::types::FieldTable;
use tracing::{debug, error, info, warn};

use crate::pool::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use crate::topology::{bind_topics, declare_exchange, declare_random_queue};
use crate::{BrokerHandle, EventSink, HandlerPool, MessagingError};

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Concurrent handler tasks.
    pub workers: usize,
    /// Payloads allowed to wait for a free handler.
    pub queue_capacity: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ConsumerConfig {
    /// Read `CONSUMER_WORKERS` and `CONSUMER_QUEUE_CAPACITY`, falling back
    /// to the defaults for unset variables.
    pub fn from_env() -> Result<Self, MessagingError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, MessagingError> {
        let defaults = Self::default();
        let read = |var: &'static str, default: usize| match get(var) {
            None => Ok(default),
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(MessagingError::InvalidConfig { var, value }),
            },
        };

        Ok(Self {
            workers: read("CONSUMER_WORKERS", defaults.workers)?,
            queue_capacity: read("CONSUMER_QUEUE_CAPACITY", defaults.queue_capacity)?,
        })
    }
}

pub struct Consumer {
    broker: BrokerHandle,
    sink: Arc<dyn EventSink>,
    config: ConsumerConfig,
}

impl Consumer {
    /// Create a consumer and make sure the exchange exists.
    pub async fn new(
        broker: BrokerHandle,
        sink: Arc<dyn EventSink>,
        config: ConsumerConfig,
    ) -> Result<Self, MessagingError> {
        let channel = broker.open_channel().await?;
        declare_exchange(&channel).await?;
        if let Err(e) = channel.close(200, "OK").await {
            warn!(error = %e, "Failed to close setup channel");
        }

        Ok(Self {
            broker,
            sink,
            config,
        })
    }

    /// Consume until the channel or connection goes away.
    ///
    /// Never returns `Ok`; the owning process should treat the returned
    /// error as fatal.
    pub async fn listen(&self, topics: &[String]) -> Result<(), MessagingError> {
        let channel = self.broker.open_channel().await?;
        let queue = declare_random_queue(&channel).await?;
        let queue_name = queue.name().as_str().to_string();

        bind_topics(&channel, &queue_name, topics).await?;

        let deliveries = channel
            .basic_consume(
                &queue_name,
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        info!(
            exchange = EXCHANGE_NAME,
            queue = %queue_name,
            topics = ?topics,
            workers = self.config.workers,
            "Waiting for messages"
        );

        let pool = HandlerPool::new(
            self.config.workers,
            self.config.queue_capacity,
            Arc::clone(&self.sink),
        );

        let bodies = deliveries.map(|delivery| {
            delivery.map(|delivery| {
                debug!(routing_key = delivery.routing_key.as_str(), "Received event");
                delivery.data
            })
        });
        let result = pump(bodies, &pool).await;

        if let Err(e) = &result {
            error!(error = %e, queue = %queue_name, "Consumer stopped");
        }
        pool.shutdown().await;
        result
    }
}

/// Decode every message body and queue it on the pool until the stream
/// ends or yields an error.
///
/// Undecodable bodies become the zero-valued payload. An ended stream is
/// reported as [`MessagingError::ConsumerClosed`].
async fn pump<S, E>(mut bodies: S, pool: &HandlerPool) -> Result<(), MessagingError>
where
    S: Stream<Item = Result<Vec<u8>, E>> + Unpin,
    MessagingError: From<E>,
{
    while let Some(body) = bodies.next().await {
        let payload = EventPayload::from_body_lossy(&body?);
        debug!(name = %payload.name, "Queueing event");
        pool.submit(payload).await?;
    }
    Err(MessagingError::ConsumerClosed)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures_util::stream;

    use super::*;
    use crate::SinkError;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<EventPayload>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn log_event(&self, payload: &EventPayload) -> Result<(), SinkError> {
            self.seen.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn body(payload: &EventPayload) -> Result<Vec<u8>, MessagingError> {
        Ok(payload.to_body().unwrap())
    }

    #[tokio::test]
    async fn test_pump_queues_every_body_then_reports_closed() {
        let sink = Arc::new(RecordingSink::default());
        let pool = HandlerPool::new(1, 4, sink.clone());

        let bodies = stream::iter(vec![
            body(&EventPayload::new("log", "a")),
            Ok(b"not json".to_vec()),
            body(&EventPayload::new("event", "b")),
        ]);
        let err = pump(bodies, &pool).await.unwrap_err();
        pool.shutdown().await;

        assert!(matches!(err, MessagingError::ConsumerClosed));
        // Single worker, so handling order is delivery order.
        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec![
                EventPayload::new("log", "a"),
                EventPayload::default(),
                EventPayload::new("event", "b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_pump_stops_at_stream_error() {
        let sink = Arc::new(RecordingSink::default());
        let pool = HandlerPool::new(1, 4, sink.clone());

        let bodies = stream::iter(vec![
            body(&EventPayload::new("log", "a")),
            Err(MessagingError::PoolClosed),
            body(&EventPayload::new("log", "never")),
        ]);
        let err = pump(bodies, &pool).await.unwrap_err();
        pool.shutdown().await;

        assert!(matches!(err, MessagingError::PoolClosed));
        assert_eq!(
            *sink.seen.lock().unwrap(),
            vec![EventPayload::new("log", "a")]
        );
    }

    #[test]
    fn test_config_defaults_when_unset() {
        let config = ConsumerConfig::from_vars(|_| None).unwrap();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_config_reads_overrides() {
        let config = ConsumerConfig::from_vars(|key| match key {
            "CONSUMER_WORKERS" => Some("2".to_string()),
            "CONSUMER_QUEUE_CAPACITY" => Some(" 16 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 16);
    }

    #[test]
    fn test_config_rejects_zero_and_garbage() {
        for bad in ["0", "-1", "many"] {
            let err = ConsumerConfig::from_vars(|key| {
                (key == "CONSUMER_WORKERS").then(|| bad.to_string())
            })
            .unwrap_err();
            assert!(matches!(
                err,
                MessagingError::InvalidConfig { var: "CONSUMER_WORKERS", .. }
            ));
        }
    }
}
