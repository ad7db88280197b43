//! Exchange and queue declarations.

use courier_events::EXCHANGE_NAME;
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind, Queue};
use tracing::debug;

/// Declare the durable topic exchange. Idempotent.
pub async fn declare_exchange(channel: &Channel) -> Result<(), lapin::Error> {
    channel
        .exchange_declare(
            EXCHANGE_NAME,
            ExchangeKind::Topic,
            exchange_options(),
            FieldTable::default(),
        )
        .await
}

/// Declare a server-named queue that lives only as long as this connection.
pub async fn declare_random_queue(channel: &Channel) -> Result<Queue, lapin::Error> {
    channel
        .queue_declare("", random_queue_options(), FieldTable::default())
        .await
}

/// Bind `queue` to the exchange once per topic pattern.
pub async fn bind_topics(
    channel: &Channel,
    queue: &str,
    topics: &[String],
) -> Result<(), lapin::Error> {
    for topic in topics {
        channel
            .queue_bind(
                queue,
                EXCHANGE_NAME,
                topic,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        debug!(queue = %queue, topic = %topic, "Bound topic");
    }
    Ok(())
}

/// Split a comma separated topic list, dropping blanks.
pub fn parse_topics(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn exchange_options() -> ExchangeDeclareOptions {
    ExchangeDeclareOptions {
        durable: true,
        ..Default::default()
    }
}

fn random_queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: false,
        exclusive: true,
        auto_delete: true,
        ..Default::default()
    }
}
