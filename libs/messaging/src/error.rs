//! Error types for broker messaging.

use courier_events::EventError;
use thiserror::Error;

/// Errors raised while talking to the broker.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Protocol or I/O failure reported by the AMQP client.
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// Payload could not be serialized.
    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// The connection retry budget is spent. Callers must treat this as fatal.
    #[error("gave up connecting to broker after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The delivery stream ended, which only happens when the channel or
    /// connection is gone.
    #[error("consumer stream closed")]
    ConsumerClosed,

    /// The handler pool stopped accepting payloads.
    #[error("handler pool is closed")]
    PoolClosed,

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidConfig { var: &'static str, value: String },
}

/// Errors raised by an event sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
}
