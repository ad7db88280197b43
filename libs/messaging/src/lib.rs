//! # courier-messaging
//!
//! Everything that touches the message broker:
//!
//! - [`ConnectionManager`] dials the broker once at startup with quadratic backoff
//!   and hands out a cloneable [`BrokerHandle`]
//! - [`EventEmitter`] publishes [`EventPayload`]s to the topic exchange
//! - [`Consumer`] binds an exclusive queue to the exchange and feeds deliveries
//!   into a bounded [`HandlerPool`]
//! - [`HttpLogSink`] forwards handled events to the logging service
//!
//! [`EventPayload`]: courier_events::EventPayload

pub mod connection;
pub mod consumer;
pub mod emitter;
mod error;
pub mod pool;
pub mod sink;
pub mod topology;

pub use connection::{BrokerHandle, ConnectionManager, ConnectionState, RetryPolicy};
pub use consumer::{Consumer, ConsumerConfig};
pub use emitter::EventEmitter;
pub use error::{MessagingError, SinkError};
pub use pool::{handle_payload, HandlerPool};
pub use sink::{EventSink, HttpLogSink};
pub use topology::parse_topics;
