//! # courier-events
//!
//! Event payload and topic routing definitions shared by the courier services.
//!
//! ## Design Principles
//!
//! - An event body only carries `name` and `data`
//! - Severity travels in the routing key, never in the body
//! - Every service publishes to and consumes from one durable topic exchange
//!
//! ## Routing
//!
//! Routing keys are either a bare event name (`log`, `auth`, `event`) or a
//! severity-qualified log key (`log.INFO`, `log.WARNING`, `log.ERROR`).

mod error;
mod payload;
mod topic;

pub use error::EventError;
pub use payload::*;
pub use topic::*;
