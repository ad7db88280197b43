//! Transport adapters.
//!
//! Each adapter owns one downstream protocol, makes exactly one call per
//! request and maps the reply into a [`ResponseEnvelope`].

mod grpc;
mod http;
mod queue;
mod rpc;

use async_trait::async_trait;

use crate::envelope::ResponseEnvelope;
use crate::error::TransportError;

pub use grpc::{GrpcAdapter, DEFAULT_GRPC_DEADLINE};
pub use http::HttpAdapter;
pub use queue::{EventPublisher, QueueAdapter, QUEUED_MESSAGE};
pub use rpc::{RpcAdapter, LOG_INFO_METHOD};

/// One downstream call for payload type `P`.
#[async_trait]
pub trait Adapter<P>: Send + Sync {
    async fn call(&self, payload: P) -> Result<ResponseEnvelope, TransportError>;
}
