//! Maps adapter outcomes onto the uniform reply.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::envelope::ResponseEnvelope;
use crate::error::{GatewayError, TransportError};

/// A successful reply: HTTP status plus envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub envelope: ResponseEnvelope,
}

impl Reply {
    pub fn new(status: StatusCode, envelope: ResponseEnvelope) -> Self {
        Self { status, envelope }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Status used for every adapter call that succeeds.
pub const ADAPTER_SUCCESS: StatusCode = StatusCode::ACCEPTED;

/// Turn an adapter outcome into the reply or error the caller sees.
///
/// A downstream `error=true` reply becomes [`GatewayError::Downstream`] with
/// the downstream message preserved; transport errors pass through as
/// [`GatewayError::Transport`].
pub fn normalize(outcome: Result<ResponseEnvelope, TransportError>) -> Result<Reply, GatewayError> {
    let envelope = outcome?;
    if envelope.error {
        return Err(GatewayError::Downstream {
            status_code: envelope.status_code,
            message: envelope.message,
        });
    }
    Ok(Reply::new(ADAPTER_SUCCESS, envelope))
}
