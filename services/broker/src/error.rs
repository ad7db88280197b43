//! Gateway error taxonomy.
//!
//! Every error is rendered as a [`ResponseEnvelope`] with `error=true`; raw
//! transport errors never cross the HTTP boundary.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_messaging::MessagingError;
use thiserror::Error;
use tracing::warn;

use crate::envelope::ResponseEnvelope;

/// Failures while talking to a downstream service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid rpc message: {0}")]
    Codec(#[from] serde_json::Error),

    /// The point-to-point RPC server answered with an error.
    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("publish failed: {0}")]
    Publish(#[from] MessagingError),

    #[error("grpc dial failed: {0}")]
    GrpcConnect(#[from] tonic::transport::Error),

    #[error("grpc call failed: {}", .0.message())]
    Grpc(tonic::Status),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Errors surfaced to the caller of the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed, ambiguous or oversized body.
    #[error("{0}")]
    Decode(String),

    #[error("unknown action")]
    UnknownAction(String),

    /// The downstream service answered with `error=true`.
    #[error("{}", downstream_message(.status_code, .message))]
    Downstream {
        status_code: Option<u16>,
        message: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn downstream_message(status_code: &Option<u16>, message: &str) -> String {
    match status_code {
        Some(code) => format!("status code {code}: {message}"),
        None => message.to_string(),
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Decode(_) | GatewayError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            GatewayError::Downstream { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::Transport(TransportError::DeadlineExceeded(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::failure(self.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = %status, error = %self, "Downstream transport failure");
        }
        (status, Json(self.envelope())).into_response()
    }
}
