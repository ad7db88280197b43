//! The single submission endpoint.

use axum::extract::{rejection::BytesRejection, State};
use bytes::Bytes;

use crate::error::GatewayError;
use crate::normalize::Reply;
use crate::state::AppState;

/// `POST /` - decode the envelope, run the selected action, reply with the
/// uniform envelope.
pub async fn handle_submission(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Reply, GatewayError> {
    // Oversized or unreadable bodies are decode errors like any other.
    let body = body.map_err(|rejection| GatewayError::Decode(rejection.body_text()))?;
    state.dispatcher().handle(&body).await
}
