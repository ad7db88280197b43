//! Typed-contract RPC adapter (`logs.LogService/WriteLog`).

use std::time::Duration;

use async_trait::async_trait;
use courier_proto::{Log, LogRequest, LogServiceClient};
use tonic::transport::Endpoint;
use tonic::Code;
use tracing::debug;

use super::Adapter;
use crate::envelope::{LogPayload, ResponseData, ResponseEnvelope};
use crate::error::TransportError;

pub const DEFAULT_GRPC_DEADLINE: Duration = Duration::from_secs(1);

/// Dials the log service for every call and abandons the call once the
/// deadline passes. The channel is dropped after the call either way.
#[derive(Debug, Clone)]
pub struct GrpcAdapter {
    url: String,
    deadline: Duration,
}

impl GrpcAdapter {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_deadline(url, DEFAULT_GRPC_DEADLINE)
    }

    pub fn with_deadline(url: impl Into<String>, deadline: Duration) -> Self {
        Self {
            url: url.into(),
            deadline,
        }
    }

    async fn write_log(&self, payload: &LogPayload) -> Result<String, TransportError> {
        let channel = Endpoint::from_shared(self.url.clone())?
            .connect_timeout(self.deadline)
            .connect()
            .await?;
        let mut client = LogServiceClient::new(channel);

        let mut request = tonic::Request::new(LogRequest {
            log_entry: Some(Log {
                name: payload.name.clone(),
                data: payload.data.clone(),
            }),
        });
        request.set_timeout(self.deadline);

        let response = client.write_log(request).await.map_err(|status| {
            if status.code() == Code::DeadlineExceeded {
                TransportError::DeadlineExceeded(self.deadline)
            } else {
                TransportError::Grpc(status)
            }
        })?;

        Ok(response.into_inner().result)
    }
}

#[async_trait]
impl Adapter<LogPayload> for GrpcAdapter {
    async fn call(&self, payload: LogPayload) -> Result<ResponseEnvelope, TransportError> {
        let result = tokio::time::timeout(self.deadline, self.write_log(&payload))
            .await
            .map_err(|_| TransportError::DeadlineExceeded(self.deadline))??;

        debug!(url = %self.url, result = %result, "gRPC call returned");
        Ok(ResponseEnvelope::success(result).with_data(ResponseData::Log(payload)))
    }
}
