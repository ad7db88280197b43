//! Point-to-point RPC adapter.
//!
//! Speaks JSON-RPC 1.0 over a fresh TCP connection per call, one JSON value
//! per line:
//!
//! ```text
//! -> {"method":"RPCServer.LogInfo","params":[{"Name":"..","Data":".."}],"id":0}
//! <- {"id":0,"result":"Processed payload via RPC","error":null}
//! ```
//!
//! This is a chosen wire format. A Go `net/rpc` server using its default gob
//! codec will not understand it; the log service must serve JSON-RPC.
//!
//! There is no timeout: the call waits until the server answers or the
//! connection drops.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use super::Adapter;
use crate::envelope::{LogPayload, ResponseData, ResponseEnvelope};
use crate::error::TransportError;

/// Remote method that records a log entry.
pub const LOG_INFO_METHOD: &str = "RPCServer.LogInfo";

const REQUEST_ID: u64 = 0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RpcPayload<'a> {
    name: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    params: [RpcPayload<'a>; 1],
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    id: u64,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct RpcAdapter {
    addr: String,
}

impl RpcAdapter {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn invoke(&self, method: &str, payload: &LogPayload) -> Result<String, TransportError> {
        let request = RpcRequest {
            method,
            params: [RpcPayload {
                name: &payload.name,
                data: &payload.data,
            }],
            id: REQUEST_ID,
        };
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');

        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(&line).await?;

        let mut reader = BufReader::new(stream);
        let mut buf = String::new();
        if reader.read_line(&mut buf).await? == 0 {
            return Err(TransportError::Rpc(
                "connection closed before reply".to_string(),
            ));
        }

        let reply: RpcReply = serde_json::from_str(&buf)?;
        if reply.id != REQUEST_ID {
            return Err(TransportError::Rpc(format!(
                "reply id {} does not match request id {REQUEST_ID}",
                reply.id
            )));
        }
        match reply.error {
            None | Some(serde_json::Value::Null) => Ok(reply.result.unwrap_or_default()),
            Some(serde_json::Value::String(message)) => Err(TransportError::Rpc(message)),
            Some(other) => Err(TransportError::Rpc(other.to_string())),
        }
    }
}

#[async_trait]
impl Adapter<LogPayload> for RpcAdapter {
    async fn call(&self, payload: LogPayload) -> Result<ResponseEnvelope, TransportError> {
        let result = self.invoke(LOG_INFO_METHOD, &payload).await?;
        debug!(addr = %self.addr, result = %result, "RPC call returned");

        Ok(ResponseEnvelope::success(result).with_data(ResponseData::Log(payload)))
    }
}
