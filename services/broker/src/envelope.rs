//! Inbound request and outbound response envelopes.
//!
//! Request body:
//!
//! ```json
//! {"action": "ping|auth|log|logRpc|logGrpc|mail",
//!  "auth": {"email": "", "password": ""},
//!  "log": {"name": "", "data": ""},
//!  "mail": {"from": "", "to": "", "subject": "", "message": ""}}
//! ```
//!
//! Response body:
//!
//! ```json
//! {"error": false, "message": "", "data": {}, "statusCode": 202}
//! ```

use std::fmt;
use std::str::FromStr;

use courier_events::EventPayload;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GatewayError;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Request discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Ping,
    Auth,
    /// Log through the message queue.
    Log,
    /// Log through the point-to-point RPC server.
    LogRpc,
    /// Log through the typed gRPC contract.
    LogGrpc,
    Mail,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Ping,
        Action::Auth,
        Action::Log,
        Action::LogRpc,
        Action::LogGrpc,
        Action::Mail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Ping => "ping",
            Action::Auth => "auth",
            Action::Log => "log",
            Action::LogRpc => "logRpc",
            Action::LogGrpc => "logGrpc",
            Action::Mail => "mail",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| GatewayError::UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogPayload {
    pub name: String,
    pub data: String,
}

impl From<LogPayload> for EventPayload {
    fn from(payload: LogPayload) -> Self {
        EventPayload::new(payload.name, payload.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailPayload {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub message: String,
}

/// A decoded request: one action with the sub-payload it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    Auth(AuthPayload),
    Log(LogPayload),
    LogRpc(LogPayload),
    LogGrpc(LogPayload),
    Mail(MailPayload),
}

impl Request {
    pub fn action(&self) -> Action {
        match self {
            Request::Ping => Action::Ping,
            Request::Auth(_) => Action::Auth,
            Request::Log(_) => Action::Log,
            Request::LogRpc(_) => Action::LogRpc,
            Request::LogGrpc(_) => Action::LogGrpc,
            Request::Mail(_) => Action::Mail,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    action: String,
    #[serde(default)]
    auth: Option<AuthPayload>,
    #[serde(default)]
    log: Option<LogPayload>,
    #[serde(default)]
    mail: Option<MailPayload>,
}

/// Decode a request body.
///
/// The body must hold exactly one JSON value naming a known action, and the
/// sub-payload that action reads must be present.
pub fn decode_request(body: &[u8]) -> Result<Request, GatewayError> {
    if body.len() > MAX_BODY_BYTES {
        return Err(GatewayError::Decode(format!(
            "body must not be larger than {MAX_BODY_BYTES} bytes"
        )));
    }

    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<RawRequest>();
    let raw = match values.next() {
        Some(Ok(raw)) => raw,
        Some(Err(e)) => return Err(GatewayError::Decode(e.to_string())),
        None => return Err(GatewayError::Decode("body must not be empty".to_string())),
    };

    let action: Action = raw.action.parse()?;

    if values.next().is_some() {
        return Err(GatewayError::Decode(
            "body must have only a single JSON value".to_string(),
        ));
    }

    let missing = || GatewayError::Decode(format!("missing payload for action {action}"));
    let request = match action {
        Action::Ping => Request::Ping,
        Action::Auth => Request::Auth(raw.auth.ok_or_else(missing)?),
        Action::Log => Request::Log(raw.log.ok_or_else(missing)?),
        Action::LogRpc => Request::LogRpc(raw.log.ok_or_else(missing)?),
        Action::LogGrpc => Request::LogGrpc(raw.log.ok_or_else(missing)?),
        Action::Mail => Request::Mail(raw.mail.ok_or_else(missing)?),
    };
    Ok(request)
}

/// Action-specific response data.
///
/// Data produced by this service is typed; whatever a downstream service
/// returns is kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Log(LogPayload),
    Opaque(serde_json::Value),
}

impl<'de> Deserialize<'de> for ResponseData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(ResponseData::Opaque)
    }
}

/// The uniform reply every action produces.
///
/// When `error` is set the message is non-empty and `data` must not be
/// trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    #[serde(
        default,
        rename = "statusCode",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_code: Option<u16>,
}

impl ResponseEnvelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
            status_code: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "request failed".to_string();
        }
        Self {
            error: true,
            message,
            data: None,
            status_code: None,
        }
    }

    pub fn with_data(mut self, data: ResponseData) -> Self {
        self.data = Some(data);
        self
    }
}
