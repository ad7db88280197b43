//! The event body exchanged over the broker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EventError;

/// The unit published to and consumed from the topic exchange.
///
/// Missing fields decode as empty strings, so a partially populated body is
/// still a usable payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPayload {
    pub name: String,
    pub data: String,
}

impl EventPayload {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Serialize the payload into a message body.
    pub fn to_body(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a message body.
    pub fn from_body(body: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Decode a message body, falling back to the zero-valued payload when
    /// the body is not a valid event.
    pub fn from_body_lossy(body: &[u8]) -> Self {
        Self::from_body(body).unwrap_or_default()
    }

    /// How a consumer should route this payload.
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.name)
    }
}

/// Known event names.
///
/// `Other` is the catch-all for every unrecognised name, including the empty
/// name of an undecodable body. It is routed exactly like `Log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Log,
    Event,
    /// Reserved for authentication events. Consumers accept it and do nothing.
    Auth,
    Other(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "log" => EventKind::Log,
            "event" => EventKind::Event,
            "auth" => EventKind::Auth,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Whether events of this kind are forwarded to the log sink.
    pub fn forwards_to_sink(&self) -> bool {
        match self {
            EventKind::Log | EventKind::Event | EventKind::Other(_) => true,
            EventKind::Auth => false,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Log => write!(f, "log"),
            EventKind::Event => write!(f, "event"),
            EventKind::Auth => write!(f, "auth"),
            EventKind::Other(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_body_shape() {
        let payload = EventPayload::new("log", "x");
        let body = payload.to_body().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({"name": "log", "data": "x"}));
    }

    #[test]
    fn test_lossy_decode_falls_back_to_zero_value() {
        assert_eq!(EventPayload::from_body_lossy(b"not json"), EventPayload::default());
        assert_eq!(
            EventPayload::from_body_lossy(br#"{"name":"event"}"#),
            EventPayload::new("event", "")
        );
    }

    #[test]
    fn test_event_kind_routing() {
        assert_eq!(EventKind::from_name("log"), EventKind::Log);
        assert_eq!(EventKind::from_name("event"), EventKind::Event);
        assert_eq!(EventKind::from_name("auth"), EventKind::Auth);
        assert_eq!(
            EventKind::from_name("billing"),
            EventKind::Other("billing".to_string())
        );

        assert!(EventKind::Log.forwards_to_sink());
        assert!(EventKind::Event.forwards_to_sink());
        assert!(EventKind::Other(String::new()).forwards_to_sink());
        assert!(!EventKind::Auth.forwards_to_sink());
    }

    #[test]
    fn test_zero_value_payload_is_catch_all() {
        let payload = EventPayload::default();
        assert_eq!(payload.kind(), EventKind::Other(String::new()));
        assert!(payload.kind().forwards_to_sink());
    }

    #[test]
    fn test_kind_displays_event_name() {
        assert_eq!(EventKind::Log.to_string(), "log");
        assert_eq!(EventKind::Other("billing".into()).to_string(), "billing");
    }

    proptest::proptest! {
        #[test]
        fn prop_undecodable_body_is_zero_value(body in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let payload = EventPayload::from_body_lossy(&body);
            if EventPayload::from_body(&body).is_err() {
                proptest::prop_assert_eq!(payload, EventPayload::default());
            }
        }

        #[test]
        fn prop_body_keeps_name_and_data(name in ".{0,32}", data in ".{0,64}") {
            let payload = EventPayload::new(name, data);
            let body = payload.to_body().unwrap();
            proptest::prop_assert_eq!(EventPayload::from_body_lossy(&body), payload);
        }
    }
}
