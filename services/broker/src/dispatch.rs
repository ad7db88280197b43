//! Action dispatcher.
//!
//! `Received → Decoded → Routed → Responded`: the body is decoded into a
//! [`Request`], routed to the one adapter owning that action, and the
//! normalized adapter outcome is the reply.

use std::sync::Arc;

use axum::http::StatusCode;
use courier_messaging::{BrokerHandle, EventEmitter};
use tracing::{debug, info};

use crate::adapters::{Adapter, GrpcAdapter, HttpAdapter, QueueAdapter, RpcAdapter};
use crate::config::Config;
use crate::envelope::{decode_request, AuthPayload, LogPayload, MailPayload, Request, ResponseEnvelope};
use crate::error::GatewayError;
use crate::normalize::{normalize, Reply};

pub const PING_MESSAGE: &str = "Hit the broker";

/// One adapter per action that needs a downstream call.
#[derive(Clone)]
pub struct Adapters {
    pub auth: Arc<dyn Adapter<AuthPayload>>,
    pub mail: Arc<dyn Adapter<MailPayload>>,
    pub queue: Arc<dyn Adapter<LogPayload>>,
    pub rpc: Arc<dyn Adapter<LogPayload>>,
    pub grpc: Arc<dyn Adapter<LogPayload>>,
}

impl Adapters {
    /// Production wiring from configuration and the shared broker connection.
    pub fn from_config(config: &Config, broker: BrokerHandle) -> Self {
        let client = reqwest::Client::new();
        Self {
            auth: Arc::new(HttpAdapter::new(client.clone(), &config.auth_service_url)),
            mail: Arc::new(HttpAdapter::new(client, &config.mail_service_url)),
            queue: Arc::new(QueueAdapter::new(EventEmitter::new(broker))),
            rpc: Arc::new(RpcAdapter::new(&config.log_rpc_addr)),
            grpc: Arc::new(GrpcAdapter::with_deadline(
                &config.log_grpc_url,
                config.log_grpc_deadline,
            )),
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    adapters: Adapters,
}

impl Dispatcher {
    pub fn new(adapters: Adapters) -> Self {
        Self { adapters }
    }

    /// Decode a raw body and dispatch it.
    pub async fn handle(&self, body: &[u8]) -> Result<Reply, GatewayError> {
        let request = match decode_request(body) {
            Ok(request) => request,
            Err(e) => {
                info!(error = %e, "Rejected request");
                return Err(e);
            }
        };
        self.dispatch(request).await
    }

    /// Route a decoded request to its adapter.
    pub async fn dispatch(&self, request: Request) -> Result<Reply, GatewayError> {
        let action = request.action();
        debug!(action = %action, "Routing request");

        match request {
            Request::Ping => Ok(Reply::new(
                StatusCode::OK,
                ResponseEnvelope::success(PING_MESSAGE),
            )),
            Request::Auth(payload) => normalize(self.adapters.auth.call(payload).await),
            Request::Mail(payload) => normalize(self.adapters.mail.call(payload).await),
            Request::Log(payload) => normalize(self.adapters.queue.call(payload).await),
            Request::LogRpc(payload) => normalize(self.adapters.rpc.call(payload).await),
            Request::LogGrpc(payload) => normalize(self.adapters.grpc.call(payload).await),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rstest::rstest;

    use super::*;
    use crate::envelope::ResponseData;
    use crate::error::TransportError;

    /// Records which adapter was called.
    pub(crate) type CallLog = Arc<Mutex<Vec<&'static str>>>;

    pub(crate) struct Probe {
        name: &'static str,
        calls: CallLog,
        reply: fn() -> Result<ResponseEnvelope, TransportError>,
    }

    #[async_trait]
    impl<P: Send + 'static> Adapter<P> for Probe {
        async fn call(&self, _payload: P) -> Result<ResponseEnvelope, TransportError> {
            self.calls.lock().unwrap().push(self.name);
            (self.reply)()
        }
    }

    fn accepted() -> Result<ResponseEnvelope, TransportError> {
        Ok(ResponseEnvelope::success("ok"))
    }

    pub(crate) fn probes_with(
        reply: fn() -> Result<ResponseEnvelope, TransportError>,
    ) -> (Adapters, CallLog) {
        let calls: CallLog = Arc::default();
        let probe = |name| {
            Arc::new(Probe {
                name,
                calls: Arc::clone(&calls),
                reply,
            })
        };
        let adapters = Adapters {
            auth: probe("auth"),
            mail: probe("mail"),
            queue: probe("queue"),
            rpc: probe("rpc"),
            grpc: probe("grpc"),
        };
        (adapters, calls)
    }

    #[rstest]
    #[case(r#"{"action":"auth","auth":{"email":"a","password":"b"}}"#, "auth")]
    #[case(r#"{"action":"mail","mail":{"from":"a","to":"b","subject":"c","message":"d"}}"#, "mail")]
    #[case(r#"{"action":"log","log":{"name":"n","data":"d"}}"#, "queue")]
    #[case(r#"{"action":"logRpc","log":{"name":"n","data":"d"}}"#, "rpc")]
    #[case(r#"{"action":"logGrpc","log":{"name":"n","data":"d"}}"#, "grpc")]
    #[tokio::test]
    async fn test_routes_to_assigned_adapter(#[case] body: &str, #[case] expected: &str) {
        let (adapters, calls) = probes_with(accepted);
        let dispatcher = Dispatcher::new(adapters);

        let reply = dispatcher.handle(body.as_bytes()).await.unwrap();

        assert_eq!(reply.status, StatusCode::ACCEPTED);
        assert_eq!(*calls.lock().unwrap(), vec![expected]);
    }

    #[tokio::test]
    async fn test_ping_touches_no_adapter() {
        let (adapters, calls) = probes_with(accepted);
        let reply = Dispatcher::new(adapters)
            .handle(br#"{"action":"ping"}"#)
            .await
            .unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.envelope, ResponseEnvelope::success(PING_MESSAGE));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[rstest]
    #[case(r#"{"action":"publish","log":{"name":"n","data":"d"}}"#)]
    #[case(r#"{"action":"","log":{"name":"n","data":"d"}}"#)]
    #[case(r#"{"action":"Log","log":{"name":"n","data":"d"}}"#)]
    #[tokio::test]
    async fn test_unknown_action_never_reaches_adapter(#[case] body: &str) {
        let (adapters, calls) = probes_with(accepted);
        let err = Dispatcher::new(adapters)
            .handle(body.as_bytes())
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "unknown action");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_trailing_value_never_reaches_adapter() {
        let (adapters, calls) = probes_with(accepted);
        let err = Dispatcher::new(adapters)
            .handle(br#"{"action":"log","log":{"name":"n","data":"d"}} {"action":"ping"}"#)
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_downstream_error_is_unauthorized() {
        fn rejected() -> Result<ResponseEnvelope, TransportError> {
            Ok(ResponseEnvelope {
                error: true,
                message: "invalid credentials".to_string(),
                data: Some(ResponseData::Opaque(serde_json::json!({"leak": true}))),
                status_code: Some(401),
            })
        }

        let (adapters, _) = probes_with(rejected);
        let err = Dispatcher::new(adapters)
            .dispatch(Request::Auth(AuthPayload::default()))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let envelope = err.envelope();
        assert_eq!(envelope.message, "status code 401: invalid credentials");
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_is_bad_gateway() {
        fn refused() -> Result<ResponseEnvelope, TransportError> {
            Err(TransportError::Rpc("connection refused".to_string()))
        }

        let (adapters, _) = probes_with(refused);
        let err = Dispatcher::new(adapters)
            .dispatch(Request::LogRpc(LogPayload::default()))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.envelope().error);
    }
}
