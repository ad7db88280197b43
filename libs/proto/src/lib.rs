//! Typed contract for the log service (`proto/logs.proto`).

pub mod logs {
    include!("gen/logs.rs");

    pub use log_service_client::LogServiceClient;
    pub use log_service_server::{LogService, LogServiceServer};
}

pub use logs::{Log, LogRequest, LogResponse, LogService, LogServiceClient, LogServiceServer};
