//! courier broker
//!
//! Accepts one JSON envelope per request on `POST /`, routes it by its
//! `action` to exactly one downstream transport (HTTP, topic exchange,
//! point-to-point RPC, typed gRPC) and answers with a uniform response
//! envelope.

pub mod adapters;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod normalize;
pub mod state;
