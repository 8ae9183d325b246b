//! Async client for the quota gateway.

mod client;

pub use client::{ApiResponse, GatewayClient, Registration};
