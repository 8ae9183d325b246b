//! Quota Gateway Library
//!
//! Issues per-client access tokens, tracks a consumable request quota per
//! token and gates a protected item collection behind authentication and
//! charge-on-success quota enforcement.

pub mod admin;
pub mod config;
pub mod http;
pub mod identity;
pub mod items;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
