//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, metrics)
//!     → /ping, /register          → handlers.rs
//!     → /recharge                 → security::auth → handlers.rs
//!     → /items/*                  → security::auth → security::quota → items
//!     → error.rs (GatewayError → JSON response)
//!     → response.rs (layer-generated errors → JSON response)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use error::GatewayError;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
