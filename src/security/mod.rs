//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (peer address, optionally X-Forwarded-For)
//!     → auth.rs (bearer token → UserRecord snapshot in extensions)
//!     → quota.rs (reserve one unit → handler → commit or release)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: every authentication failure is the same 401
//! - Charge on success: quota is only kept when the handler answers 2xx

pub mod auth;
pub mod client_ip;
pub mod quota;

pub use auth::{require_token, AuthenticatedUser, Authenticator};
pub use client_ip::ClientIp;
pub use quota::enforce_quota;
