//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the quota policy (SharedQuotaPolicy)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the quota policy is hot-swappable; other sections need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use schema::{
    AdminConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, QuotaConfig, SecurityConfig,
    TimeoutConfig,
};

/// Quota policy shared between the server and the identity services.
pub type SharedQuotaPolicy = Arc<ArcSwap<QuotaConfig>>;
