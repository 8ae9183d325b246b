//! Identity subsystem: token lifecycle and quota accounting.
//!
//! # Data Flow
//! ```text
//! POST /register
//!     → registration.rs (one live token per client IP)
//!     → store.rs (create_user: refuse a live binding, evict an exhausted one)
//!
//! Gated request
//!     → security::auth (token → UserRecord snapshot)
//!     → security::quota (store.try_reserve → handler → commit / release)
//!
//! POST /recharge
//!     → recharge.rs (resolve amount) → store.rs (recharge)
//! ```
//!
//! # Design Decisions
//! - The store is the only owner of mutable records; everyone else holds snapshots
//! - Per-token and per-IP mutations run under the corresponding dashmap entry lock
//! - Binding locks are always taken before record locks
//! - A reserved unit keeps its record live until the request settles

pub mod recharge;
pub mod record;
pub mod registration;
pub mod reservation;
pub mod store;

pub use recharge::{RechargeOutcome, RechargeService};
pub use record::{Token, UserId, UserRecord};
pub use registration::RegistrationService;
pub use reservation::QuotaReservation;
pub use store::{IdentityError, IdentityStore, IdentitySummary};
