//! Registered identity records.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque access credential. Also the primary key of the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Issue a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registered identity.
///
/// Values handed out by the store are snapshots; mutating a clone has no
/// effect on the stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: UserId,
    pub token: Token,
    pub requests_remaining: u64,
    pub last_recharge: DateTime<Utc>,
    pub bound_ip: IpAddr,
    /// Units taken by requests that have not settled yet. Already
    /// subtracted from `requests_remaining`.
    #[serde(skip)]
    pub in_flight: u64,
}

impl UserRecord {
    /// Create a record with a freshly issued id and token.
    pub fn new(bound_ip: IpAddr, requests_remaining: u64) -> Self {
        Self {
            user_id: UserId::generate(),
            token: Token::generate(),
            requests_remaining,
            last_recharge: Utc::now(),
            bound_ip,
            in_flight: 0,
        }
    }

    /// A record is live while it still has quota to spend or a reserved
    /// unit that may yet be handed back.
    pub fn is_live(&self) -> bool {
        self.requests_remaining > 0 || self.in_flight > 0
    }
}
