//! Quota recharge.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::config::SharedQuotaPolicy;
use crate::identity::record::UserRecord;
use crate::identity::store::{IdentityError, IdentityStore};
use crate::observability::metrics;

/// Result of a successful recharge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeOutcome {
    /// Amount actually added after clamping.
    pub amount: u64,
    /// Record snapshot after the top-up.
    pub record: UserRecord,
}

#[derive(Clone)]
pub struct RechargeService {
    store: Arc<IdentityStore>,
    policy: SharedQuotaPolicy,
}

impl RechargeService {
    pub fn new(store: Arc<IdentityStore>, policy: SharedQuotaPolicy) -> Self {
        Self { store, policy }
    }

    /// Top up `user`'s quota by the amount requested in the body field.
    ///
    /// Never gated on remaining quota.
    pub fn recharge(
        &self,
        user: &UserRecord,
        requested: Option<&Value>,
    ) -> Result<RechargeOutcome, IdentityError> {
        let amount = resolve_amount(requested, self.policy.load().default_recharge);
        let updated = self.store.recharge(&user.token, amount, Utc::now())?;

        tracing::info!(
            user_id = %updated.user_id,
            amount,
            requests_remaining = updated.requests_remaining,
            "Quota recharged"
        );
        metrics::record_recharge(amount);

        Ok(RechargeOutcome {
            amount,
            record: updated,
        })
    }
}

/// Interpret a client-supplied recharge amount.
///
/// Missing, null and non-numeric values fall back to `default`. Numeric
/// strings are accepted. Negative amounts add nothing and fractions are
/// floored.
pub fn resolve_amount(raw: Option<&Value>, default: u64) -> u64 {
    match raw {
        Some(Value::Number(n)) => {
            if let Some(amount) = n.as_u64() {
                amount
            } else if n.as_i64().is_some() {
                0
            } else {
                n.as_f64().map(floor_amount).unwrap_or(default)
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(amount) = s.parse::<u64>() {
                amount
            } else if s.parse::<i64>().is_ok() {
                0
            } else {
                default
            }
        }
        _ => default,
    }
}

fn floor_amount(value: f64) -> u64 {
    if value <= 0.0 {
        0
    } else {
        value.floor() as u64
    }
}
