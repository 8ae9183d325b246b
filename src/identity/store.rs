//! In-memory identity store.
//!
//! Two `DashMap`s back the store: token → record and client IP → bound token.
//! Lock order is binding entry first, record entry second. No code path takes
//! them the other way round.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

use crate::identity::record::{Token, UserRecord};
use crate::identity::reservation::QuotaReservation;
use crate::observability::metrics;

/// Errors produced by identity store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The client IP already holds a token with quota left.
    #[error("client already holds a live token")]
    AlreadyRegistered,

    /// No record exists for the presented token.
    #[error("unknown token")]
    UnknownToken,

    /// The token has no quota left.
    #[error("quota exhausted")]
    QuotaExhausted,
}

/// Aggregate view used by the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentitySummary {
    pub total: usize,
    pub live: usize,
    pub exhausted: usize,
}

/// Canonical owner of all user records.
#[derive(Debug, Default)]
pub struct IdentityStore {
    users: DashMap<Token, UserRecord>,
    bindings: DashMap<IpAddr, Token>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record for `ip` and bind it.
    ///
    /// Fails with [`IdentityError::AlreadyRegistered`] while the IP's bound
    /// record is live. An exhausted bound record is evicted.
    pub fn create_user(&self, ip: IpAddr, quota: u64) -> Result<UserRecord, IdentityError> {
        self.bind_exclusive(ip, quota, |bound| {
            if bound.is_live() {
                Err(IdentityError::AlreadyRegistered)
            } else {
                Ok(())
            }
        })
    }

    /// Create and bind a fresh record for `ip` as a single transaction.
    ///
    /// If the IP is already bound, `admit` sees the currently bound record
    /// while both the binding and the record are locked. Returning an error
    /// aborts without mutating anything; returning `Ok` evicts the old record.
    pub fn bind_exclusive<F>(
        &self,
        ip: IpAddr,
        quota: u64,
        admit: F,
    ) -> Result<UserRecord, IdentityError>
    where
        F: FnOnce(&UserRecord) -> Result<(), IdentityError>,
    {
        let record = match self.bindings.entry(ip) {
            Entry::Occupied(mut slot) => {
                if let Entry::Occupied(current) = self.users.entry(slot.get().clone()) {
                    admit(current.get())?;
                    let evicted = current.remove();
                    tracing::debug!(
                        user_id = %evicted.user_id,
                        client_ip = %ip,
                        "Evicted exhausted identity"
                    );
                }
                let record = UserRecord::new(ip, quota);
                self.users.insert(record.token.clone(), record.clone());
                slot.insert(record.token.clone());
                record
            }
            Entry::Vacant(slot) => {
                let record = UserRecord::new(ip, quota);
                self.users.insert(record.token.clone(), record.clone());
                slot.insert(record.token.clone());
                record
            }
        };

        metrics::record_identities(self.users.len());
        Ok(record)
    }

    /// Snapshot of the record behind `token`.
    pub fn lookup_by_token(&self, token: &Token) -> Option<UserRecord> {
        self.users.get(token).map(|r| r.value().clone())
    }

    /// Token currently bound to `ip`, live or not.
    pub fn lookup_bound_token(&self, ip: &IpAddr) -> Option<Token> {
        self.bindings.get(ip).map(|r| r.value().clone())
    }

    /// Remove a record and, if it still owns it, its IP binding.
    pub fn evict(&self, token: &Token) -> Option<UserRecord> {
        let (_, record) = self.users.remove(token)?;
        self.bindings.remove_if(&record.bound_ip, |_, bound| bound == token);
        metrics::record_identities(self.users.len());
        Some(record)
    }

    /// Apply a relative change to a token's quota, floored at zero.
    pub fn mutate_quota(&self, token: &Token, delta: i64) -> Result<u64, IdentityError> {
        let mut record = self.users.get_mut(token).ok_or(IdentityError::UnknownToken)?;
        record.requests_remaining = apply_delta(record.requests_remaining, delta);
        Ok(record.requests_remaining)
    }

    /// Add `amount` to a token's quota and stamp the recharge time.
    pub fn recharge(
        &self,
        token: &Token,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, IdentityError> {
        let mut record = self.users.get_mut(token).ok_or(IdentityError::UnknownToken)?;
        record.requests_remaining = record.requests_remaining.saturating_add(amount);
        record.last_recharge = now;
        Ok(record.clone())
    }

    /// Atomically take one quota unit from `token`.
    ///
    /// The unit stays taken only if the returned reservation is committed.
    /// Until it settles the record counts it as in flight and stays live.
    pub fn try_reserve(self: &Arc<Self>, token: &Token) -> Result<QuotaReservation, IdentityError> {
        let mut record = self.users.get_mut(token).ok_or(IdentityError::UnknownToken)?;
        if record.requests_remaining == 0 {
            return Err(IdentityError::QuotaExhausted);
        }
        let before = record.requests_remaining;
        record.requests_remaining -= 1;
        record.in_flight += 1;
        let user_id = record.user_id;
        drop(record);

        Ok(QuotaReservation::new(
            Arc::clone(self),
            token.clone(),
            user_id,
            before,
        ))
    }

    /// Settle one in-flight unit, handing it back when `refund` is set.
    pub(crate) fn settle(&self, token: &Token, refund: bool) -> Result<u64, IdentityError> {
        let mut record = self.users.get_mut(token).ok_or(IdentityError::UnknownToken)?;
        record.in_flight = record.in_flight.saturating_sub(1);
        if refund {
            record.requests_remaining = record.requests_remaining.saturating_add(1);
        }
        Ok(record.requests_remaining)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Count live and exhausted identities.
    pub fn summary(&self) -> IdentitySummary {
        let mut live = 0;
        let mut exhausted = 0;
        for r in self.users.iter() {
            if r.value().is_live() {
                live += 1;
            } else {
                exhausted += 1;
            }
        }
        IdentitySummary {
            total: live + exhausted,
            live,
            exhausted,
        }
    }
}

fn apply_delta(current: u64, delta: i64) -> u64 {
    if delta >= 0 {
        current.saturating_add(delta as u64)
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    #[test]
    fn test_create_and_lookup() {
        let store = IdentityStore::new();
        let record = store.create_user(ip("10.0.0.1"), 100).unwrap();

        let found = store.lookup_by_token(&record.token).unwrap();
        assert_eq!(found, record);
        assert_eq!(store.lookup_bound_token(&ip("10.0.0.1")), Some(record.token));
        assert!(store.lookup_by_token(&Token::from("nope")).is_none());
    }

    #[test]
    fn test_bind_exclusive_rejects_without_mutation() {
        let store = IdentityStore::new();
        let first = store.create_user(ip("10.0.0.1"), 5).unwrap();

        let result = store.bind_exclusive(ip("10.0.0.1"), 100, |_| {
            Err(IdentityError::AlreadyRegistered)
        });

        assert_eq!(result, Err(IdentityError::AlreadyRegistered));
        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup_by_token(&first.token), Some(first.clone()));
        assert_eq!(store.lookup_bound_token(&ip("10.0.0.1")), Some(first.token));
    }

    #[test]
    fn test_rebinding_evicts_previous_record() {
        let store = IdentityStore::new();
        let first = store.create_user(ip("10.0.0.1"), 0).unwrap();
        let second = store.create_user(ip("10.0.0.1"), 100).unwrap();

        assert!(store.lookup_by_token(&first.token).is_none());
        assert_eq!(store.lookup_bound_token(&ip("10.0.0.1")), Some(second.token));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_create_user_refuses_live_binding() {
        let store = IdentityStore::new();
        let first = store.create_user(ip("10.0.0.1"), 5).unwrap();

        assert_eq!(
            store.create_user(ip("10.0.0.1"), 100),
            Err(IdentityError::AlreadyRegistered)
        );
        assert_eq!(store.lookup_by_token(&first.token), Some(first.clone()));
        assert_eq!(store.lookup_bound_token(&ip("10.0.0.1")), Some(first.token));
    }

    #[test]
    fn test_in_flight_unit_keeps_binding_live() {
        let store = Arc::new(IdentityStore::new());
        let record = store.create_user(ip("10.0.0.6"), 1).unwrap();

        let reservation = store.try_reserve(&record.token).unwrap();
        let held = store.lookup_by_token(&record.token).unwrap();
        assert_eq!(held.requests_remaining, 0);
        assert_eq!(held.in_flight, 1);
        assert_eq!(store.summary(), IdentitySummary { total: 1, live: 1, exhausted: 0 });
        assert_eq!(
            store.create_user(ip("10.0.0.6"), 100),
            Err(IdentityError::AlreadyRegistered)
        );

        reservation.release();
        let settled = store.lookup_by_token(&record.token).unwrap();
        assert_eq!(settled.requests_remaining, 1);
        assert_eq!(settled.in_flight, 0);
    }

    #[test]
    fn test_committed_last_unit_allows_rebinding() {
        let store = Arc::new(IdentityStore::new());
        let record = store.create_user(ip("10.0.0.7"), 1).unwrap();

        let reservation = store.try_reserve(&record.token).unwrap();
        assert_eq!(reservation.commit(), 0);
        assert_eq!(store.summary(), IdentitySummary { total: 1, live: 0, exhausted: 1 });

        let next = store.create_user(ip("10.0.0.7"), 100).unwrap();
        assert!(store.lookup_by_token(&record.token).is_none());
        assert_eq!(store.lookup_bound_token(&ip("10.0.0.7")), Some(next.token));
    }

    #[test]
    fn test_evict_clears_binding() {
        let store = IdentityStore::new();
        let record = store.create_user(ip("10.0.0.2"), 3).unwrap();

        let evicted = store.evict(&record.token).unwrap();
        assert_eq!(evicted.token, record.token);
        assert!(store.lookup_bound_token(&ip("10.0.0.2")).is_none());
        assert!(store.evict(&record.token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_mutate_quota_floors_at_zero() {
        let store = IdentityStore::new();
        let record = store.create_user(ip("10.0.0.3"), 2).unwrap();

        assert_eq!(store.mutate_quota(&record.token, -1), Ok(1));
        assert_eq!(store.mutate_quota(&record.token, -5), Ok(0));
        assert_eq!(store.mutate_quota(&record.token, 7), Ok(7));
        assert_eq!(
            store.mutate_quota(&Token::from("missing"), 1),
            Err(IdentityError::UnknownToken)
        );
    }

    #[test]
    fn test_recharge_updates_timestamp() {
        let store = IdentityStore::new();
        let record = store.create_user(ip("10.0.0.4"), 0).unwrap();
        let later = record.last_recharge + chrono::Duration::seconds(30);

        let updated = store.recharge(&record.token, 50, later).unwrap();
        assert_eq!(updated.requests_remaining, 50);
        assert_eq!(updated.last_recharge, later);
    }

    #[test]
    fn test_try_reserve_exhausted() {
        let store = Arc::new(IdentityStore::new());
        let record = store.create_user(ip("10.0.0.5"), 1).unwrap();

        let reservation = store.try_reserve(&record.token).unwrap();
        assert_eq!(reservation.commit(), 0);

        let err = store.try_reserve(&record.token).unwrap_err();
        assert_eq!(err, IdentityError::QuotaExhausted);
        assert_eq!(store.lookup_by_token(&record.token).unwrap().requests_remaining, 0);
    }

    #[test]
    fn test_summary_counts() {
        let store = IdentityStore::new();
        store.create_user(ip("10.0.0.1"), 10).unwrap();
        store.create_user(ip("10.0.0.2"), 0).unwrap();
        store.create_user(ip("10.0.0.3"), 1).unwrap();

        let summary = store.summary();
        assert_eq!(summary, IdentitySummary { total: 3, live: 2, exhausted: 1 });
    }

    #[test]
    fn test_concurrent_reservations_are_distinct() {
        let store = Arc::new(IdentityStore::new());
        let record = store.create_user(ip("10.0.0.9"), 64).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let token = record.token.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Ok(reservation) = store.try_reserve(&token) {
                        seen.push(reservation.commit());
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..64).collect::<Vec<_>>());
        assert_eq!(store.lookup_by_token(&record.token).unwrap().requests_remaining, 0);
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        let store = Arc::new(IdentityStore::new());
        let client = ip("192.168.1.20");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    store.create_user(client, 100).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }
}
