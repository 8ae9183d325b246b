//! Quota reservations.
//!
//! A reservation is one unit of quota taken from a token at check time. It
//! either becomes a permanent charge via [`QuotaReservation::commit`] or is
//! handed back. Dropping an unsettled reservation hands it back too, so a
//! cancelled or panicking request never leaves a charge behind.

use std::sync::Arc;

use crate::identity::record::{Token, UserId};
use crate::identity::store::IdentityStore;

#[derive(Debug)]
#[must_use = "an unsettled reservation is returned to the token when dropped"]
pub struct QuotaReservation {
    store: Arc<IdentityStore>,
    token: Token,
    user_id: UserId,
    before: u64,
    settled: bool,
}

impl QuotaReservation {
    pub(crate) fn new(store: Arc<IdentityStore>, token: Token, user_id: UserId, before: u64) -> Self {
        Self {
            store,
            token,
            user_id,
            before,
            settled: false,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Quota observed when the unit was taken.
    pub fn before(&self) -> u64 {
        self.before
    }

    /// Quota left once this unit is charged.
    pub fn after(&self) -> u64 {
        self.before - 1
    }

    /// Make the charge permanent and return the post-charge quota.
    pub fn commit(mut self) -> u64 {
        self.settle(false);
        self.after()
    }

    /// Give the unit back to the token.
    pub fn release(mut self) {
        self.settle(true);
    }

    fn settle(&mut self, refund: bool) {
        self.settled = true;
        if self.store.settle(&self.token, refund).is_err() {
            tracing::debug!(
                user_id = %self.user_id,
                refund,
                "Identity evicted before reservation settled"
            );
        }
    }
}

impl Drop for QuotaReservation {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(user_id = %self.user_id, "Returning unsettled quota reservation");
            self.settle(true);
        }
    }
}
