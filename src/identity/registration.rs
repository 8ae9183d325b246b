//! Registration: one live token per client IP.

use std::net::IpAddr;
use std::sync::Arc;

use crate::config::SharedQuotaPolicy;
use crate::identity::record::UserRecord;
use crate::identity::store::{IdentityError, IdentityStore};
use crate::observability::metrics;

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<IdentityStore>,
    policy: SharedQuotaPolicy,
}

impl RegistrationService {
    pub fn new(store: Arc<IdentityStore>, policy: SharedQuotaPolicy) -> Self {
        Self { store, policy }
    }

    /// Issue a new identity for `ip`.
    ///
    /// Fails with [`IdentityError::AlreadyRegistered`] while the IP's bound
    /// token still has quota, counting units held by unsettled requests. An
    /// exhausted bound token is evicted and replaced.
    pub fn register(&self, ip: IpAddr) -> Result<UserRecord, IdentityError> {
        let quota = self.policy.load().initial_requests;

        let result = self.store.create_user(ip, quota);

        match &result {
            Ok(record) => {
                tracing::info!(
                    user_id = %record.user_id,
                    client_ip = %ip,
                    requests_remaining = record.requests_remaining,
                    "Identity registered"
                );
                metrics::record_registration("created");
            }
            Err(_) => {
                tracing::warn!(client_ip = %ip, "Registration rejected, live token already bound");
                metrics::record_registration("rejected");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::QuotaConfig;
    use arc_swap::ArcSwap;

    fn service(initial: u64) -> (RegistrationService, Arc<IdentityStore>) {
        let store = Arc::new(IdentityStore::new());
        let policy = Arc::new(ArcSwap::from_pointee(QuotaConfig {
            initial_requests: initial,
            ..QuotaConfig::default()
        }));
        (RegistrationService::new(store.clone(), policy), store)
    }

    #[test]
    fn test_register_fresh_ip() {
        let (service, store) = service(100);
        let record = service.register("10.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(record.requests_remaining, 100);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_register_twice_while_live() {
        let (service, store) = service(100);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let first = service.register(ip).unwrap();

        assert_eq!(service.register(ip), Err(IdentityError::AlreadyRegistered));
        assert_eq!(store.lookup_by_token(&first.token), Some(first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reregister_after_exhaustion_evicts() {
        let (service, store) = service(100);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let first = service.register(ip).unwrap();
        store.mutate_quota(&first.token, -100).unwrap();

        let second = service.register(ip).unwrap();
        assert_ne!(first.token, second.token);
        assert_ne!(first.user_id, second.user_id);
        assert!(store.lookup_by_token(&first.token).is_none());
        assert_eq!(store.lookup_bound_token(&ip), Some(second.token));
    }

    #[test]
    fn test_register_during_unsettled_request_keeps_old_token() {
        let (service, store) = service(1);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let first = service.register(ip).unwrap();

        let reservation = store.try_reserve(&first.token).unwrap();
        assert_eq!(service.register(ip), Err(IdentityError::AlreadyRegistered));

        reservation.release();
        let kept = store.lookup_by_token(&first.token).unwrap();
        assert_eq!(kept.requests_remaining, 1);
        assert_eq!(store.lookup_bound_token(&ip), Some(first.token));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_distinct_ips_are_independent() {
        let (service, store) = service(100);
        service.register("10.0.0.1".parse().unwrap()).unwrap();
        service.register("10.0.0.2".parse().unwrap()).unwrap();
        assert_eq!(store.summary().live, 2);
    }

    #[test]
    fn test_policy_swap_changes_initial_quota() {
        let store = Arc::new(IdentityStore::new());
        let policy: SharedQuotaPolicy = Arc::new(ArcSwap::from_pointee(QuotaConfig::default()));
        let service = RegistrationService::new(store, policy.clone());

        policy.store(Arc::new(QuotaConfig {
            initial_requests: 5,
            ..QuotaConfig::default()
        }));
        let record = service.register("10.0.0.7".parse().unwrap()).unwrap();
        assert_eq!(record.requests_remaining, 5);
    }
}
