//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Construct the identity store and services shared by all handlers
//! - Create the Axum Router with all handlers and middleware
//! - Serve the public and (optional) admin listeners
//! - Apply hot-reloaded quota policy
//! - Shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::{GatewayConfig, SharedQuotaPolicy};
use crate::http::error::panic_response;
use crate::http::handlers;
use crate::http::request::{propagate_request_id, record_metrics, set_request_id};
use crate::http::response::json_error_bodies;
use crate::identity::{IdentityStore, RechargeService, RegistrationService};
use crate::items::{self, ItemStore};
use crate::security::{enforce_quota, require_token, Authenticator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<IdentityStore>,
    pub authenticator: Authenticator,
    pub registration: RegistrationService,
    pub recharge: RechargeService,
    pub items: Arc<ItemStore>,
    pub quota_policy: SharedQuotaPolicy,
    pub trust_forwarded_for: bool,
    pub admin_api_key: Arc<str>,
    pub started_at: Instant,
}

impl AppState {
    /// Build fresh, empty state for one server lifetime.
    pub fn new(config: &GatewayConfig) -> Self {
        let identities = Arc::new(IdentityStore::new());
        let quota_policy: SharedQuotaPolicy =
            Arc::new(ArcSwap::from_pointee(config.quota.clone()));

        Self {
            authenticator: Authenticator::new(identities.clone()),
            registration: RegistrationService::new(identities.clone(), quota_policy.clone()),
            recharge: RechargeService::new(identities.clone(), quota_policy.clone()),
            identities,
            items: Arc::new(ItemStore::new()),
            quota_policy,
            trust_forwarded_for: config.security.trust_forwarded_for,
            admin_api_key: Arc::from(config.admin.api_key.as_str()),
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl GatewayServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let state = AppState::new(&config);
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let gated = items::routes()
            .route_layer(middleware::from_fn_with_state(state.clone(), enforce_quota))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

        let authenticated = Router::new()
            .route("/recharge", post(handlers::recharge))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

        Router::new()
            .route("/ping", get(handlers::ping))
            .route("/register", post(handlers::register))
            .merge(authenticated)
            .merge(gated)
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(json_error_bodies))
            .layer(middleware::from_fn(record_metrics))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(propagate_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. Configs received on `config_updates` replace the
    /// quota policy in place.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let policy = self.state.quota_policy.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    initial_requests = new_config.quota.initial_requests,
                    default_recharge = new_config.quota.default_recharge,
                    "Quota policy reloaded"
                );
                policy.store(Arc::new(new_config.quota));
            }
        });

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_app = setup_admin_router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin_listener.local_addr()?, "Admin server starting");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_app)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered public router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
