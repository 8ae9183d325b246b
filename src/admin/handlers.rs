use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::QuotaConfig;
use crate::http::server::AppState;
use crate::identity::IdentitySummary;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_identities(State(state): State<AppState>) -> Json<IdentitySummary> {
    Json(state.identities.summary())
}

pub async fn get_quota_policy(State(state): State<AppState>) -> Json<QuotaConfig> {
    Json(state.quota_policy.load().as_ref().clone())
}
