//! Public, non-gated endpoints: liveness, registration and recharge.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::security::{AuthenticatedUser, ClientIp};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub token: String,
    pub requests_remaining: u64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeResponse {
    pub message: String,
    pub new_requests_remaining: u64,
    pub last_recharge: DateTime<Utc>,
    pub requests_remaining_after: u64,
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
) -> Result<(StatusCode, Json<RegisterResponse>), GatewayError> {
    let record = state.registration.register(ip)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token: record.token.to_string(),
            requests_remaining: record.requests_remaining,
            message: format!(
                "User registered successfully. You have {} requests available.",
                record.requests_remaining
            ),
        }),
    ))
}

/// Body is parsed leniently: anything that is not a JSON object with an
/// `amount` field falls back to the default recharge.
pub async fn recharge(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    body: Bytes,
) -> Result<Json<RechargeResponse>, GatewayError> {
    let parsed: Option<Value> = serde_json::from_slice(&body).ok();
    let requested = parsed.as_ref().and_then(|v| v.get("amount"));

    let outcome = state.recharge.recharge(&user, requested)?;
    let remaining = outcome.record.requests_remaining;

    Ok(Json(RechargeResponse {
        message: format!("Recharged {} requests.", outcome.amount),
        new_requests_remaining: remaining,
        last_recharge: outcome.record.last_recharge,
        requests_remaining_after: remaining,
    }))
}

pub async fn not_found() -> GatewayError {
    GatewayError::NotFound("No such route.".into())
}
