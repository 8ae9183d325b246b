//! Quota enforcement middleware.
//!
//! Wraps a downstream handler as check → invoke → settle. The check takes one
//! unit from the token under its lock, so concurrent requests can never
//! jointly spend more than the token holds. The unit is kept only when the
//! handler answers 2xx; the post-charge count is appended to the JSON body
//! before the response leaves.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue, Request,
    },
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::identity::IdentityError;
use crate::observability::metrics;
use crate::security::auth::AuthenticatedUser;

/// Field appended to every successful quota-gated response.
pub const REMAINING_FIELD: &str = "requestsRemainingAfter";

pub async fn enforce_quota(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let AuthenticatedUser(user) = req
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(GatewayError::Unauthorized)?;
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    // 1. Check
    let reservation = match state.identities.try_reserve(&user.token) {
        Ok(reservation) => reservation,
        Err(IdentityError::QuotaExhausted) => {
            tracing::info!(
                user_id = %user.user_id,
                method = %method,
                path = %path,
                "Quota exhausted"
            );
            metrics::record_quota_charge("exhausted");
            return Err(GatewayError::QuotaExhausted { remaining: 0 });
        }
        Err(e) => return Err(e.into()),
    };

    // 2. Invoke
    let response = next.run(req).await;

    // 3. Settle
    if !response.status().is_success() {
        tracing::debug!(
            user_id = %user.user_id,
            method = %method,
            path = %path,
            status = %response.status(),
            "Handler did not succeed, quota not charged"
        );
        reservation.release();
        metrics::record_quota_charge("released");
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let mut payload = read_json(body).await?;
    attach_remaining(&mut payload, reservation.after());
    let bytes = serde_json::to_vec(&payload)
        .map_err(|e| GatewayError::Internal(format!("encoding charged response: {e}")))?;

    let before = reservation.before();
    let remaining = reservation.commit();
    tracing::info!(
        user_id = %user.user_id,
        method = %method,
        path = %path,
        requests_before = before,
        requests_after = remaining,
        "Quota charged"
    );
    metrics::record_quota_charge("charged");

    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(Response::from_parts(parts, Body::from(bytes)))
}

async fn read_json(body: Body) -> Result<Value, GatewayError> {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| GatewayError::Internal(format!("buffering handler response: {e}")))?;
    if bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::Internal(format!("handler returned non-JSON body: {e}")))
}

/// Add the remaining count to an object body, wrapping anything else.
fn attach_remaining(payload: &mut Value, remaining: u64) {
    match payload {
        Value::Object(map) => {
            map.insert(REMAINING_FIELD.to_string(), Value::from(remaining));
        }
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other.take());
            map.insert(REMAINING_FIELD.to_string(), Value::from(remaining));
            *other = Value::Object(map);
        }
    }
}
