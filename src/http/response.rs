//! Response normalization.
//!
//! Layers such as the timeout, the body limit and the router's method check
//! answer on their own with empty or plain-text bodies. This middleware
//! rewrites those into the JSON error shape handlers use, keeping every other
//! header.

use axum::{
    body::Body,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        Request,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::GatewayError;

pub async fn json_error_bodies(req: Request<Body>, next: Next) -> Response {
    let response = next.run(req).await;
    if is_json(&response) {
        return response;
    }
    let Some(err) = GatewayError::from_status(response.status()) else {
        return response;
    };

    let (parts, _) = response.into_parts();
    let mut replaced = err.into_response();
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            replaced.headers_mut().append(name.clone(), value.clone());
        }
    }
    replaced
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}
