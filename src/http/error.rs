//! Gateway error taxonomy and its HTTP mapping.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::identity::IdentityError;

/// Terminal per-request outcomes. None of them is fatal to the process.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("You can only register one time while you have remaining requests.")]
    AlreadyRegistered,

    /// Missing header, malformed header and unknown token all land here.
    #[error("A valid bearer token is required.")]
    Unauthorized,

    #[error("You have no requests remaining. Recharge to continue.")]
    QuotaExhausted { remaining: u64 },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("This endpoint does not accept that method.")]
    MethodNotAllowed,

    #[error("The request took too long to process.")]
    Timeout,

    #[error("The request body exceeds the configured limit.")]
    PayloadTooLarge,

    /// Detail is logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AlreadyRegistered => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::QuotaExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error for a bare status produced outside any handler, if it has one.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::METHOD_NOT_ALLOWED => Some(Self::MethodNotAllowed),
            StatusCode::REQUEST_TIMEOUT => Some(Self::Timeout),
            StatusCode::PAYLOAD_TOO_LARGE => Some(Self::PayloadTooLarge),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered => "Already registered",
            Self::Unauthorized => "Unauthorized",
            Self::QuotaExhausted { .. } => "Quota exhausted",
            Self::NotFound(_) => "Not found",
            Self::BadRequest(_) => "Bad request",
            Self::MethodNotAllowed => "Method not allowed",
            Self::Timeout => "Request timeout",
            Self::PayloadTooLarge => "Payload too large",
            Self::Internal(_) => "Internal server error",
        }
    }
}

impl From<IdentityError> for GatewayError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::AlreadyRegistered => Self::AlreadyRegistered,
            IdentityError::UnknownToken => Self::Unauthorized,
            IdentityError::QuotaExhausted => Self::QuotaExhausted { remaining: 0 },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::QuotaExhausted { remaining } => json!({
                "error": self.label(),
                "message": self.to_string(),
                "requestsRemaining": remaining,
            }),
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "Request failed");
                json!({ "error": self.label() })
            }
            _ => json!({
                "error": self.label(),
                "message": self.to_string(),
            }),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Response used by the catch-panic layer.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    GatewayError::Internal(format!("handler panicked: {detail}")).into_response()
}
