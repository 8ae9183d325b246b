//! Bearer-token authentication.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::identity::{IdentityStore, Token, UserRecord};

/// Context attached to authenticated requests.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub UserRecord);

/// Resolves presented credentials to identity snapshots.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<IdentityStore>,
}

impl Authenticator {
    pub fn new(store: Arc<IdentityStore>) -> Self {
        Self { store }
    }

    /// Resolve a bare token.
    pub fn authenticate(&self, credential: &str) -> Result<UserRecord, GatewayError> {
        self.store
            .lookup_by_token(&Token::from(credential))
            .ok_or(GatewayError::Unauthorized)
    }

    /// Resolve an `Authorization` header value.
    pub fn authenticate_header(
        &self,
        header: Option<&HeaderValue>,
    ) -> Result<UserRecord, GatewayError> {
        let credential = header
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_credential)
            .ok_or(GatewayError::Unauthorized)?;
        self.authenticate(credential)
    }
}

/// Second whitespace-separated field of a `<scheme> <credential>` header.
/// The scheme word itself is not checked.
pub fn bearer_credential(header: &str) -> Option<&str> {
    let mut fields = header.split_whitespace();
    fields.next()?;
    fields.next()
}

/// Middleware that rejects unauthenticated requests and attaches
/// [`AuthenticatedUser`] for everything downstream.
pub async fn require_token(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let user = match state.authenticator.authenticate_header(req.headers().get(AUTHORIZATION)) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), "Rejected unauthenticated request");
            return Err(e);
        }
    };

    req.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(req).await)
}
