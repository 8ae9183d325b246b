//! Protected resource collection.
//!
//! Plain CRUD over an in-memory collection. Carries no quota logic of its
//! own; the server wraps these routes with authentication and quota
//! enforcement.

pub mod handlers;
pub mod store;

use axum::{routing::get, Router};

use crate::http::server::AppState;

pub use store::{Item, ItemPayload, ItemStore};

/// Item routes, unlayered.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/items/{id}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
}
