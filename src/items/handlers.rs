//! Item endpoints.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::items::store::{Item, ItemPayload};

fn item_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, GatewayError> {
    path.map(|Path(id)| id)
        .map_err(|e| GatewayError::BadRequest(e.body_text()))
}

fn payload(body: Result<Json<ItemPayload>, JsonRejection>) -> Result<(String, Option<String>), GatewayError> {
    let Json(payload) = body.map_err(|e| match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => GatewayError::PayloadTooLarge,
        _ => GatewayError::BadRequest(e.body_text()),
    })?;
    let name = payload.validated_name().map_err(GatewayError::BadRequest)?;
    Ok((name, payload.description))
}

fn missing(id: u64) -> GatewayError {
    GatewayError::NotFound(format!("Item {id} not found."))
}

pub async fn list_items(State(state): State<AppState>) -> Json<Value> {
    let items = state.items.list();
    Json(json!({ "count": items.len(), "items": items }))
}

pub async fn get_item(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Item>, GatewayError> {
    let id = item_id(path)?;
    state.items.get(id).map(Json).ok_or_else(|| missing(id))
}

pub async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<ItemPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), GatewayError> {
    let (name, description) = payload(body)?;
    let item = state.items.create(name, description);
    tracing::debug!(item_id = item.id, "Item created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<ItemPayload>, JsonRejection>,
) -> Result<Json<Item>, GatewayError> {
    let id = item_id(path)?;
    let (name, description) = payload(body)?;
    state
        .items
        .update(id, name, description)
        .map(Json)
        .ok_or_else(|| missing(id))
}

pub async fn delete_item(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, GatewayError> {
    let id = item_id(path)?;
    let item = state.items.delete(id).ok_or_else(|| missing(id))?;
    Ok(Json(json!({ "message": "Item deleted.", "item": item })))
}
