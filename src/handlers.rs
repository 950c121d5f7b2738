use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::{DeletedResponse, GroceryItem, UpdatedResponse};
use crate::validation::{self, validate_purchased};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

// A malformed id can never name a stored row.
fn item_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::NotFound)
}

#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (status, status_text, database) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "ok"),
        Err(e) => {
            warn!(error = ?e, "Database health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "unavailable")
        }
    };

    (
        status,
        Json(HealthResponse {
            status: status_text.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
        }),
    )
}

#[instrument(skip(state))]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (content_type, encoded) = state.metrics.render();
    ([(header::CONTENT_TYPE, content_type)], encoded)
}

#[instrument(skip(state))]
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<GroceryItem>>, ApiError> {
    let items = state.timed("list", state.store.list()).await?;
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<GroceryItem>), ApiError> {
    let Json(payload) = payload?;

    let new_item = validation::validate_create(&state.store, &payload).await?;
    let item = state.timed("insert", state.store.create(&new_item)).await?;

    info!(item_id = item.id, item = %item, "Created item");
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn delete_all_items(
    State(state): State<AppState>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state.timed("delete_all", state.store.delete_all()).await?;

    info!(deleted, "Deleted all items");
    Ok(Json(DeletedResponse { deleted }))
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<GroceryItem>, ApiError> {
    let id = item_id(path)?;

    match state.timed("select", state.store.get(id)).await? {
        Some(item) => Ok(Json(item)),
        None => {
            warn!(item_id = id, "Item not found");
            Err(ApiError::NotFound)
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GroceryItem>, ApiError> {
    let id = item_id(path)?;

    if state.timed("select", state.store.get(id)).await?.is_none() {
        warn!(item_id = id, "Item not found");
        return Err(ApiError::NotFound);
    }

    let Json(payload) = payload?;
    let changes = validation::validate_update(&state.store, id, &payload).await?;

    // The row can vanish between the lookup and the write.
    let item = state
        .timed("update", state.store.update(id, &changes))
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(item_id = item.id, item = %item, "Updated item");
    Ok(Json(item))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = item_id(path)?;

    if state.timed("delete", state.store.delete(id)).await? {
        info!(item_id = id, "Deleted item");
        Ok(StatusCode::NO_CONTENT)
    } else {
        warn!(item_id = id, "Item not found");
        Err(ApiError::NotFound)
    }
}

#[instrument(skip(state, payload))]
pub async fn bulk_update_purchased(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let Json(payload) = payload?;

    let purchased = match payload.get("purchased") {
        None | Some(Value::Null) => {
            return Err(ApiError::BadRequest(
                "purchased field is required".to_string(),
            ))
        }
        Some(value) => validate_purchased(value)
            .map_err(|_| ApiError::BadRequest("purchased must be a boolean".to_string()))?,
    };

    let updated = state
        .timed("bulk_update", state.store.set_all_purchased(purchased))
        .await?;

    info!(updated, purchased, "Bulk updated purchased flag");
    Ok(Json(UpdatedResponse { updated }))
}
