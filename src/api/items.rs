//! Catalog item endpoints (minimal surface for circulation)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::item::{CreateItem, Item},
    AppState,
};

/// Create a catalog item with its physical copies
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let item = state.services.repository.items.create(&request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Get a catalog item
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<Item>> {
    let item = state.services.repository.items.get_by_id(item_id).await?;
    Ok(Json(item))
}
