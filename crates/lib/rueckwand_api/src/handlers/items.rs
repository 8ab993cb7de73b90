//! Item configuration handlers. Creating or resizing an item renders its
//! artifact; a failed render leaves nothing behind.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use rueckwand_core::catalog;
use tracing::info;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{CreateItemRequest, DetailResponse, ItemResponse, UpdateItemRequest};

/// `POST /items`
pub async fn create_item_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Json(body): Json<CreateItemRequest>,
) -> AppResult<Json<ItemResponse>> {
    let item = catalog::create_item(
        state.store.catalog.as_ref(),
        state.renderer.as_ref(),
        &body.into(),
    )
    .await?;
    info!(item_id = item.id, "item created");
    Ok(Json(item.into()))
}

/// `GET /items`
pub async fn list_items_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<ItemResponse>>> {
    let items = catalog::list_items(state.store.catalog.as_ref()).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// `GET /items/{item_id}`
pub async fn get_item_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<ItemResponse>> {
    let item = catalog::get_item(state.store.catalog.as_ref(), item_id).await?;
    Ok(Json(item.into()))
}

/// `PATCH /items/{item_id}`
pub async fn update_item_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
    Json(body): Json<UpdateItemRequest>,
) -> AppResult<Json<ItemResponse>> {
    let item = catalog::update_item(
        state.store.catalog.as_ref(),
        state.renderer.as_ref(),
        item_id,
        &body.into(),
    )
    .await?;
    Ok(Json(item.into()))
}

/// `DELETE /items/{item_id}`
pub async fn delete_item_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<DetailResponse>> {
    catalog::delete_item(state.store.catalog.as_ref(), item_id).await?;
    info!(item_id, "item deleted");
    Ok(Json(DetailResponse::new("Item deleted")))
}
