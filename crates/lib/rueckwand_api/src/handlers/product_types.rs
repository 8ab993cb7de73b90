//! `/product-types` handlers. All require an authenticated user.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use rueckwand_core::models::catalog::EntryKind;

use super::entries;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{
    CreateEntryRequest, DetailResponse, EntryResponse, NameQuery, UpdateEntryRequest,
};

const KIND: EntryKind = EntryKind::ProductType;

/// `POST /product-types`
pub async fn create_product_type_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Json(body): Json<CreateEntryRequest>,
) -> AppResult<Json<EntryResponse>> {
    entries::create(&state, KIND, body).await.map(Json)
}

/// `GET /product-types`: optionally filtered by `?name=`.
pub async fn list_product_types_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Query(query): Query<NameQuery>,
) -> AppResult<Json<Vec<EntryResponse>>> {
    entries::list(&state, KIND, query).await.map(Json)
}

/// `GET /product-types/{product_type_id}`
pub async fn get_product_type_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<EntryResponse>> {
    entries::get(&state, KIND, id).await.map(Json)
}

/// `PATCH /product-types/{product_type_id}`
pub async fn update_product_type_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateEntryRequest>,
) -> AppResult<Json<EntryResponse>> {
    entries::update(&state, KIND, id, body).await.map(Json)
}

/// `DELETE /product-types/{product_type_id}`: also deletes items referencing it.
pub async fn delete_product_type_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<DetailResponse>> {
    entries::delete(&state, KIND, id).await.map(Json)
}
