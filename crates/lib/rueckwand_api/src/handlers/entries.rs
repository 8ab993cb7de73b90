//! Shared bodies of the material and product type handlers.

use rueckwand_core::catalog;
use rueckwand_core::models::catalog::EntryKind;
use validator::Validate;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    CreateEntryRequest, DetailResponse, EntryResponse, NameQuery, UpdateEntryRequest,
};

pub(super) async fn create(
    state: &AppState,
    kind: EntryKind,
    body: CreateEntryRequest,
) -> AppResult<EntryResponse> {
    body.validate()?;
    let entry = catalog::create_entry(state.store.catalog.as_ref(), kind, &body.into()).await?;
    Ok(entry.into())
}

pub(super) async fn list(
    state: &AppState,
    kind: EntryKind,
    query: NameQuery,
) -> AppResult<Vec<EntryResponse>> {
    let entries =
        catalog::list_entries(state.store.catalog.as_ref(), kind, query.name.as_deref()).await?;
    Ok(entries.into_iter().map(Into::into).collect())
}

pub(super) async fn get(state: &AppState, kind: EntryKind, id: i64) -> AppResult<EntryResponse> {
    let entry = catalog::get_entry(state.store.catalog.as_ref(), kind, id).await?;
    Ok(entry.into())
}

pub(super) async fn update(
    state: &AppState,
    kind: EntryKind,
    id: i64,
    body: UpdateEntryRequest,
) -> AppResult<EntryResponse> {
    body.validate()?;
    let entry =
        catalog::update_entry(state.store.catalog.as_ref(), kind, id, &body.into()).await?;
    Ok(entry.into())
}

pub(super) async fn delete(
    state: &AppState,
    kind: EntryKind,
    id: i64,
) -> AppResult<DetailResponse> {
    catalog::delete_entry(state.store.catalog.as_ref(), kind, id).await?;
    Ok(DetailResponse::new(format!(
        "{} with id={id} was successfully deleted",
        kind.label()
    )))
}
