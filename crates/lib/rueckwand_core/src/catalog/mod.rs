//! Catalog operations with reference checks.
//!
//! Stores only persist; the existence checks that produce user-facing
//! "not found" messages live here.

use thiserror::Error;

use crate::artifact::{ArtifactError, ArtifactRenderer};
use crate::models::catalog::{
    CatalogEntry, EntryChanges, EntryKind, Item, ItemChanges, NewEntry, NewItem,
};
use crate::store::CatalogStore;

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    NotFound(String),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

fn entry_not_found(kind: EntryKind, id: i64) -> CatalogError {
    CatalogError::NotFound(format!("{} with id={id} was not found!", kind.label()))
}

fn item_not_found(id: i64) -> CatalogError {
    CatalogError::NotFound(format!("Item with id={id} was not found!"))
}

pub async fn create_entry(
    store: &dyn CatalogStore,
    kind: EntryKind,
    new: &NewEntry,
) -> Result<CatalogEntry, CatalogError> {
    store.create_entry(kind, new).await
}

pub async fn list_entries(
    store: &dyn CatalogStore,
    kind: EntryKind,
    name_filter: Option<&str>,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let filter = name_filter.map(str::trim).filter(|f| !f.is_empty());
    store.list_entries(kind, filter).await
}

pub async fn get_entry(
    store: &dyn CatalogStore,
    kind: EntryKind,
    id: i64,
) -> Result<CatalogEntry, CatalogError> {
    store
        .get_entry(kind, id)
        .await?
        .ok_or_else(|| entry_not_found(kind, id))
}

pub async fn update_entry(
    store: &dyn CatalogStore,
    kind: EntryKind,
    id: i64,
    changes: &EntryChanges,
) -> Result<CatalogEntry, CatalogError> {
    store
        .update_entry(kind, id, changes)
        .await?
        .ok_or_else(|| entry_not_found(kind, id))
}

pub async fn delete_entry(
    store: &dyn CatalogStore,
    kind: EntryKind,
    id: i64,
) -> Result<(), CatalogError> {
    if store.delete_entry(kind, id).await? {
        Ok(())
    } else {
        Err(entry_not_found(kind, id))
    }
}

/// Ensure the referenced entry exists.
async fn require_entry(
    store: &dyn CatalogStore,
    kind: EntryKind,
    id: i64,
) -> Result<(), CatalogError> {
    match store.get_entry(kind, id).await? {
        Some(_) => Ok(()),
        None => Err(entry_not_found(kind, id)),
    }
}

/// Create an item after checking that its material and product type exist.
pub async fn create_item(
    store: &dyn CatalogStore,
    renderer: &dyn ArtifactRenderer,
    new: &NewItem,
) -> Result<Item, CatalogError> {
    require_entry(store, EntryKind::Material, new.material_id).await?;
    require_entry(store, EntryKind::ProductType, new.product_type_id).await?;
    store.create_item(new, renderer).await
}

pub async fn list_items(store: &dyn CatalogStore) -> Result<Vec<Item>, CatalogError> {
    store.list_items().await
}

pub async fn get_item(store: &dyn CatalogStore, id: i64) -> Result<Item, CatalogError> {
    store.get_item(id).await?.ok_or_else(|| item_not_found(id))
}

/// Update an item; changed references must exist.
pub async fn update_item(
    store: &dyn CatalogStore,
    renderer: &dyn ArtifactRenderer,
    id: i64,
    changes: &ItemChanges,
) -> Result<Item, CatalogError> {
    // Item first, so a missing item wins over a missing reference.
    get_item(store, id).await?;
    if let Some(material_id) = changes.material_id {
        require_entry(store, EntryKind::Material, material_id).await?;
    }
    if let Some(product_type_id) = changes.product_type_id {
        require_entry(store, EntryKind::ProductType, product_type_id).await?;
    }
    store
        .update_item(id, changes, renderer)
        .await?
        .ok_or_else(|| item_not_found(id))
}

pub async fn delete_item(store: &dyn CatalogStore, id: i64) -> Result<(), CatalogError> {
    if store.delete_item(id).await? {
        Ok(())
    } else {
        Err(item_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::artifact::StagedArtifact;
    use crate::store::memory::MemoryStore;

    /// Records calls; fails when asked for a width of 13.
    #[derive(Default)]
    struct FakeRenderer {
        calls: Mutex<Vec<(i64, i32, i32)>>,
    }

    #[async_trait]
    impl ArtifactRenderer for FakeRenderer {
        async fn render(
            &self,
            item_id: i64,
            width: i32,
            height: i32,
        ) -> Result<StagedArtifact, ArtifactError> {
            if width == 13 {
                return Err(ArtifactError::InvalidSize { width, height });
            }
            self.calls.lock().unwrap().push((item_id, width, height));
            Ok(StagedArtifact::in_place(format!(
                "out/item_{item_id}_{width}x{height}.png"
            )))
        }
    }

    async fn seeded() -> (MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        let material = store
            .create_entry(
                EntryKind::Material,
                &NewEntry {
                    name: "Oak".into(),
                    description: Some("Solid oak".into()),
                },
            )
            .await
            .unwrap();
        let product_type = store
            .create_entry(
                EntryKind::ProductType,
                &NewEntry {
                    name: "Splashback".into(),
                    description: None,
                },
            )
            .await
            .unwrap();
        (store, material.id, product_type.id)
    }

    #[tokio::test]
    async fn create_item_renders_with_new_id() {
        let (store, material_id, product_type_id) = seeded().await;
        let renderer = FakeRenderer::default();
        let item = create_item(
            &store,
            &renderer,
            &NewItem {
                material_id,
                product_type_id,
                width: 300,
                height: 200,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            item.artifact_path.as_deref(),
            Some(format!("out/item_{}_300x200.png", item.id).as_str())
        );
        assert_eq!(renderer.calls.lock().unwrap().as_slice(), &[(item.id, 300, 200)]);
    }

    #[tokio::test]
    async fn create_item_with_unknown_references_is_not_found() {
        let (store, material_id, product_type_id) = seeded().await;
        let renderer = FakeRenderer::default();
        let err = create_item(
            &store,
            &renderer,
            &NewItem {
                material_id: 999,
                product_type_id,
                width: 300,
                height: 200,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Material with id=999 was not found!");

        let err = create_item(
            &store,
            &renderer,
            &NewItem {
                material_id,
                product_type_id: 998,
                width: 300,
                height: 200,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Product type with id=998 was not found!");
        assert!(renderer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_render_persists_nothing() {
        let (store, material_id, product_type_id) = seeded().await;
        let err = create_item(
            &store,
            &FakeRenderer::default(),
            &NewItem {
                material_id,
                product_type_id,
                width: 13,
                height: 200,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CatalogError::Artifact(_)));
        assert!(list_items(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resize_rerenders_and_failed_resize_keeps_item() {
        let (store, material_id, product_type_id) = seeded().await;
        let renderer = FakeRenderer::default();
        let item = create_item(
            &store,
            &renderer,
            &NewItem {
                material_id,
                product_type_id,
                width: 300,
                height: 200,
            },
        )
        .await
        .unwrap();

        let resized = update_item(
            &store,
            &renderer,
            item.id,
            &ItemChanges {
                height: Some(150),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(resized.height, 150);
        assert!(resized.artifact_path.unwrap().ends_with("300x150.png"));

        let err = update_item(
            &store,
            &renderer,
            item.id,
            &ItemChanges {
                width: Some(13),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CatalogError::Artifact(_)));
        assert_eq!(get_item(&store, item.id).await.unwrap().width, 300);
    }

    #[tokio::test]
    async fn update_without_resize_keeps_artifact() {
        let (store, material_id, product_type_id) = seeded().await;
        let renderer = FakeRenderer::default();
        let item = create_item(
            &store,
            &renderer,
            &NewItem {
                material_id,
                product_type_id,
                width: 300,
                height: 200,
            },
        )
        .await
        .unwrap();
        let other_material = store
            .create_entry(
                EntryKind::Material,
                &NewEntry {
                    name: "Glass".into(),
                    description: None,
                },
            )
            .await
            .unwrap();

        let updated = update_item(
            &store,
            &renderer,
            item.id,
            &ItemChanges {
                material_id: Some(other_material.id),
                width: Some(300),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.material_id, other_material.id);
        assert_eq!(updated.artifact_path, item.artifact_path);
        assert_eq!(renderer.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_material_removes_its_items() {
        let (store, material_id, product_type_id) = seeded().await;
        let renderer = FakeRenderer::default();
        let item = create_item(
            &store,
            &renderer,
            &NewItem {
                material_id,
                product_type_id,
                width: 300,
                height: 200,
            },
        )
        .await
        .unwrap();

        delete_entry(&store, EntryKind::Material, material_id)
            .await
            .unwrap();
        assert!(matches!(
            get_item(&store, item.id).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            delete_entry(&store, EntryKind::Material, material_id).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn name_filter_is_case_insensitive_substring() {
        let (store, _, _) = seeded().await;
        let hits = list_entries(&store, EntryKind::Material, Some("oA"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        let none = list_entries(&store, EntryKind::Material, Some("glass"))
            .await
            .unwrap();
        assert!(none.is_empty());
        let all = list_entries(&store, EntryKind::Material, Some("  "))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }
}
