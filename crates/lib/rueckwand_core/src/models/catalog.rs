//! Catalog domain models: materials, product types and item configurations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two flat catalog tables. Both share the `{id, name, description}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Material,
    ProductType,
}

impl EntryKind {
    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            EntryKind::Material => "materials",
            EntryKind::ProductType => "product_types",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Material => "Material",
            EntryKind::ProductType => "Product type",
        }
    }
}

/// A material or product type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EntryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A configured item with its rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub material_id: i64,
    pub product_type_id: i64,
    pub width: i32,
    pub height: i32,
    pub artifact_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub material_id: i64,
    pub product_type_id: i64,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub material_id: Option<i64>,
    pub product_type_id: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl ItemChanges {
    /// Whether applying these changes to `item` alters its rendered size.
    pub fn resizes(&self, item: &Item) -> bool {
        self.width.is_some_and(|w| w != item.width) || self.height.is_some_and(|h| h != item.height)
    }

    /// Returns `item` with these changes applied.
    pub fn apply(&self, item: &Item) -> Item {
        Item {
            material_id: self.material_id.unwrap_or(item.material_id),
            product_type_id: self.product_type_id.unwrap_or(item.product_type_id),
            width: self.width.unwrap_or(item.width),
            height: self.height.unwrap_or(item.height),
            ..item.clone()
        }
    }
}
