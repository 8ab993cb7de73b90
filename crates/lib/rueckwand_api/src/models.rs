//! Request and response bodies. JSON fields are camelCase on the wire.

use chrono::{DateTime, Utc};
use rueckwand_core::models::auth::{Session, User};
use rueckwand_core::models::catalog::{
    CatalogEntry, EntryChanges, Item, ItemChanges, NewEntry, NewItem,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Acknowledgement body for operations without a resource to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// OAuth2 password-flow form (`application/x-www-form-urlencoded`).
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: i64,
    pub user_id: i64,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            is_revoked: s.state.is_revoked(),
            jti: s.token_id,
            expires_at: s.expires_at,
            created_at: s.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "value is not a valid email address"), length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email(message = "value is not a valid email address"), length(max = 255))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Materials and product types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEntryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

impl From<CreateEntryRequest> for NewEntry {
    fn from(r: CreateEntryRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEntryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

impl From<UpdateEntryRequest> for EntryChanges {
    fn from(r: UpdateEntryRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl From<CatalogEntry> for EntryResponse {
    fn from(e: CatalogEntry) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
        }
    }
}

/// `?name=` filter for catalog listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub material_id: i64,
    pub product_type_id: i64,
    pub width: i32,
    pub height: i32,
}

impl From<CreateItemRequest> for NewItem {
    fn from(r: CreateItemRequest) -> Self {
        Self {
            material_id: r.material_id,
            product_type_id: r.product_type_id,
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub material_id: Option<i64>,
    pub product_type_id: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl From<UpdateItemRequest> for ItemChanges {
    fn from(r: UpdateItemRequest) -> Self {
        Self {
            material_id: r.material_id,
            product_type_id: r.product_type_id,
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: i64,
    pub material_id: i64,
    pub product_type_id: i64,
    pub width: i32,
    pub height: i32,
    pub artifact_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(i: Item) -> Self {
        Self {
            id: i.id,
            material_id: i.material_id,
            product_type_id: i.product_type_id,
            width: i.width,
            height: i.height,
            artifact_path: i.artifact_path,
            created_at: i.created_at,
        }
    }
}
