//! Persistence contracts and their backends.
//!
//! Each trait is implemented by [`postgres::PgStore`] (production) and
//! [`memory::MemoryStore`] (tests and local development). The traits are
//! plain data access: ownership checks belong to the caller.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::artifact::ArtifactRenderer;
use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::models::auth::{Session, User, UserChanges, UserWithPassword};
use crate::models::catalog::{
    CatalogEntry, EntryChanges, EntryKind, Item, ItemChanges, NewEntry, NewItem,
};

/// Users and their password hashes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError>;

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError>;

    /// Insert a user. `Conflict` when the email is taken.
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        is_active: bool,
    ) -> Result<User, AuthError>;

    async fn list(&self) -> Result<Vec<User>, AuthError>;

    /// Apply `changes`; `None` when the user does not exist, `Conflict` when
    /// the new email is taken.
    async fn update(&self, user_id: i64, changes: &UserChanges)
    -> Result<Option<User>, AuthError>;

    /// Delete a user together with all of its sessions. Returns whether a row was removed.
    async fn delete(&self, user_id: i64) -> Result<bool, AuthError>;
}

/// One record per issued access token.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Insert an active session. `Conflict` when `token_id` already exists.
    async fn create(
        &self,
        user_id: i64,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AuthError>;

    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<Session>, AuthError>;

    /// Mark a session revoked. Idempotent; `None` when no such session exists.
    async fn revoke(&self, token_id: &str) -> Result<Option<Session>, AuthError>;

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Session>, AuthError>;

    async fn find_by_id(&self, session_id: i64) -> Result<Option<Session>, AuthError>;

    /// Remove a session row. Returns whether a row was removed.
    async fn delete(&self, session: &Session) -> Result<bool, AuthError>;
}

/// Materials, product types and item configurations.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_entry(&self, kind: EntryKind, new: &NewEntry)
    -> Result<CatalogEntry, CatalogError>;

    /// List entries, optionally filtered by a case-insensitive name substring.
    async fn list_entries(
        &self,
        kind: EntryKind,
        name_filter: Option<&str>,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    async fn get_entry(&self, kind: EntryKind, id: i64)
    -> Result<Option<CatalogEntry>, CatalogError>;

    async fn update_entry(
        &self,
        kind: EntryKind,
        id: i64,
        changes: &EntryChanges,
    ) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Delete an entry and every item referencing it.
    async fn delete_entry(&self, kind: EntryKind, id: i64) -> Result<bool, CatalogError>;

    /// Insert an item, render its artifact using the new id and store the
    /// path, as one unit: if rendering fails nothing is persisted. The
    /// artifact is published only after the row is written.
    async fn create_item(
        &self,
        new: &NewItem,
        renderer: &dyn ArtifactRenderer,
    ) -> Result<Item, CatalogError>;

    async fn list_items(&self) -> Result<Vec<Item>, CatalogError>;

    async fn get_item(&self, id: i64) -> Result<Option<Item>, CatalogError>;

    /// Apply `changes`, re-rendering the artifact when the size changes. As
    /// with creation, a failed render or write leaves both the stored item
    /// and its previous artifact file untouched.
    async fn update_item(
        &self,
        id: i64,
        changes: &ItemChanges,
        renderer: &dyn ArtifactRenderer,
    ) -> Result<Option<Item>, CatalogError>;

    async fn delete_item(&self, id: i64) -> Result<bool, CatalogError>;
}

/// Handles to every store, all backed by the same database.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionLedger>,
    pub catalog: Arc<dyn CatalogStore>,
}

impl Store {
    /// Stores backed by PostgreSQL.
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_backend(Arc::new(postgres::PgStore::new(pool)))
    }

    /// Stores backed by process memory. Data is lost on exit.
    pub fn memory() -> Self {
        Self::from_backend(Arc::new(memory::MemoryStore::new()))
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CredentialStore + SessionLedger + CatalogStore + 'static,
    {
        Self {
            users: backend.clone(),
            sessions: backend.clone(),
            catalog: backend,
        }
    }
}
