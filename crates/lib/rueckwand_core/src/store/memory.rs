//! In-process store for tests and local development.
//!
//! Mirrors the PostgreSQL schema: unique emails and token ids, cascading
//! deletes, ids that are never reused (one sequence shared by all tables).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CatalogStore, CredentialStore, SessionLedger};
use crate::artifact::ArtifactRenderer;
use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::models::auth::{Session, SessionState, User, UserChanges, UserWithPassword};
use crate::models::catalog::{
    CatalogEntry, EntryChanges, EntryKind, Item, ItemChanges, NewEntry, NewItem,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserWithPassword>,
    sessions: BTreeMap<i64, Session>,
    materials: BTreeMap<i64, CatalogEntry>,
    product_types: BTreeMap<i64, CatalogEntry>,
    items: BTreeMap<i64, Item>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn entries(&self, kind: EntryKind) -> &BTreeMap<i64, CatalogEntry> {
        match kind {
            EntryKind::Material => &self.materials,
            EntryKind::ProductType => &self.product_types,
        }
    }

    fn entries_mut(&mut self, kind: EntryKind) -> &mut BTreeMap<i64, CatalogEntry> {
        match kind {
            EntryKind::Material => &mut self.materials,
            EntryKind::ProductType => &mut self.product_types,
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.user.email == email && Some(u.user.id) != except)
    }

    fn session_by_token_id_mut(&mut self, token_id: &str) -> Option<&mut Session> {
        self.sessions.values_mut().find(|s| s.token_id == token_id)
    }
}

/// Store holding all tables behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_conflict(email: &str) -> AuthError {
    AuthError::Conflict(format!("email {email} already in use"))
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.user.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).map(|u| u.user.clone()))
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        is_active: bool,
    ) -> Result<User, AuthError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(email, None) {
            return Err(email_conflict(email));
        }
        let user = User {
            id: tables.next_id(),
            email: email.to_string(),
            is_active,
            created_at: Utc::now(),
        };
        tables.users.insert(
            user.id,
            UserWithPassword {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().map(|u| u.user.clone()).collect())
    }

    async fn update(
        &self,
        user_id: i64,
        changes: &UserChanges,
    ) -> Result<Option<User>, AuthError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email
            && tables.email_taken(email, Some(user_id))
        {
            return Err(email_conflict(email));
        }
        let Some(stored) = tables.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            stored.user.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            stored.password_hash = hash.clone();
        }
        if let Some(is_active) = changes.is_active {
            stored.user.is_active = is_active;
        }
        Ok(Some(stored.user.clone()))
    }

    async fn delete(&self, user_id: i64) -> Result<bool, AuthError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        tables.sessions.retain(|_, s| s.user_id != user_id);
        Ok(true)
    }
}

#[async_trait]
impl SessionLedger for MemoryStore {
    async fn create(
        &self,
        user_id: i64,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AuthError::NotFound(format!("user {user_id}")));
        }
        if tables.session_by_token_id_mut(token_id).is_some() {
            return Err(AuthError::Conflict(format!("token id {token_id} already exists")));
        }
        let session = Session {
            id: tables.next_id(),
            user_id,
            token_id: token_id.to_string(),
            expires_at,
            state: SessionState::Active,
            created_at: Utc::now(),
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<Session>, AuthError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.token_id == token_id)
            .cloned())
    }

    async fn revoke(&self, token_id: &str) -> Result<Option<Session>, AuthError> {
        let mut tables = self.tables.write().await;
        Ok(tables.session_by_token_id_mut(token_id).map(|s| {
            s.state = SessionState::Revoked;
            s.clone()
        }))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, session_id: i64) -> Result<Option<Session>, AuthError> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(&session_id).cloned())
    }

    async fn delete(&self, session: &Session) -> Result<bool, AuthError> {
        let mut tables = self.tables.write().await;
        Ok(tables.sessions.remove(&session.id).is_some())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_entry(
        &self,
        kind: EntryKind,
        new: &NewEntry,
    ) -> Result<CatalogEntry, CatalogError> {
        let mut tables = self.tables.write().await;
        let entry = CatalogEntry {
            id: tables.next_id(),
            name: new.name.clone(),
            description: new.description.clone(),
        };
        tables.entries_mut(kind).insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn list_entries(
        &self,
        kind: EntryKind,
        name_filter: Option<&str>,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let tables = self.tables.read().await;
        let needle = name_filter.map(str::to_lowercase);
        Ok(tables
            .entries(kind)
            .values()
            .filter(|e| {
                needle
                    .as_deref()
                    .is_none_or(|n| e.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect())
    }

    async fn get_entry(
        &self,
        kind: EntryKind,
        id: i64,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.entries(kind).get(&id).cloned())
    }

    async fn update_entry(
        &self,
        kind: EntryKind,
        id: i64,
        changes: &EntryChanges,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.entries_mut(kind).get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            entry.name = name.clone();
        }
        if let Some(description) = &changes.description {
            entry.description = Some(description.clone());
        }
        Ok(Some(entry.clone()))
    }

    async fn delete_entry(&self, kind: EntryKind, id: i64) -> Result<bool, CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.entries_mut(kind).remove(&id).is_none() {
            return Ok(false);
        }
        tables.items.retain(|_, item| match kind {
            EntryKind::Material => item.material_id != id,
            EntryKind::ProductType => item.product_type_id != id,
        });
        Ok(true)
    }

    async fn create_item(
        &self,
        new: &NewItem,
        renderer: &dyn ArtifactRenderer,
    ) -> Result<Item, CatalogError> {
        // Held across the render so the insert stays atomic with it.
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let artifact_path = renderer.render(id, new.width, new.height).await?.publish()?;
        let item = Item {
            id,
            material_id: new.material_id,
            product_type_id: new.product_type_id,
            width: new.width,
            height: new.height,
            artifact_path: Some(artifact_path),
            created_at: Utc::now(),
        };
        tables.items.insert(id, item.clone());
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.items.values().cloned().collect())
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.items.get(&id).cloned())
    }

    async fn update_item(
        &self,
        id: i64,
        changes: &ItemChanges,
        renderer: &dyn ArtifactRenderer,
    ) -> Result<Option<Item>, CatalogError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.items.get(&id).cloned() else {
            return Ok(None);
        };
        let mut updated = changes.apply(&current);
        if changes.resizes(&current) {
            let staged = renderer.render(id, updated.width, updated.height).await?;
            updated.artifact_path = Some(staged.publish()?);
        }
        tables.items.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_item(&self, id: i64) -> Result<bool, CatalogError> {
        let mut tables = self.tables.write().await;
        Ok(tables.items.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = CredentialStore::create(&store, "a@b.com", "hash", true)
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (store, _) = store_with_user().await;
        let err = CredentialStore::create(&store, "a@b.com", "hash", true)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
        // Case-sensitive as stored.
        assert!(
            CredentialStore::create(&store, "A@b.com", "hash", true)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn duplicate_token_id_is_a_conflict_and_keeps_original() {
        let (store, user) = store_with_user().await;
        let expires = Utc::now() + Duration::minutes(30);
        let first = SessionLedger::create(&store, user.id, "jti-1", expires)
            .await
            .unwrap();
        let err = SessionLedger::create(&store, user.id, "jti-1", expires + Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
        let stored = store.find_by_token_id("jti-1").await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn revoke_is_idempotent_and_monotone() {
        let (store, user) = store_with_user().await;
        let expires = Utc::now() + Duration::minutes(30);
        SessionLedger::create(&store, user.id, "jti-1", expires)
            .await
            .unwrap();

        let first = store.revoke("jti-1").await.unwrap().unwrap();
        let second = store.revoke("jti-1").await.unwrap().unwrap();
        assert_eq!(first.state, SessionState::Revoked);
        assert_eq!(second.state, SessionState::Revoked);
        assert_eq!(first.expires_at, expires);
        assert!(store.revoke("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_user_cascades_sessions() {
        let (store, user) = store_with_user().await;
        let other = CredentialStore::create(&store, "c@d.com", "hash", true)
            .await
            .unwrap();
        let expires = Utc::now() + Duration::minutes(30);
        SessionLedger::create(&store, user.id, "jti-1", expires)
            .await
            .unwrap();
        SessionLedger::create(&store, other.id, "jti-2", expires)
            .await
            .unwrap();

        assert!(CredentialStore::delete(&store, user.id).await.unwrap());
        assert!(store.list_for_user(user.id).await.unwrap().is_empty());
        assert!(store.find_by_token_id("jti-1").await.unwrap().is_none());
        assert_eq!(store.list_for_user(other.id).await.unwrap().len(), 1);
        assert!(!CredentialStore::delete(&store, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn email_update_checks_uniqueness() {
        let (store, user) = store_with_user().await;
        let other = CredentialStore::create(&store, "c@d.com", "hash", true)
            .await
            .unwrap();
        let err = store
            .update(
                other.id,
                &UserChanges {
                    email: Some(user.email.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));

        // Re-saving the own email is fine.
        let same = store
            .update(
                user.id,
                &UserChanges {
                    email: Some(user.email.clone()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(!same.is_active);
        assert!(store.update(999, &UserChanges::default()).await.unwrap().is_none());
    }
}
