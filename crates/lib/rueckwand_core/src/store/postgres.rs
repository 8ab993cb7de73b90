//! PostgreSQL-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{CatalogStore, CredentialStore, SessionLedger};
use crate::artifact::ArtifactRenderer;
use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::models::auth::{Session, SessionState, User, UserChanges, UserWithPassword};
use crate::models::catalog::{
    CatalogEntry, EntryChanges, EntryKind, Item, ItemChanges, NewEntry, NewItem,
};

const USER_COLUMNS: &str = "id, email, hashed_password, is_active, created_at";
const SESSION_COLUMNS: &str = "id, user_id, jti, expires_at, is_revoked, created_at";
const ITEM_COLUMNS: &str =
    "id, material_id, product_type_id, width, height, artifact_path, created_at";

/// Row returned by user queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    hashed_password: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserWithPassword {
    fn from(row: UserRow) -> Self {
        UserWithPassword {
            user: User {
                id: row.id,
                email: row.email,
                is_active: row.is_active,
                created_at: row.created_at,
            },
            password_hash: row.hashed_password,
        }
    }
}

/// Row returned by token session queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SessionRow {
    id: i64,
    user_id: i64,
    jti: String,
    expires_at: DateTime<Utc>,
    is_revoked: bool,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            token_id: row.jti,
            expires_at: row.expires_at,
            state: SessionState::from_revoked(row.is_revoked),
            created_at: row.created_at,
        }
    }
}

/// Row returned by material and product type queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct EntryRow {
    id: i64,
    name: String,
    description: Option<String>,
}

impl From<EntryRow> for CatalogEntry {
    fn from(row: EntryRow) -> Self {
        CatalogEntry {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

/// Row returned by item queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    material_id: i64,
    product_type_id: i64,
    width: i32,
    height: i32,
    artifact_path: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            material_id: row.material_id,
            product_type_id: row.product_type_id,
            width: row.width,
            height: row.height,
            artifact_path: row.artifact_path,
            created_at: row.created_at,
        }
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `DbError`.
fn conflict_or_db(e: sqlx::Error, what: impl FnOnce() -> String) -> AuthError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return AuthError::Conflict(what());
    }
    AuthError::DbError(e)
}

/// Stores backed by a PostgreSQL pool. Each call is its own transaction
/// unless noted.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserWithPassword::from(r).user))
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        is_active: bool,
    ) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, hashed_password, is_active) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, || format!("email {email} already in use")))?;
        Ok(UserWithPassword::from(row).user)
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| UserWithPassword::from(r).user)
            .collect())
    }

    async fn update(
        &self,
        user_id: i64,
        changes: &UserChanges,
    ) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
                 email = COALESCE($2, email), \
                 hashed_password = COALESCE($3, hashed_password), \
                 is_active = COALESCE($4, is_active) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(changes.email.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_db(e, || {
                format!(
                    "email {} already in use",
                    changes.email.as_deref().unwrap_or_default()
                )
            })
        })?;
        Ok(row.map(|r| UserWithPassword::from(r).user))
    }

    async fn delete(&self, user_id: i64) -> Result<bool, AuthError> {
        // token_sessions rows go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionLedger for PgStore {
    async fn create(
        &self,
        user_id: i64,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "INSERT INTO token_sessions (user_id, jti, expires_at, is_revoked) \
             VALUES ($1, $2, $3, FALSE) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(token_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, || format!("token id {token_id} already exists")))?;
        Ok(row.into())
    }

    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM token_sessions WHERE jti = $1"
        ))
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn revoke(&self, token_id: &str) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "UPDATE token_sessions SET is_revoked = TRUE WHERE jti = $1 \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM token_sessions WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, session_id: i64) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM token_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, session: &Session) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM token_sessions WHERE id = $1")
            .bind(session.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn create_entry(
        &self,
        kind: EntryKind,
        new: &NewEntry,
    ) -> Result<CatalogEntry, CatalogError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2) \
             RETURNING id, name, description",
            kind.table()
        ))
        .bind(&new.name)
        .bind(new.description.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_entries(
        &self,
        kind: EntryKind,
        name_filter: Option<&str>,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT id, name, description FROM {} \
             WHERE $1::text IS NULL OR name ILIKE '%' || $1 || '%' \
             ORDER BY id",
            kind.table()
        ))
        .bind(name_filter.map(escape_like))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_entry(
        &self,
        kind: EntryKind,
        id: i64,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT id, name, description FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_entry(
        &self,
        kind: EntryKind,
        id: i64,
        changes: &EntryChanges,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "UPDATE {} SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description) \
             WHERE id = $1 \
             RETURNING id, name, description",
            kind.table()
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_entry(&self, kind: EntryKind, id: i64) -> Result<bool, CatalogError> {
        // Items referencing the entry go with it (ON DELETE CASCADE).
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_item(
        &self,
        new: &NewItem,
        renderer: &dyn ArtifactRenderer,
    ) -> Result<Item, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO item_configurations (material_id, product_type_id, width, height) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(new.material_id)
        .bind(new.product_type_id)
        .bind(new.width)
        .bind(new.height)
        .fetch_one(&mut *tx)
        .await?;

        // Dropping `tx` on error rolls the insert back, dropping `artifact`
        // discards the staged file.
        let artifact = renderer.render(id, new.width, new.height).await?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "UPDATE item_configurations SET artifact_path = $2 WHERE id = $1 \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(artifact.stored_path())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        artifact.publish()?;
        Ok(row.into())
    }

    async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM item_configurations ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>, CatalogError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM item_configurations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_item(
        &self,
        id: i64,
        changes: &ItemChanges,
        renderer: &dyn ArtifactRenderer,
    ) -> Result<Option<Item>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM item_configurations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current.map(Item::from) else {
            return Ok(None);
        };

        let mut updated = changes.apply(&current);
        // The previous file stays in place until the new size is committed.
        let artifact = if changes.resizes(&current) {
            let staged = renderer.render(id, updated.width, updated.height).await?;
            updated.artifact_path = Some(staged.stored_path());
            Some(staged)
        } else {
            None
        };

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "UPDATE item_configurations SET \
                 material_id = $2, product_type_id = $3, width = $4, height = $5, \
                 artifact_path = $6 \
             WHERE id = $1 \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(updated.material_id)
        .bind(updated.product_type_id)
        .bind(updated.width)
        .bind(updated.height)
        .bind(updated.artifact_path.as_deref())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        if let Some(artifact) = artifact {
            artifact.publish()?;
        }
        Ok(Some(row.into()))
    }

    async fn delete_item(&self, id: i64) -> Result<bool, CatalogError> {
        let result = sqlx::query("DELETE FROM item_configurations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
