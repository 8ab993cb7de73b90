//! Login, per-request identity resolution, logout and session management.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use validator::ValidateEmail;

use super::jwt::generate_token_id;
use super::password::verify_password;
use super::{AuthConfig, AuthError, TokenCodec};
use crate::models::auth::{IssuedToken, Session, User};
use crate::store::{CredentialStore, SessionLedger, Store};

/// Session inserts attempted per login before a token id collision is fatal.
const SESSION_INSERT_ATTEMPTS: usize = 2;

/// Binds bearer tokens to server-side sessions.
///
/// Cheap to clone; every clone shares the same stores.
#[derive(Clone)]
pub struct Authenticator {
    config: AuthConfig,
    codec: TokenCodec,
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionLedger>,
}

impl Authenticator {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionLedger>,
    ) -> Self {
        Self {
            codec: TokenCodec::new(&config),
            config,
            users,
            sessions,
        }
    }

    /// Authenticator over the user and session handles of `store`.
    pub fn from_store(config: AuthConfig, store: &Store) -> Self {
        Self::new(config, store.users.clone(), store.sessions.clone())
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify credentials and issue a token bound to a fresh session.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    /// Existing sessions of the user are left alone.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        if !username.validate_email() {
            return Err(AuthError::InvalidCredentialsFormat);
        }

        let Some(stored) = self.users.find_by_email(username).await? else {
            debug!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &stored.password_hash)? {
            debug!(user_id = stored.user.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let user_id = stored.user.id;
        let mut attempt = 1;
        loop {
            let token_id = generate_token_id();
            let (access_token, expires_at) =
                self.codec
                    .mint(user_id, &token_id, self.config.access_token_ttl())?;
            match self.sessions.create(user_id, &token_id, expires_at).await {
                Ok(session) => {
                    info!(user_id, session_id = session.id, "user logged in");
                    return Ok(IssuedToken {
                        access_token,
                        session,
                    });
                }
                Err(AuthError::Conflict(_)) if attempt < SESSION_INSERT_ATTEMPTS => {
                    warn!(user_id, attempt, "token id collision, retrying with a new id");
                    attempt += 1;
                }
                Err(AuthError::Conflict(msg)) => {
                    return Err(AuthError::Internal(format!(
                        "token id collision persisted after {attempt} attempts: {msg}"
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve the user behind a bearer token.
    ///
    /// Signature and expiry are checked before any store access. A missing,
    /// revoked or expired session, or a deleted user, is `InvalidToken`.
    pub async fn resolve(&self, token: Option<&str>) -> Result<User, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        let decoded = self.codec.decode(token)?;

        let session = self
            .sessions
            .find_by_token_id(&decoded.token_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !session.is_usable_at(Utc::now()) || session.user_id != decoded.subject {
            debug!(session_id = session.id, "token rejected: session not usable");
            return Err(AuthError::InvalidToken);
        }

        self.users
            .find_by_id(decoded.subject)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Revoke the session behind `token`.
    ///
    /// `SessionNotFound` when the session is gone or already revoked, so a
    /// second logout with the same token is distinguishable from a bad token.
    pub async fn logout(&self, token: &str) -> Result<Session, AuthError> {
        let decoded = self.codec.decode(token)?;
        match self.sessions.find_by_token_id(&decoded.token_id).await? {
            Some(session) if !session.state.is_revoked() => {}
            _ => return Err(AuthError::SessionNotFound),
        }
        let session = self
            .sessions
            .revoke(&decoded.token_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        info!(user_id = session.user_id, session_id = session.id, "user logged out");
        Ok(session)
    }

    /// Sessions owned by `user`.
    pub async fn list_sessions(&self, user: &User) -> Result<Vec<Session>, AuthError> {
        self.sessions.list_for_user(user.id).await
    }

    /// A session owned by `user`. Foreign and missing ids are both `NotFound`.
    pub async fn get_session(&self, user: &User, session_id: i64) -> Result<Session, AuthError> {
        match self.sessions.find_by_id(session_id).await? {
            Some(session) if session.user_id == user.id => Ok(session),
            _ => Err(AuthError::NotFound("Session not found".into())),
        }
    }

    /// Revoke, then remove, a session owned by `user`.
    pub async fn delete_session(&self, user: &User, session_id: i64) -> Result<(), AuthError> {
        let session = self.get_session(user, session_id).await?;
        self.sessions.revoke(&session.token_id).await?;
        self.sessions.delete(&session).await?;
        info!(user_id = user.id, session_id, "session deleted");
        Ok(())
    }
}
