//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API's request and
//! response bodies (which use camelCase on the wire).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// Field changes applied to a stored user. `None` leaves a field untouched.
///
/// `password_hash` must already be hashed.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

/// Revocation state of a token session. Only ever moves `Active -> Revoked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Revoked,
}

impl SessionState {
    /// Maps the persisted `is_revoked` column.
    pub fn from_revoked(is_revoked: bool) -> Self {
        if is_revoked {
            SessionState::Revoked
        } else {
            SessionState::Active
        }
    }

    pub fn is_revoked(self) -> bool {
        self == SessionState::Revoked
    }
}

/// Server-side record of one issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    /// Token identifier (`jti` claim).
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the stored expiry has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session may still authenticate requests at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_revoked() && !self.is_expired_at(now)
    }
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID, stringified (standard JWT `sub` claim).
    pub sub: String,
    /// Token identifier joining the token to its session row.
    pub jti: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Verified contents of an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub subject: i64,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub session: Session,
}
