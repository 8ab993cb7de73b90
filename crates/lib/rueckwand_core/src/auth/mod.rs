//! Authentication and session logic.
//!
//! Provides password hashing, token minting and verification, the
//! configuration they share, and the [`Authenticator`] that ties them to the
//! credential store and session ledger.

pub mod authenticator;
pub mod config;
pub mod jwt;
pub mod password;

pub use authenticator::Authenticator;
pub use config::AuthConfig;
pub use jwt::TokenCodec;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Submitted username is not a valid email")]
    InvalidCredentialsFormat,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
