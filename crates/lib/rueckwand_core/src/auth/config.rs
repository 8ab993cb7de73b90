//! Token signing configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{info, warn};

use super::AuthError;

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// Longest accepted access token lifetime (one year).
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 365 * 24 * 60;

/// Default signing algorithm name.
pub const DEFAULT_ALGORITHM: &str = "HS256";

/// Immutable signing configuration shared by [`super::TokenCodec`] and
/// [`super::Authenticator`].
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    algorithm: Algorithm,
    access_token_ttl: Duration,
}

impl AuthConfig {
    /// Build a configuration from explicit values.
    ///
    /// Only the HMAC family is accepted since the secret is shared, and the
    /// lifetime must be positive and at most
    /// [`MAX_ACCESS_TOKEN_EXPIRE_MINUTES`].
    pub fn new(
        secret: impl Into<String>,
        algorithm: Algorithm,
        access_token_ttl: Duration,
    ) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::ValidationError(
                "signing secret must not be empty".into(),
            ));
        }
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::ValidationError(format!(
                "unsupported signing algorithm {algorithm:?}; expected HS256, HS384 or HS512"
            )));
        }
        if access_token_ttl <= Duration::zero() {
            return Err(AuthError::ValidationError(
                "access token lifetime must be positive".into(),
            ));
        }
        if access_token_ttl > Duration::minutes(MAX_ACCESS_TOKEN_EXPIRE_MINUTES) {
            return Err(AuthError::ValidationError(format!(
                "access token lifetime must not exceed {MAX_ACCESS_TOKEN_EXPIRE_MINUTES} minutes"
            )));
        }
        Ok(Self {
            secret,
            algorithm,
            access_token_ttl,
        })
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                      | Default                            |
    /// |-------------------------------|------------------------------------|
    /// | `SECRET_KEY` / `JWT_SECRET`   | generated & persisted to file      |
    /// | `JWT_ALGORITHM`               | `HS256`                            |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES` | `30`                               |
    pub fn from_env() -> Result<Self, AuthError> {
        let algorithm = parse_algorithm(
            &std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| DEFAULT_ALGORITHM.into()),
        )?;
        let ttl = match std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Ok(raw) => parse_ttl_minutes(&raw)?,
            Err(_) => Duration::minutes(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES),
        };
        Self::new(resolve_secret(), algorithm, ttl)
    }

    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .finish()
    }
}

/// Parse a lifetime given in whole minutes, e.g. `ACCESS_TOKEN_EXPIRE_MINUTES`.
pub fn parse_ttl_minutes(raw: &str) -> Result<Duration, AuthError> {
    let minutes = raw.trim().parse::<i64>().map_err(|e| {
        AuthError::ValidationError(format!("ACCESS_TOKEN_EXPIRE_MINUTES={raw:?}: {e}"))
    })?;
    Duration::try_minutes(minutes).ok_or_else(|| {
        AuthError::ValidationError(format!(
            "ACCESS_TOKEN_EXPIRE_MINUTES={raw:?}: out of range"
        ))
    })
}

/// Parse a JWT algorithm name such as `HS256`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    Algorithm::from_str(name.trim())
        .map_err(|_| AuthError::ValidationError(format!("unknown signing algorithm {name:?}")))
}

/// Resolve the signing secret: env var `SECRET_KEY` → `JWT_SECRET` → persisted file.
pub fn resolve_secret() -> String {
    for var in ["SECRET_KEY", "JWT_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    // Generate and persist
    let secret_path = secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(&secret_path, &secret) {
        Ok(()) => info!(path = %secret_path.display(), "generated new signing secret"),
        Err(e) => warn!(
            path = %secret_path.display(),
            "could not persist signing secret, tokens will not survive a restart: {e}"
        ),
    }
    secret
}

/// Path to the persisted signing secret file.
fn secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rueckwand")
        .join("jwt-secret")
}
