//! API server configuration.

use rueckwand_core::artifact::ArtifactConfig;
use rueckwand_core::auth::{AuthConfig, AuthError};
use rueckwand_core::db::ConnectOptions;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Token signing and lifetime settings.
    pub auth: AuthConfig,
    /// Source image and output directory for item artifacts.
    pub artifacts: ArtifactConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                      | Default                              |
    /// |-------------------------------|--------------------------------------|
    /// | `BIND_ADDR`                   | `127.0.0.1:8000`                     |
    /// | `DATABASE_URL`                | `postgres://localhost:5432/rueckwand`|
    /// | `SECRET_KEY` / `JWT_SECRET`   | generated & persisted to file        |
    /// | `JWT_ALGORITHM`               | `HS256`                              |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES` | `30`                                 |
    ///
    /// Artifact variables are listed on [`ArtifactConfig::from_env`].
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/rueckwand".into()),
            auth: AuthConfig::from_env()?,
            artifacts: ArtifactConfig::from_env(),
        })
    }

    /// Pool settings for `database_url`, with default retry behaviour.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(self.database_url.clone())
    }
}
