//! PostgreSQL connection bootstrap.
//!
//! The database may still be starting when the server boots (e.g. under
//! docker compose), so the first connection is retried on a fixed delay.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Default number of connection attempts before giving up.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 16;

/// Default delay between connection attempts.
pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_secs(2);

/// Maximum time a single connection attempt may wait.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while bootstrapping the database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("PostgreSQL not reachable after {attempts} attempts: {last}")]
    Unreachable { attempts: u32, last: sqlx::Error },
}

/// Connection settings for the pool.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub max_connections: u32,
    pub attempts: u32,
    pub delay: Duration,
}

impl ConnectOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            attempts: DEFAULT_CONNECT_ATTEMPTS,
            delay: DEFAULT_CONNECT_DELAY,
        }
    }
}

/// Connect to PostgreSQL, retrying while the server is not yet reachable.
///
/// Only connection-level failures (I/O, TLS, pool timeouts) are retried; any
/// other error such as bad credentials fails immediately.
pub async fn connect_with_retry(options: &ConnectOptions) -> Result<PgPool, DbError> {
    let attempts = options.attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&options.url)
            .await;
        match result {
            Ok(pool) => {
                info!(attempt, "database connected");
                return Ok(pool);
            }
            Err(e) if is_transient(&e) => {
                if attempt >= attempts {
                    return Err(DbError::Unreachable { attempts, last: e });
                }
                warn!(attempt, attempts, "database is still waking up: {e}");
                sleep(options.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(DbError::Sql(e)),
        }
    }
}

/// Connect with retry and run embedded migrations.
pub async fn connect_and_migrate(options: &ConnectOptions) -> Result<PgPool, DbError> {
    let pool = connect_with_retry(options).await?;
    info!("running database migrations");
    crate::migrate::migrate(&pool).await?;
    Ok(pool)
}

fn is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_bootstrap_policy() {
        let options = ConnectOptions::new("postgres://localhost/rueckwand");
        assert_eq!(options.attempts, 16);
        assert_eq!(options.delay, Duration::from_secs(2));
    }

    #[test]
    fn only_connection_failures_are_transient() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused"
        ))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
