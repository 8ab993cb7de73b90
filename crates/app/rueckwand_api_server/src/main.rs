//! Rueckwand API server binary.
//!
//! Connects to PostgreSQL (retrying while it starts up), runs migrations and
//! serves the REST API until Ctrl-C.

use std::time::Duration;

use clap::Parser;
use rueckwand_api::{AppState, config::ApiConfig};
use rueckwand_core::db::{self, ConnectOptions};
use rueckwand_core::store::Store;
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "info,rueckwand_api=debug,rueckwand_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "rueckwand_api_server", about = "Rueckwand API server")]
struct Args {
    /// Port to listen on on 127.0.0.1. Overrides `BIND_ADDR` when given.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL. Overrides `DATABASE_URL` when given.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Connection attempts before giving up on the database.
    #[arg(long, env = "DB_CONNECT_ATTEMPTS", default_value_t = db::DEFAULT_CONNECT_ATTEMPTS)]
    db_connect_attempts: u32,

    /// Seconds to wait between connection attempts.
    #[arg(long, env = "DB_CONNECT_DELAY_SECS", default_value_t = 2)]
    db_connect_delay_secs: u64,

    /// Keep all data in memory instead of PostgreSQL. Lost on exit.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(port) = args.port {
        config.bind_addr = format!("127.0.0.1:{port}");
    }
    info!(bind_addr = %config.bind_addr, auth = ?config.auth, "starting rueckwand_api_server");

    let store = if args.in_memory {
        warn!("in-memory mode: data is not persisted");
        Store::memory()
    } else {
        let options = ConnectOptions {
            max_connections: args.max_connections,
            attempts: args.db_connect_attempts,
            delay: Duration::from_secs(args.db_connect_delay_secs),
            ..config.connect_options()
        };
        info!(
            max_connections = options.max_connections,
            attempts = options.attempts,
            "connecting to database"
        );
        Store::postgres(db::connect_and_migrate(&options).await?)
    };

    let app = rueckwand_api::router(AppState::new(store, config.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
