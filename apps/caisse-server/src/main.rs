//! # Caisse Server
//!
//! Serves the point-of-sale API on a local SQLite database.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. init_tracing()            RUST_LOG or "info,caisse=debug"           │
//! │  2. ConfigState::from_env()   CAISSE_BIND_ADDR, CAISSE_DB_PATH…         │
//! │  3. Database::new()           pool + embedded migrations                │
//! │  4. SessionState::restore()   last (event, point-of-sale) selection     │
//! │  5. axum::serve()             until Ctrl+C / SIGTERM                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use caisse_db::{Database, DbConfig};
use caisse_server::state::{AppState, ConfigState, DbState, SessionState};
use caisse_server::{build_router, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("Starting Caisse server...");

    let config = ConfigState::from_env()?;
    let db_path = config.resolve_database_path()?;
    info!(
        bind_addr = %config.bind_addr,
        database = %db_path.display(),
        missing_product_policy = %config.missing_product_policy,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(db_path)).await?;
    info!("Database initialized");

    let session = SessionState::restore(&db).await?;

    let state = AppState {
        db: DbState::new(db.clone()),
        session,
        config: Arc::new(config.clone()),
    };

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
