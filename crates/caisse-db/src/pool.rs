//! # Connection Pool
//!
//! Opens the SQLite file behind [`Database`] and hands out repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caisse-server handlers                                                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Database (Clone, cheap) ──► products() / events() / points_of_sale()   │
//! │        │                     sales() / settings()                       │
//! │        ▼                                                                │
//! │  SqlitePool (WAL, foreign keys on, busy timeout)                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  caisse.db                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A file database runs in WAL mode so the history screen can read while a
//! checkout writes. When a writer holds the lock, other writers wait up to
//! `busy_timeout` instead of failing with `SQLITE_BUSY`.
//!
//! `:memory:` gives every connection its own empty database, so the
//! in-memory configuration keeps exactly one connection alive for the life
//! of the pool.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::event::EventRepository;
use crate::repository::point_of_sale::PointOfSaleRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::settings::SettingsRepository;

const MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new(data_dir.join("caisse.db")).max_connections(4);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default: 5. One cashier plus the admin and history screens rarely
    /// need more.
    pub max_connections: u32,

    /// How long a query waits for another connection's write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// How long a handler waits for a free connection.
    /// Default: 10 seconds
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// File database at `path`, created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
        }
    }

    /// Private in-memory database, for tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            ..DbConfig::new(MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            .foreign_keys(true))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            // Losing the only connection would lose the database.
            options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options
                .min_connections(1)
                .idle_timeout(Some(Duration::from_secs(600)))
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle plus repository accessors.
///
/// Cloning shares the pool, so handlers receive their own copy through axum
/// state.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let pool = config
            .pool_options()
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn events(&self) -> EventRepository {
        EventRepository::new(self.pool.clone())
    }

    pub fn points_of_sale(&self) -> PointOfSaleRepository {
        PointOfSaleRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// `true` when a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let applied = migrations::applied_count(db.pool()).await.unwrap();
        assert_eq!(applied, migrations::embedded_count());
    }

    #[tokio::test]
    async fn test_in_memory_data_survives_across_queries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set("k", "v").await.unwrap();
        assert_eq!(db.settings().get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/caisse-test.db")
            .max_connections(0)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_file_database_reopens_without_rerunning_migrations() {
        let path = std::env::temp_dir().join(format!("caisse-{}.db", uuid::Uuid::new_v4()));

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.close().await;
        assert!(path.exists());

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let ran = migrations::run_migrations(db.pool()).await.unwrap();
        assert_eq!(ran, 0);
        db.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
