//! # Schema Migrations
//!
//! The schema lives in `migrations/sqlite/` at the workspace root and is
//! compiled into the binary, so the server and the seed tool always open a
//! database at the schema they were built for.
//!
//! ```text
//! Database::new ──► run_migrations ──► applied_count (before)
//!                                  ──► MIGRATOR.run   (pending files, in order)
//!                                  ──► applied_count (after)
//! ```
//!
//! Files are named `NNN_description.sql`. A file that has been applied is
//! never edited; schema changes go into a new file.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration and returns how many ran.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<usize> {
    // A fresh file has no bookkeeping table yet.
    let before = applied_count(pool).await.unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let after = applied_count(pool).await?;
    let ran = after.saturating_sub(before);
    info!(ran, applied = after, embedded = embedded_count(), "Schema up to date");
    Ok(ran)
}

/// Number of migrations recorded in `_sqlx_migrations`.
pub async fn applied_count(pool: &SqlitePool) -> DbResult<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Number of migrations embedded in this build.
pub fn embedded_count() -> usize {
    MIGRATOR.migrations.len()
}
