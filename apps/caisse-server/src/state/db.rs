//! # Database State
//!
//! The shared [`Database`] as axum sees it. Every handler that touches
//! SQLite extracts `State<DbState>`; the pool inside handles concurrent
//! queries, so no lock sits around it.
//!
//! ```rust,ignore
//! async fn get_event(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Event>> {
//!     let event = db.inner().events().get_by_id(&id).await?;
//!     ...
//! }
//! ```

use caisse_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}

impl From<Database> for DbState {
    fn from(db: Database) -> Self {
        DbState::new(db)
    }
}
