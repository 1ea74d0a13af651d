//! # State Module
//!
//! Application state shared by the HTTP handlers.
//!
//! ## Multiple State Types
//! Instead of handlers receiving one big struct, each handler extracts only
//! the piece it needs. `AppState` holds all three and implements `FromRef`
//! for each, so `State<DbState>` works next to `State<SessionState>`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  Router::with_state(AppState)                                           │
//! │                              │                                          │
//! │          ┌──────────────────┼──────────────────┐                       │
//! │          ▼                  ▼                  ▼                        │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐          │
//! │  │   DbState    │  │   SessionState   │  │   ConfigState    │          │
//! │  │              │  │                  │  │                  │          │
//! │  │  Database    │  │  Arc<Mutex<      │  │  bind address    │          │
//! │  │  (SQLite     │  │   PosSession>>   │  │  checkout opts   │          │
//! │  │   pool)      │  │  CheckoutGate    │  │  currency        │          │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • SessionState: Mutex never held across an await, atomic gate         │
//! │  • ConfigState: Read-only after initialization                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod session;

use std::sync::Arc;

use axum::extract::FromRef;

pub use config::{ConfigError, ConfigState, PublicConfig};
pub use db::DbState;
pub use session::SessionState;

/// Everything the router hands out to handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DbState,
    pub session: SessionState,
    pub config: Arc<ConfigState>,
}

impl FromRef<AppState> for DbState {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(state: &AppState) -> Self {
        state.session.clone()
    }
}

impl FromRef<AppState> for Arc<ConfigState> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
