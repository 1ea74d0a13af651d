//! # caisse-db: Database Layer for Caisse
//!
//! SQLite persistence for events, points-of-sale, products, sales and
//! settings, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caisse Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /api/session/checkout)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  caisse_core::checkout::checkout(.., &db, &db, ..)                      │
//! │       │  CatalogSource / SaleStore                                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     caisse-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ Product, Event │   │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │    │ PointOfSale    │   │ 001_init.sql │   │   │
//! │  │   │               │    │ Sale, Settings │   │              │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (caisse.db)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`store`] - `CatalogSource` / `SaleStore` for [`Database`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caisse_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("caisse.db")).await?;
//! let products = db.products().list_for_scope(Some("e1"), Some("s1")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::event::EventRepository;
pub use repository::point_of_sale::PointOfSaleRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::settings::{
    SettingsRepository, SELECTED_EVENT_KEY, SELECTED_POINT_OF_SALE_KEY,
};
