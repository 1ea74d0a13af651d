//! # Repository Module
//!
//! Database repository implementations for Caisse.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │  db.sales().list(Some(event_id), None)                          │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── insert / replace / delete   (one transaction each)                │
//! │  └── get_by_id / list                                                  │
//! │       │  SQL + row structs                                              │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as::<_, Row>`) and mapped
//! through `*Row` structs, because money is stored as TEXT and parsed into
//! `Decimal` on the way out.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD and scoped listing
//! - [`event::EventRepository`] - Events and archiving
//! - [`point_of_sale::PointOfSaleRepository`] - Stands within events
//! - [`sale::SaleRepository`] - Sales with their lines
//! - [`settings::SettingsRepository`] - Durable key-value settings

pub mod event;
pub mod point_of_sale;
pub mod product;
pub mod sale;
pub mod settings;

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

/// Parses a TEXT money/rate column.
pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|_| DbError::corrupt(column, value))
}
