//! # caisse-core: Pure Business Logic for the Event Point-of-Sale
//!
//! Everything with behavioural subtlety lives here: how a cart becomes a
//! sale, how inclusive prices are split into exclusive amount and tax, and
//! which preconditions a checkout must pass. Storage is reached only through
//! the [`store`] traits, so the whole crate runs in tests without a database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caisse Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (browser)                           │   │
//! │  │     Cashier ──► Admin ──► History / Export                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caisse-server (axum)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caisse-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌───────┐  │   │
//! │  │   │ money   │ │ totals  │ │  cart   │ │ selection │ │checkout│ │   │
//! │  │   │ round2  │ │ lines   │ │ entries │ │  scope    │ │ gate   │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └───────────┘ └───────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐            │   │
//! │  │   │ history │ │   kpi   │ │ export  │ │validation │            │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └───────────┘            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │ SaleStore / CatalogSource              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caisse-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Event, PointOfSale, Sale, ...)
//! - [`money`] - Rounding and inclusive/exclusive tax arithmetic
//! - [`totals`] - Line item construction and sale totals
//! - [`cart`] - In-memory cart of product quantities
//! - [`selection`] - Active event / point-of-sale scope and catalog cache
//! - [`session`] - The cashier session bundling cart, scope and cache
//! - [`checkout`] - Single-flight checkout workflow
//! - [`history`] - Editing persisted sales
//! - [`kpi`] - Revenue summaries for reports
//! - [`export`] - CSV export of sale lines
//! - [`store`] - Persistence traits implemented by the database crate
//! - [`validation`] - Input validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use caisse_core::money::{exclusive_of, round2};
//! use rust_decimal::Decimal;
//!
//! let inclusive = Decimal::new(6000, 2); // 60.00
//! let rate = Decimal::new(81, 1); // 8.1 %
//!
//! let exclusive = round2(exclusive_of(inclusive, rate));
//! assert_eq!(exclusive, Decimal::new(5550, 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod export;
pub mod history;
pub mod kpi;
pub mod money;
pub mod selection;
pub mod session;
pub mod store;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::Cart;
pub use checkout::{CheckoutGate, CheckoutOptions, CheckoutPhase, CheckoutReceipt};
pub use error::{CheckoutError, CoreError, CoreResult, SelectionError, StoreError, ValidationError};
pub use selection::{CatalogCache, Scope, Selection};
pub use session::PosSession;
pub use store::{CatalogSource, SaleStore};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps a ticket printable on one receipt.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in the cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest tax-inclusive unit price a product or sale line may carry
/// (1 000 000.00).
///
/// ## Business Reason
/// Keeps every line and sale total far inside `Decimal` range, even at
/// MAX_ITEM_QUANTITY on MAX_CART_ITEMS lines.
pub const MAX_UNIT_PRICE: rust_decimal::Decimal =
    rust_decimal::Decimal::from_parts(100_000_000, 0, 0, false, 2);

/// Currency used when nothing else is configured.
pub const DEFAULT_CURRENCY: &str = "CHF";
