//! # Error Types
//!
//! Domain-specific error types for caisse-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caisse-core errors (this file)                                        │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── SelectionError   - Scope changes needing confirmation             │
//! │  ├── CheckoutError    - Checkout preconditions and failures            │
//! │  └── StoreError       - What a SaleStore / CatalogSource reports       │
//! │                                                                         │
//! │  caisse-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  caisse-server errors                                                  │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in the catalog
    /// - Product was deactivated (soft delete)
    /// - Product is not sellable at the selected point-of-sale
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A tax rate whose factor `1 + rate/100` is zero or negative.
    ///
    /// ## When This Occurs
    /// - A rate of -100 % or lower made it into stored data
    #[error("Invalid tax rate {rate}%: the tax factor must be positive")]
    InvalidTaxRate { rate: Decimal },

    /// A line or total left the representable decimal range.
    ///
    /// ## When This Occurs
    /// - A unit price stored before the price ceiling existed, multiplied
    ///   by a large quantity
    #[error("Amount out of range while computing {0}")]
    AmountOverflow(&'static str),

    /// A sale must keep at least one line.
    #[error("Sale {sale_id} must contain at least one line")]
    EmptySale { sale_id: String },

    /// Cart has exceeded maximum allowed distinct products.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Several fields failed at once (REST payload checks report them together).
    #[error("Invalid fields: {}", fields.join(", "))]
    InvalidFields { fields: Vec<String> },
}

impl ValidationError {
    /// Name of the offending field(s), for API error payloads.
    pub fn fields(&self) -> Vec<String> {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. } => vec![field.clone()],
            ValidationError::InvalidFields { fields } => fields.clone(),
        }
    }
}

// =============================================================================
// Selection Error
// =============================================================================

/// Scope changes that cannot be applied as requested.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// Switching point-of-sale would throw away a non-empty cart.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart {A:2}  ──►  select stand B
    ///                     │
    ///                     ▼
    ///        ConfirmationRequired (nothing changed)
    ///                     │
    ///          user confirms, retry with confirm=true
    ///                     │
    ///                     ▼
    ///          stand B selected, cart emptied
    /// ```
    #[error("Changing point-of-sale will empty the cart ({cart_items} item(s)); confirmation required")]
    ConfirmationRequired { cart_items: usize },
}

// =============================================================================
// Store Error
// =============================================================================

/// Failure reported by a persistence backend behind the core traits.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Why a checkout did not produce a sale.
///
/// Preconditions are reported in a fixed order: event, point-of-sale, cart.
/// Every variant leaves the cart exactly as it was.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("No event selected")]
    NoEventSelected,

    #[error("No point-of-sale selected")]
    NoPointOfSaleSelected,

    #[error("Cart is empty")]
    EmptyCart,

    /// Cart references products missing from the scoped catalog.
    #[error("Product(s) not found: {}", product_ids.join(", "))]
    ProductNotFound { product_ids: Vec<String> },

    /// The product catalog could not be loaded for the selected scope.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A line or the sale total left the representable range.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// The sale could not be stored; the cart is preserved for a retry.
    #[error("Failed to save sale: {0}")]
    PersistenceFailed(String),

    /// Another checkout is still validating or persisting.
    #[error("A checkout is already in progress")]
    CheckoutInProgress,
}

impl CheckoutError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::NoEventSelected => "NO_EVENT_SELECTED",
            CheckoutError::NoPointOfSaleSelected => "NO_POINT_OF_SALE_SELECTED",
            CheckoutError::EmptyCart => "EMPTY_CART",
            CheckoutError::ProductNotFound { .. } => "PRODUCT_NOT_FOUND",
            CheckoutError::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
            CheckoutError::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            CheckoutError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            CheckoutError::CheckoutInProgress => "CHECKOUT_IN_PROGRESS",
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
