//! # Validation Module
//!
//! Input validation for admin forms and REST payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend form                                                │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler                                                 │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation + tax normalization         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caisse_core::validation::{normalize_tax_rate, validate_sku, validate_quantity};
//! use rust_decimal::Decimal;
//!
//! validate_sku("TSHIRT-BLACK").unwrap();
//! validate_quantity(5).unwrap();
//! assert_eq!(normalize_tax_rate(Decimal::new(81, 3)).unwrap(), Decimal::new(81, 1));
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::TaxRate;
use crate::{MAX_ITEM_QUANTITY, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted display name for products, events and points-of-sale.
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use caisse_core::validation::validate_sku;
///
/// assert!(validate_sku("POSTER-A3").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates that an identifier reference is present.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: "1".to_string(),
            max: MAX_ITEM_QUANTITY.to_string(),
        });
    }

    Ok(())
}

/// Validates a tax-inclusive unit price.
///
/// ## Rules
/// - Zero is allowed (free items), negatives are not
/// - Must not exceed MAX_UNIT_PRICE (1 000 000.00)
pub fn validate_price(field: &str, price: Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    if price > MAX_UNIT_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: MAX_UNIT_PRICE.to_string(),
        });
    }

    Ok(())
}

/// Normalizes an entered tax rate to a percentage and checks its range.
///
/// ## Rules
/// - `≤ 1` is a fraction and is scaled by 100 (see [`TaxRate::normalize`])
/// - The resulting percentage must lie within 0 to 100
///
/// ## User Workflow
/// ```text
/// Admin types "0.081"  ──► normalize ──► 8.1  ──► range check ──► stored 8.1
/// Admin types "8.1"    ──► normalize ──► 8.1  ──► range check ──► stored 8.1
/// Admin types "-5"     ──► normalize ──► -500 ──► OutOfRange
/// ```
pub fn normalize_tax_rate(entered: Decimal) -> ValidationResult<Decimal> {
    let percent = TaxRate::normalize(entered).percent();

    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "taxRatePercent".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }

    Ok(percent)
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that an event does not end before it starts.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if end < start {
        return Err(ValidationError::InvalidFormat {
            field: "endDate".to_string(),
            reason: "must not be before startDate".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("TSHIRT-BLACK").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("name", "  Tote Bag ").unwrap(), "Tote Bag");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("price", dec!(0)).is_ok());
        assert!(validate_price("price", dec!(25.00)).is_ok());
        assert!(validate_price("price", dec!(-0.01)).is_err());
        assert!(validate_price("price", dec!(1000000.00)).is_ok());
        assert!(validate_price("price", dec!(1000000.01)).is_err());
        assert!(validate_price("price", Decimal::MAX).is_err());
    }

    #[test]
    fn test_normalize_tax_rate() {
        assert_eq!(normalize_tax_rate(dec!(0.077)).unwrap(), dec!(7.7));
        assert_eq!(normalize_tax_rate(dec!(7.7)).unwrap(), dec!(7.7));
        assert_eq!(normalize_tax_rate(dec!(0)).unwrap(), dec!(0));
        assert!(normalize_tax_rate(dec!(-5)).is_err());
        assert!(normalize_tax_rate(dec!(150)).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert!(validate_date_range(d("2026-07-01"), d("2026-07-03")).is_ok());
        assert!(validate_date_range(d("2026-07-01"), d("2026-07-01")).is_ok());
        assert!(validate_date_range(d("2026-07-03"), d("2026-07-01")).is_err());
    }
}
