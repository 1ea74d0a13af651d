//! # Money Module
//!
//! Rounding and tax-inclusive arithmetic for every monetary value in the
//! system.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    1.005 * 100 = 100.49999999999999  ❌ rounds to 1.00                  │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal                                             │
//! │    1.005 is stored exactly, round2(1.005) = 1.01                        │
//! │    Prices, rates and totals are base-10 all the way down               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Inclusive vs Exclusive
//! Shelf prices already include tax. The exclusive amount is recovered by
//! dividing by the tax factor, and the tax is whatever is left over:
//!
//! ```text
//!   inclusive = 60.00, rate = 8.1 %
//!   factor    = 1 + 8.1 / 100 = 1.081
//!   exclusive = round2(60.00 / 1.081) = 55.50
//!   tax       = round2(60.00 - 55.50) = 4.50
//! ```

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{CoreError, CoreResult};

/// Number of decimal places every monetary output carries.
pub const MONEY_SCALE: u32 = 2;

/// Rounds to two decimal places, midpoint away from zero.
///
/// Idempotent: `round2(round2(x)) == round2(x)`.
///
/// ## Example
/// ```rust
/// use caisse_core::money::round2;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round2(Decimal::new(1005, 3)), Decimal::new(101, 2)); // 1.005 -> 1.01
/// assert_eq!(round2(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
/// ```
#[inline]
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `1 + rate / 100`.
#[inline]
pub fn tax_factor(tax_rate_percent: Decimal) -> Decimal {
    Decimal::ONE + tax_rate_percent / Decimal::ONE_HUNDRED
}

/// Exclusive-of-tax amount for an inclusive amount, unrounded.
///
/// A rate of -100 % or lower has no meaningful factor, and a factor close to
/// zero can push the quotient out of range. The inclusive amount is
/// returned unchanged in those cases and a warning is logged; use
/// [`try_exclusive_of`] where the caller wants the failure instead.
pub fn exclusive_of(inclusive_amount: Decimal, tax_rate_percent: Decimal) -> Decimal {
    match try_exclusive_of(inclusive_amount, tax_rate_percent) {
        Ok(exclusive) => exclusive,
        Err(err) => {
            tracing::warn!(
                rate = %tax_rate_percent,
                amount = %inclusive_amount,
                error = %err,
                "no usable tax factor, treating amount as exclusive"
            );
            inclusive_amount
        }
    }
}

/// Strict variant of [`exclusive_of`].
pub fn try_exclusive_of(inclusive_amount: Decimal, tax_rate_percent: Decimal) -> CoreResult<Decimal> {
    let factor = tax_factor(tax_rate_percent);
    if factor <= Decimal::ZERO {
        return Err(CoreError::InvalidTaxRate {
            rate: tax_rate_percent,
        });
    }
    inclusive_amount
        .checked_div(factor)
        .ok_or(CoreError::AmountOverflow("exclusive amount"))
}

/// Tax portion of an inclusive amount, rounded.
pub fn tax_portion(inclusive_amount: Decimal, tax_rate_percent: Decimal) -> Decimal {
    round2(inclusive_amount - round2(exclusive_of(inclusive_amount, tax_rate_percent)))
}

/// Formats an amount for receipts and reports: `"CHF 12.50"`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    format!("{} {:.2}", currency, round2(amount))
}

/// Fixed two-decimal rendering without currency, as used in exports.
pub fn format_plain(amount: Decimal) -> String {
    format!("{:.2}", round2(amount))
}

// =============================================================================
// Unit Tests
// =============================================================================
