//! # Totals
//!
//! Turns products and quantities into line items, and line items into the
//! three sale totals.
//!
//! ```text
//!  Product{price 20.00, rate 8.1} × 3
//!            │
//!            ▼  build_line_item
//!  SaleLineItem{subtotal = round2(20.00 × 3) = 60.00}
//!            │
//!            ▼  compute_totals
//!  inclusive = round2(Σ subtotal)                 = 60.00
//!  exclusive = round2(Σ subtotal / (1 + rate/100)) = 55.50
//!  tax       = round2(inclusive − exclusive)       =  4.50
//! ```
//!
//! The exclusive sum is rounded once at the end, not per line. Everything
//! here is pure and deterministic apart from the fresh line id.
//!
//! Multiplication and sums are checked: an amount outside `Decimal` range
//! is reported as [`CoreError::AmountOverflow`] and never panics.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::{exclusive_of, round2};
use crate::types::{Product, SaleLineItem, SaleTotals};

/// Builds a line for `quantity` units of `product`, snapshotting its
/// current price and tax rate.
pub fn build_line_item(sale_id: &str, product: &Product, quantity: i64) -> CoreResult<SaleLineItem> {
    build_line_from_snapshot(
        sale_id,
        &product.id,
        quantity,
        product.unit_price_inclusive_tax,
        product.tax_rate_percent,
    )
}

/// Builds a line from an explicit price and rate, e.g. when replacing the
/// lines of a persisted sale or accepting a client payload.
pub fn build_line_from_snapshot(
    sale_id: &str,
    product_id: &str,
    quantity: i64,
    unit_price_inclusive_tax: Decimal,
    tax_rate_percent: Decimal,
) -> CoreResult<SaleLineItem> {
    let subtotal = unit_price_inclusive_tax
        .checked_mul(Decimal::from(quantity))
        .ok_or(CoreError::AmountOverflow("line subtotal"))?;

    Ok(SaleLineItem {
        id: Uuid::new_v4().to_string(),
        sale_id: sale_id.to_string(),
        product_id: product_id.to_string(),
        quantity,
        unit_price_inclusive_tax,
        line_subtotal_inclusive_tax: round2(subtotal),
        tax_rate_percent,
    })
}

/// Aggregates line items into sale totals.
///
/// An empty slice yields all-zero totals.
pub fn compute_totals(lines: &[SaleLineItem]) -> CoreResult<SaleTotals> {
    let (inclusive, exclusive) = lines.iter().try_fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(inclusive, exclusive), line| {
            let subtotal = line.line_subtotal_inclusive_tax;
            Some((
                inclusive.checked_add(subtotal)?,
                exclusive.checked_add(exclusive_of(subtotal, line.tax_rate_percent))?,
            ))
        },
    )
    .ok_or(CoreError::AmountOverflow("sale totals"))?;

    let total_inclusive_tax = round2(inclusive);
    let total_exclusive_tax = round2(exclusive);
    let tax = total_inclusive_tax
        .checked_sub(total_exclusive_tax)
        .ok_or(CoreError::AmountOverflow("sale totals"))?;

    Ok(SaleTotals {
        total_inclusive_tax,
        total_exclusive_tax,
        total_tax_amount: round2(tax),
    })
}

/// Per-rate breakdown used on receipts: `(rate, inclusive, tax)` rows sorted
/// by rate.
pub fn tax_breakdown(lines: &[SaleLineItem]) -> Vec<(Decimal, Decimal, Decimal)> {
    let mut by_rate: std::collections::BTreeMap<Decimal, Decimal> = Default::default();
    for line in lines {
        let sum = by_rate.entry(line.tax_rate_percent.normalize()).or_default();
        *sum = sum.saturating_add(line.line_subtotal_inclusive_tax);
    }

    by_rate
        .into_iter()
        .map(|(rate, inclusive)| {
            let exclusive = round2(exclusive_of(inclusive, rate));
            (rate, round2(inclusive), round2(inclusive - exclusive))
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
