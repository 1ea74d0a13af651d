//! # Sale History
//!
//! Building and editing sales outside the cashier flow: the admin edit
//! screen and clients posting complete sales.
//!
//! An edit always replaces the whole line set and recomputes every total
//! from scratch. Nothing is patched incrementally, so editing a sale without
//! changing its lines reproduces the same totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::totals::{build_line_from_snapshot, compute_totals};
use crate::types::{PaymentMode, Sale, SaleLineItem};
use crate::validation::{validate_id, validate_price, validate_quantity};

/// A line as submitted by an editor: product, quantity and the price/rate
/// snapshot to record. Totals are never taken from the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDraft {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_inclusive_tax: Decimal,
    pub tax_rate_percent: Decimal,
}

impl From<&SaleLineItem> for LineDraft {
    fn from(line: &SaleLineItem) -> Self {
        Self {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_inclusive_tax: line.unit_price_inclusive_tax,
            tax_rate_percent: line.tax_rate_percent,
        }
    }
}

/// Replacement content for an existing sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEdit {
    pub lines: Vec<LineDraft>,
    /// Keep the current payment mode when absent.
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
}

/// Creates a complete sale from drafts, recomputing all totals.
pub fn assemble_sale(
    event_id: &str,
    point_of_sale_id: Option<&str>,
    payment_mode: PaymentMode,
    drafts: &[LineDraft],
    timestamp: DateTime<Utc>,
) -> CoreResult<Sale> {
    validate_id("eventId", event_id)?;

    let id = Uuid::new_v4().to_string();
    let lines = build_lines(&id, drafts)?;
    let totals = compute_totals(&lines)?;

    Ok(Sale {
        id,
        timestamp,
        event_id: event_id.to_string(),
        point_of_sale_id: point_of_sale_id.map(str::to_string),
        payment_mode,
        total_inclusive_tax: totals.total_inclusive_tax,
        total_exclusive_tax: totals.total_exclusive_tax,
        total_tax_amount: totals.total_tax_amount,
        lines,
    })
}

/// Applies an edit: new line set, optional new payment mode, fresh totals.
///
/// Identity, timestamp and scope of the sale are preserved.
pub fn apply_edit(sale: &Sale, edit: &SaleEdit) -> CoreResult<Sale> {
    let lines = build_lines(&sale.id, &edit.lines)?;
    let totals = compute_totals(&lines)?;

    Ok(Sale {
        payment_mode: edit.payment_mode.unwrap_or(sale.payment_mode),
        total_inclusive_tax: totals.total_inclusive_tax,
        total_exclusive_tax: totals.total_exclusive_tax,
        total_tax_amount: totals.total_tax_amount,
        lines,
        ..sale.clone()
    })
}

/// Recomputes the totals of a sale from its own lines.
pub fn recompute(sale: &Sale) -> CoreResult<Sale> {
    let totals = compute_totals(&sale.lines)?;
    Ok(Sale {
        total_inclusive_tax: totals.total_inclusive_tax,
        total_exclusive_tax: totals.total_exclusive_tax,
        total_tax_amount: totals.total_tax_amount,
        ..sale.clone()
    })
}

fn build_lines(sale_id: &str, drafts: &[LineDraft]) -> CoreResult<Vec<SaleLineItem>> {
    if drafts.is_empty() {
        return Err(CoreError::EmptySale {
            sale_id: sale_id.to_string(),
        });
    }

    let mut invalid = Vec::new();
    for (i, draft) in drafts.iter().enumerate() {
        if validate_id("productId", &draft.product_id).is_err() {
            invalid.push(format!("lines[{i}].productId"));
        }
        if validate_quantity(draft.quantity).is_err() {
            invalid.push(format!("lines[{i}].quantity"));
        }
        if validate_price("unitPriceInclusiveTax", draft.unit_price_inclusive_tax).is_err() {
            invalid.push(format!("lines[{i}].unitPriceInclusiveTax"));
        }
        if draft.tax_rate_percent < Decimal::ZERO || draft.tax_rate_percent > Decimal::ONE_HUNDRED {
            invalid.push(format!("lines[{i}].taxRatePercent"));
        }
    }
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidFields { fields: invalid }.into());
    }

    drafts
        .iter()
        .map(|d| {
            build_line_from_snapshot(
                sale_id,
                &d.product_id,
                d.quantity,
                d.unit_price_inclusive_tax,
                d.tax_rate_percent,
            )
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
