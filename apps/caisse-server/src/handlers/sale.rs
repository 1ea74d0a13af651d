//! # Sale Handlers
//!
//! History, REST sale creation, edits, CSV export and the KPI report.
//!
//! ## REST createSale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/sales                                                        │
//! │  { eventId, pointOfSaleId, paymentMode, lines: [{ productId, quantity,  │
//! │    unitPriceInclusiveTax, taxRatePercent }] }                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  every field checked, all problems reported in one response            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  tax rates normalized (0.081 → 8.1)                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  assemble_sale: line subtotals and totals recomputed server-side       │
//! │  (any totals sent by the client are ignored)                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use caisse_core::export::sales_to_csv;
use caisse_core::history::{apply_edit, assemble_sale, LineDraft, SaleEdit};
use caisse_core::kpi::{summarize, KpiSummary};
use caisse_core::validation::{normalize_tax_rate, validate_price, validate_quantity};
use caisse_core::{PaymentMode, Sale, ValidationError, MAX_UNIT_PRICE};

use crate::error::{ApiError, ApiResult};
use crate::handlers::{non_blank, reject_if_any, ScopeQuery};
use crate::state::{ConfigState, DbState};

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineInput {
    #[serde(default, alias = "product_id")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default, alias = "unit_price_inclusive_tax", alias = "unitPrice")]
    pub unit_price_inclusive_tax: Option<Decimal>,
    #[serde(default, alias = "tax_rate_percent", alias = "taxRate")]
    pub tax_rate_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[serde(default, alias = "event_id")]
    pub event_id: Option<String>,
    #[serde(default, alias = "point_of_sale_id")]
    pub point_of_sale_id: Option<String>,
    #[serde(default, alias = "payment_mode", alias = "paymentMethod")]
    pub payment_mode: Option<String>,
    #[serde(default)]
    pub lines: Option<Vec<LineInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSaleRequest {
    /// Replaces every line when present; the stored lines are kept otherwise.
    #[serde(default)]
    pub lines: Option<Vec<LineInput>>,
    #[serde(default, alias = "payment_mode", alias = "paymentMethod")]
    pub payment_mode: Option<String>,
}

fn field_error(field: String, reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field,
        reason: reason.to_string(),
    }
}

fn required(field: impl Into<String>) -> ValidationError {
    ValidationError::Required {
        field: field.into(),
    }
}

fn parse_payment_mode(value: Option<&str>, errors: &mut Vec<ValidationError>) -> Option<PaymentMode> {
    match non_blank(value) {
        Some(raw) => PaymentMode::from_str(raw)
            .map_err(|reason| errors.push(field_error("paymentMode".to_string(), &reason)))
            .ok(),
        None => None,
    }
}

/// Checks every line, normalizing tax rates. Problems are pushed with their
/// `lines[i].field` path.
fn parse_lines(lines: &[LineInput], errors: &mut Vec<ValidationError>) -> Vec<LineDraft> {
    if lines.is_empty() {
        errors.push(required("lines"));
        return Vec::new();
    }

    let mut drafts = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let product_id = non_blank(line.product_id.as_deref()).map(str::to_string);
        if product_id.is_none() {
            errors.push(required(format!("lines[{i}].productId")));
        }

        let quantity = match line.quantity {
            Some(q) if validate_quantity(q).is_ok() => Some(q),
            Some(_) => {
                errors.push(field_error(format!("lines[{i}].quantity"), "must be between 1 and 999"));
                None
            }
            None => {
                errors.push(required(format!("lines[{i}].quantity")));
                None
            }
        };

        let price = match line.unit_price_inclusive_tax {
            Some(p) if validate_price("unitPriceInclusiveTax", p).is_ok() => Some(p),
            Some(_) => {
                errors.push(field_error(
                    format!("lines[{i}].unitPriceInclusiveTax"),
                    &format!("must be between 0 and {MAX_UNIT_PRICE}"),
                ));
                None
            }
            None => {
                errors.push(required(format!("lines[{i}].unitPriceInclusiveTax")));
                None
            }
        };

        let rate = match line.tax_rate_percent.map(normalize_tax_rate) {
            Some(Ok(rate)) => Some(rate),
            Some(Err(_)) => {
                errors.push(field_error(
                    format!("lines[{i}].taxRatePercent"),
                    "must be between 0 and 100",
                ));
                None
            }
            None => {
                errors.push(required(format!("lines[{i}].taxRatePercent")));
                None
            }
        };

        if let (Some(product_id), Some(quantity), Some(unit_price_inclusive_tax), Some(tax_rate_percent)) =
            (product_id, quantity, price, rate)
        {
            drafts.push(LineDraft {
                product_id,
                quantity,
                unit_price_inclusive_tax,
                tax_rate_percent,
            });
        }
    }
    drafts
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/sales` (newest first, `?eventId&pointOfSaleId`)
pub async fn list_sales(
    State(db): State<DbState>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let sales = db
        .inner()
        .sales()
        .list(query.event_id(), query.point_of_sale_id())
        .await?;
    Ok(Json(sales))
}

/// `GET /api/sales/:id`
pub async fn get_sale(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Sale>> {
    let sale = db
        .inner()
        .sales()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    Ok(Json(sale))
}

/// `POST /api/sales`
///
/// `pointOfSaleId` is required while point-of-sale scoping is on.
pub async fn create_sale(
    State(db): State<DbState>,
    State(config): State<Arc<ConfigState>>,
    Json(request): Json<CreateSaleRequest>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    debug!("create_sale");
    let mut errors = Vec::new();

    let event_id = non_blank(request.event_id.as_deref()).map(str::to_string);
    if event_id.is_none() {
        errors.push(required("eventId"));
    }
    let point_of_sale_id = non_blank(request.point_of_sale_id.as_deref()).map(str::to_string);
    if config.require_point_of_sale && point_of_sale_id.is_none() {
        errors.push(required("pointOfSaleId"));
    }

    let payment_mode = parse_payment_mode(request.payment_mode.as_deref(), &mut errors);
    if non_blank(request.payment_mode.as_deref()).is_none() {
        errors.push(required("paymentMode"));
    }

    let drafts = parse_lines(request.lines.as_deref().unwrap_or_default(), &mut errors);

    reject_if_any(errors)?;
    let (Some(event_id), Some(payment_mode)) = (event_id, payment_mode) else {
        return Err(ApiError::internal("Sale validation left a field unset"));
    };

    if let Some(point_id) = point_of_sale_id.as_deref() {
        let belongs = db
            .inner()
            .points_of_sale()
            .get_by_id(point_id)
            .await?
            .is_some_and(|p| p.event_id == event_id);
        if !belongs {
            return Err(field_error(
                "pointOfSaleId".to_string(),
                "unknown point-of-sale for this event",
            )
            .into());
        }
    }

    let sale = assemble_sale(
        &event_id,
        point_of_sale_id.as_deref(),
        payment_mode,
        &drafts,
        Utc::now(),
    )?;
    let sale = db.inner().sales().insert(&sale).await?;

    info!(
        id = %sale.id,
        total = %sale.total_inclusive_tax,
        lines = sale.lines.len(),
        "Sale recorded"
    );
    Ok((StatusCode::CREATED, Json(sale)))
}

/// `PUT /api/sales/:id`
///
/// Replaces the lines (and optionally the payment mode) and recomputes
/// every total.
pub async fn update_sale(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(request): Json<EditSaleRequest>,
) -> ApiResult<Json<Sale>> {
    let existing = db
        .inner()
        .sales()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;

    let mut errors = Vec::new();
    let payment_mode = parse_payment_mode(request.payment_mode.as_deref(), &mut errors);
    let lines = match request.lines.as_deref() {
        Some(lines) => parse_lines(lines, &mut errors),
        None => existing.lines.iter().map(LineDraft::from).collect(),
    };
    reject_if_any(errors)?;

    let edited = apply_edit(
        &existing,
        &SaleEdit {
            lines,
            payment_mode,
        },
    )?;
    db.inner().sales().replace(&edited).await?;

    info!(id = %edited.id, total = %edited.total_inclusive_tax, "Sale edited");
    Ok(Json(edited))
}

/// `DELETE /api/sales/:id`
pub async fn delete_sale(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().sales().delete(&id).await?;
    info!(id = %id, "Sale deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/sales/export.csv`
pub async fn export_csv(
    State(db): State<DbState>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<impl IntoResponse> {
    let db = db.inner();
    let sales = db
        .sales()
        .list(query.event_id(), query.point_of_sale_id())
        .await?;
    let events = db.events().list(true).await?;
    let products = db.products().list_all(true).await?;

    let csv = sales_to_csv(&sales, &events, &products);
    info!(sales = sales.len(), "CSV export generated");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"sales.csv\""),
        ],
        csv,
    ))
}

/// `GET /api/sales/report`
pub async fn report(
    State(db): State<DbState>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Json<KpiSummary>> {
    let db = db.inner();
    let sales = db
        .sales()
        .list(query.event_id(), query.point_of_sale_id())
        .await?;
    let products = db.products().list_all(true).await?;

    Ok(Json(summarize(&sales, &products)))
}
