//! # Product Handlers
//!
//! Catalog listing for the cashier and CRUD for the admin screen.
//!
//! ## Write Path
//! ```text
//! POST/PUT body ──► ProductInput::into_product (validation, rate normalization)
//!               ──► db.products().insert/update
//!               ──► session catalog cache invalidated
//!               ──► deactivated product removed from the cart
//! ```

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use caisse_core::validation::{normalize_tax_rate, validate_name, validate_price, validate_sku};
use caisse_core::{Product, ValidationError};
use caisse_db::repository::product::generate_product_id;

use crate::error::{ApiError, ApiResult};
use crate::handlers::{non_blank, reject_if_any};
use crate::state::{ConfigState, DbState, SessionState};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(default, alias = "event_id")]
    pub event_id: Option<String>,
    #[serde(default, alias = "point_of_sale_id")]
    pub point_of_sale_id: Option<String>,
    /// Admin listing: every product, inactive ones included.
    #[serde(default, alias = "include_inactive")]
    pub include_inactive: bool,
}

/// Create/update payload. On update, absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "unit_price_inclusive_tax", alias = "price")]
    pub unit_price_inclusive_tax: Option<Decimal>,
    #[serde(default, alias = "tax_rate_percent", alias = "taxRate")]
    pub tax_rate_percent: Option<Decimal>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, alias = "image_ref")]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default, alias = "point_of_sale_ids")]
    pub point_of_sale_ids: Option<Vec<String>>,
}

impl ProductInput {
    /// Validates the payload against `existing` (update) or from scratch (create).
    fn into_product(
        self,
        existing: Option<Product>,
        default_tax_rate: Decimal,
    ) -> Result<Product, ApiError> {
        let mut errors = Vec::new();
        let now = Utc::now();

        let name = match (self.name, &existing) {
            (Some(name), _) => validate_name("name", &name).map_err(|e| errors.push(e)).ok(),
            (None, Some(product)) => Some(product.name.clone()),
            (None, None) => {
                errors.push(ValidationError::Required {
                    field: "name".to_string(),
                });
                None
            }
        };

        let price = match (self.unit_price_inclusive_tax, &existing) {
            (Some(price), _) => validate_price("unitPriceInclusiveTax", price)
                .map(|_| price)
                .map_err(|e| errors.push(e))
                .ok(),
            (None, Some(product)) => Some(product.unit_price_inclusive_tax),
            (None, None) => {
                errors.push(ValidationError::Required {
                    field: "unitPriceInclusiveTax".to_string(),
                });
                None
            }
        };

        let tax_rate = match (self.tax_rate_percent, &existing) {
            (Some(rate), _) => normalize_tax_rate(rate).map_err(|e| errors.push(e)).ok(),
            (None, Some(product)) => Some(product.tax_rate_percent),
            (None, None) => Some(default_tax_rate),
        };

        let sku = match self.sku {
            Some(sku) if sku.trim().is_empty() => None,
            Some(sku) => match validate_sku(&sku) {
                Ok(()) => Some(sku.trim().to_string()),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
            None => existing.as_ref().and_then(|p| p.sku.clone()),
        };

        reject_if_any(errors)?;

        let (Some(name), Some(unit_price_inclusive_tax), Some(tax_rate_percent)) =
            (name, price, tax_rate)
        else {
            return Err(ApiError::internal("Product validation left a field unset"));
        };

        let image_ref = match self.image_ref {
            Some(image_ref) => non_blank(Some(&image_ref)).map(str::to_string),
            None => existing.as_ref().and_then(|p| p.image_ref.clone()),
        };

        let point_of_sale_ids = match self.point_of_sale_ids {
            Some(mut ids) => {
                ids.retain(|id| !id.trim().is_empty());
                ids.sort();
                ids.dedup();
                ids
            }
            None => existing
                .as_ref()
                .map(|p| p.point_of_sale_ids.clone())
                .unwrap_or_default(),
        };

        Ok(Product {
            id: existing
                .as_ref()
                .map(|p| p.id.clone())
                .unwrap_or_else(generate_product_id),
            name,
            unit_price_inclusive_tax,
            tax_rate_percent,
            sku,
            image_ref,
            active: self
                .active
                .unwrap_or_else(|| existing.as_ref().map_or(true, |p| p.active)),
            point_of_sale_ids,
            created_at: existing.as_ref().map_or(now, |p| p.created_at),
            updated_at: now,
        })
    }
}

/// `GET /api/products`
///
/// Active products for `(eventId, pointOfSaleId)` ordered by name, or every
/// product with `includeInactive=true`.
pub async fn list_products(
    State(db): State<DbState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    debug!(?query, "list_products");

    let products = if query.include_inactive {
        db.inner().products().list_all(true).await?
    } else {
        db.inner()
            .products()
            .list_for_scope(
                non_blank(query.event_id.as_deref()),
                non_blank(query.point_of_sale_id.as_deref()),
            )
            .await?
    };

    Ok(Json(products))
}

/// `GET /api/products/:id`
pub async fn get_product(
    State(db): State<DbState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = db
        .inner()
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    Ok(Json(product))
}

/// `POST /api/products`
pub async fn create_product(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    Json(input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = input.into_product(None, config.default_tax_rate_percent)?;
    let product = db.inner().products().insert(&product).await?;
    session.invalidate_catalog();

    info!(id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/:id`
pub async fn update_product(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<Product>> {
    let existing = db
        .inner()
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    let product = input.into_product(Some(existing), config.default_tax_rate_percent)?;
    db.inner().products().update(&product).await?;

    if product.active {
        session.invalidate_catalog();
    } else {
        session.with_session_mut(|s| s.forget_product(&product.id));
    }

    info!(id = %product.id, "Product updated");
    Ok(Json(product))
}

/// `DELETE /api/products/:id`
///
/// Soft delete: the product disappears from the catalog and from the cart,
/// recorded sales keep their lines.
pub async fn delete_product(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    db.inner().products().soft_delete(&id).await?;
    session.with_session_mut(|s| s.forget_product(&id));

    info!(id = %id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}
