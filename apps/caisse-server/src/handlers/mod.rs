//! # HTTP Handlers Module
//!
//! All endpoints exposed to the cashier, admin and history screens.
//!
//! ## Handler Organization
//! ```text
//! handlers/
//! ├── mod.rs            ◄─── You are here (health, config, shared queries)
//! ├── product.rs        ◄─── Product CRUD, scoped listing
//! ├── event.rs          ◄─── Event CRUD, archiving
//! ├── point_of_sale.rs  ◄─── Point-of-sale CRUD
//! ├── sale.rs           ◄─── History, REST createSale, edit, CSV, KPI
//! └── session.rs        ◄─── Selection, cart, checkout
//! ```
//!
//! ## How Handlers Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  fetch('/api/products?eventId=e1&pointOfSaleId=s1')                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  async fn list_products(                                                │
//! │      State(db): State<DbState>,       ◄── FromRef<AppState>            │
//! │      Query(query): Query<ProductQuery> ◄── From the query string        │
//! │  ) -> ApiResult<Json<Vec<Product>>>                                     │
//! │         │                                                               │
//! │         ▼  (JSON, camelCase, decimals as strings)                       │
//! │  [{ "id": "...", "unitPriceInclusiveTax": "25.00", ... }]              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod event;
pub mod point_of_sale;
pub mod product;
pub mod sale;
pub mod session;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use caisse_core::ValidationError;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState, PublicConfig};

/// `?eventId=..&pointOfSaleId=..` filter shared by several listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeQuery {
    #[serde(default, alias = "event_id")]
    pub event_id: Option<String>,
    #[serde(default, alias = "point_of_sale_id")]
    pub point_of_sale_id: Option<String>,
}

impl ScopeQuery {
    pub fn event_id(&self) -> Option<&str> {
        non_blank(self.event_id.as_deref())
    }

    pub fn point_of_sale_id(&self) -> Option<&str> {
        non_blank(self.point_of_sale_id.as_deref())
    }
}

/// `?eventId=` from a form with nothing chosen arrives as an empty string.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Turns every problem found in a payload into one error.
///
/// A single problem keeps its own message; several are reported together
/// by field name.
pub(crate) fn reject_if_any(mut errors: Vec<ValidationError>) -> Result<(), ApiError> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0).into()),
        _ => Err(ApiError::invalid_fields(
            errors.iter().flat_map(ValidationError::fields).collect(),
        )),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// Liveness plus a database round-trip.
pub async fn health(State(db): State<DbState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = db.inner().health_check().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "up" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database: if healthy { "up" } else { "down" },
        }),
    )
}

pub async fn get_config(State(config): State<Arc<ConfigState>>) -> Json<PublicConfig> {
    Json(config.public_view())
}
