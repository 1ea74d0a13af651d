//! # Session Handlers
//!
//! The cashier screen: scope selection, cart edits and checkout.
//!
//! ## Checkout Response
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/session/checkout  { "paymentMode": "card" }                  │
//! │                                                                         │
//! │  200 { ok: true,  sale: {...}, droppedProductIds: [] }                  │
//! │  409 { ok: false, error: { code: "CHECKOUT_IN_PROGRESS", ... } }        │
//! │  422 { ok: false, error: { code: "EMPTY_CART" | "NO_EVENT_SELECTED" |   │
//! │                                  "NO_POINT_OF_SALE_SELECTED" |          │
//! │                                  "PRODUCT_NOT_FOUND" |                  │
//! │                                  "AMOUNT_OUT_OF_RANGE", ... } }         │
//! │  400 { ok: false, error: { code: "INVALID_REQUEST", ... } }             │
//! │  500 { ok: false, error: { code: "PERSISTENCE_FAILED" |                 │
//! │                                  "CATALOG_UNAVAILABLE", ... } }         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Checkout always answers with the same envelope so the cashier screen can
//! show the message without caring which layer failed.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use caisse_core::checkout::checkout as run_checkout;
use caisse_core::money::format_amount;
use caisse_core::selection::SelectionChange;
use caisse_core::session::CartPreview;
use caisse_core::{
    CheckoutError, CheckoutPhase, EventStatus, PaymentMode, PointOfSale, PosSession, Product, Sale,
    Scope, ValidationError,
};

use crate::error::{ApiError, ApiResult};
use crate::handlers::non_blank;
use crate::state::{ConfigState, DbState, SessionState};

// =============================================================================
// Session View
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: String,
    pub quantity: i64,
}

/// Everything the cashier screen renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub event_id: Option<String>,
    pub point_of_sale_id: Option<String>,
    pub cart: Vec<CartEntry>,
    pub preview: CartPreview,
    pub checkout_phase: CheckoutPhase,
    pub require_point_of_sale: bool,
}

async fn session_view(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
) -> ApiResult<SessionView> {
    let catalog = session.catalog(db.inner()).await?;

    let (scope, cart, preview) = session.with_session(|s| {
        let cart = s
            .cart
            .entries()
            .map(|(product_id, quantity)| CartEntry {
                product_id: product_id.to_string(),
                quantity,
            })
            .collect::<Vec<_>>();
        (s.scope(), cart, s.preview(&catalog))
    });
    let preview = preview?;

    let Scope {
        event_id,
        point_of_sale_id,
    } = scope;

    Ok(SessionView {
        event_id,
        point_of_sale_id,
        cart,
        preview,
        checkout_phase: session.gate().phase(),
        require_point_of_sale: config.require_point_of_sale,
    })
}

/// `GET /api/session`
pub async fn get_session(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(session_view(&db, &session, &config).await?))
}

/// `GET /api/session/catalog` (products sellable in the selected scope)
pub async fn get_catalog(
    State(db): State<DbState>,
    State(session): State<SessionState>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(session.catalog(db.inner()).await?))
}

// =============================================================================
// Selection
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectEventRequest {
    #[serde(default, alias = "event_id")]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectPointOfSaleRequest {
    #[serde(default, alias = "point_of_sale_id")]
    pub point_of_sale_id: Option<String>,
    /// Set once the cashier agreed to lose the current cart.
    #[serde(default, alias = "confirmed")]
    pub confirm: bool,
}

/// `PUT /api/session/event`
///
/// Selecting an event keeps the cart. The stand is kept only if it belongs
/// to the new event; otherwise the first active stand is picked.
pub async fn select_event(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    Json(request): Json<SelectEventRequest>,
) -> ApiResult<Json<SessionView>> {
    let event_id = non_blank(request.event_id.as_deref()).map(str::to_string);

    let points = match event_id.as_deref() {
        Some(id) => {
            let event = db
                .inner()
                .events()
                .get_by_id(id)
                .await?
                .ok_or_else(|| ApiError::not_found("Event", id))?;
            if event.status == EventStatus::Archived {
                return Err(ValidationError::InvalidFormat {
                    field: "eventId".to_string(),
                    reason: "event is archived".to_string(),
                }
                .into());
            }
            db.inner().points_of_sale().list(Some(id), false).await?
        }
        None => Vec::new(),
    };

    let changed = session.with_session_mut(|s| {
        let selected = s.select_event(event_id.as_deref(), &points);
        let auto = s.auto_select_point_of_sale(&points);
        selected.scope_changed || auto.scope_changed
    });

    if changed {
        session.persist_selection(db.inner()).await?;
        info!(event_id = ?event_id, "Event selected");
    }

    Ok(Json(session_view(&db, &session, &config).await?))
}

/// `PUT /api/session/point-of-sale`
///
/// Changing stand with a non-empty cart answers `409` until the request is
/// repeated with `confirm: true`.
pub async fn select_point_of_sale(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    Json(request): Json<SelectPointOfSaleRequest>,
) -> ApiResult<Json<SessionView>> {
    let point_id = non_blank(request.point_of_sale_id.as_deref()).map(str::to_string);

    let point = match point_id.as_deref() {
        Some(id) => Some(
            db.inner()
                .points_of_sale()
                .get_by_id(id)
                .await?
                .ok_or_else(|| ApiError::not_found("PointOfSale", id))?,
        ),
        None => None,
    };

    let change =
        session.with_session_mut(|s| select_stand(s, point.as_ref(), request.confirm))?;

    if change.scope_changed {
        session.persist_selection(db.inner()).await?;
        info!(
            point_of_sale_id = ?point_id,
            cart_cleared = change.cart_cleared,
            "Point-of-sale selected"
        );
    }

    Ok(Json(session_view(&db, &session, &config).await?))
}

/// Applies a stand choice under the session lock, so the event it is
/// checked against is the one it gets combined with.
fn select_stand(
    session: &mut PosSession,
    point: Option<&PointOfSale>,
    confirm: bool,
) -> ApiResult<SelectionChange> {
    if let Some(point) = point {
        let selected_event = session.scope().event_id;
        if !point.active || selected_event.as_deref() != Some(point.event_id.as_str()) {
            return Err(ValidationError::InvalidFormat {
                field: "pointOfSaleId".to_string(),
                reason: "not an active point-of-sale of the selected event".to_string(),
            }
            .into());
        }
    }

    Ok(session.select_point_of_sale(point.map(|p| p.id.as_str()), confirm)?)
}

// =============================================================================
// Cart
// =============================================================================

/// `POST /api/session/cart/:product_id` (one more unit)
///
/// Only products sellable in the selected scope can be added.
pub async fn add_to_cart(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let catalog = session.catalog(db.inner()).await?;
    if !catalog.iter().any(|p| p.id == product_id) {
        return Err(ApiError::not_found("Product", &product_id));
    }

    let quantity = session.with_session_mut(|s| s.cart.add(&product_id))?;
    debug!(product_id = %product_id, quantity, "Added to cart");

    Ok(Json(session_view(&db, &session, &config).await?))
}

/// `DELETE /api/session/cart/:product_id` (one unit less)
pub async fn remove_from_cart(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let quantity = session.with_session_mut(|s| s.cart.remove(&product_id));
    debug!(product_id = %product_id, quantity, "Removed from cart");

    Ok(Json(session_view(&db, &session, &config).await?))
}

/// `DELETE /api/session/cart/:product_id/all`
pub async fn remove_product_from_cart(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    session.with_session_mut(|s| s.cart.remove_entirely(&product_id));
    Ok(Json(session_view(&db, &session, &config).await?))
}

/// `DELETE /api/session/cart`
pub async fn clear_cart(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
) -> ApiResult<Json<SessionView>> {
    session.with_session_mut(|s| s.cart.clear());
    debug!("Cart cleared");
    Ok(Json(session_view(&db, &session, &config).await?))
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default, alias = "payment_mode", alias = "paymentMethod")]
    pub payment_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutFailure {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<Sale>,
    pub dropped_product_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CheckoutFailure>,
}

impl CheckoutResponse {
    fn failure(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
        let body = CheckoutResponse {
            ok: false,
            sale: None,
            dropped_product_ids: Vec::new(),
            error: Some(CheckoutFailure {
                code,
                message: message.into(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::CheckoutInProgress => StatusCode::CONFLICT,
        CheckoutError::NoEventSelected
        | CheckoutError::NoPointOfSaleSelected
        | CheckoutError::EmptyCart
        | CheckoutError::ProductNotFound { .. }
        | CheckoutError::AmountOutOfRange(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::CatalogUnavailable(_) | CheckoutError::PersistenceFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `POST /api/session/checkout`
pub async fn checkout(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    State(config): State<Arc<ConfigState>>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return CheckoutResponse::failure(
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                rejection.body_text(),
            )
        }
    };

    let payment_mode = match non_blank(request.payment_mode.as_deref()).map(PaymentMode::from_str) {
        Some(Ok(mode)) => mode,
        Some(Err(reason)) => {
            return CheckoutResponse::failure(StatusCode::BAD_REQUEST, "INVALID_REQUEST", reason)
        }
        None => {
            return CheckoutResponse::failure(
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                "paymentMode is required",
            )
        }
    };

    let outcome = run_checkout(
        session.gate(),
        session.shared(),
        db.inner(),
        db.inner(),
        payment_mode,
        config.checkout_options(),
    )
    .await;

    match outcome {
        Ok(receipt) => {
            info!(
                sale_id = %receipt.sale.id,
                total = %format_amount(receipt.sale.total_inclusive_tax, &config.currency),
                payment_mode = %receipt.sale.payment_mode,
                dropped = receipt.dropped_product_ids.len(),
                "Checkout completed"
            );
            let body = CheckoutResponse {
                ok: true,
                sale: Some(receipt.sale),
                dropped_product_ids: receipt.dropped_product_ids,
                error: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            let status = checkout_status(&err);
            if status.is_server_error() {
                warn!(code = err.code(), error = %err, "Checkout failed");
            } else {
                debug!(code = err.code(), "Checkout refused");
            }
            CheckoutResponse::failure(status, err.code(), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_status_mapping() {
        assert_eq!(checkout_status(&CheckoutError::EmptyCart), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(checkout_status(&CheckoutError::CheckoutInProgress), StatusCode::CONFLICT);
        assert_eq!(
            checkout_status(&CheckoutError::PersistenceFailed("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            checkout_status(&CheckoutError::ProductNotFound {
                product_ids: vec!["p1".into()]
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_failure_envelope_omits_sale() {
        let body = CheckoutResponse {
            ok: false,
            sale: None,
            dropped_product_ids: Vec::new(),
            error: Some(CheckoutFailure {
                code: "EMPTY_CART",
                message: "Cart is empty".into(),
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ok"], false);
        assert!(json.get("sale").is_none());
        assert_eq!(json["error"]["code"], "EMPTY_CART");
        assert_eq!(json["droppedProductIds"], serde_json::json!([]));
    }

    fn stand(id: &str, event_id: &str) -> PointOfSale {
        PointOfSale {
            id: id.into(),
            event_id: event_id.into(),
            name: id.to_uppercase(),
            active: true,
        }
    }

    #[test]
    fn test_stand_checked_against_event_at_selection_time() {
        // stand fetched while e1 was selected, event switched before the lock
        let fetched = stand("s1", "e1");
        let mut session = PosSession::new(caisse_core::Selection::restore(Some("e2".into()), None));

        let err = select_stand(&mut session, Some(&fetched), false).unwrap_err();
        assert_eq!(err.fields, vec!["pointOfSaleId"]);
        assert_eq!(session.scope().point_of_sale_id, None);

        let change = select_stand(&mut session, Some(&stand("s2", "e2")), false).unwrap();
        assert!(change.scope_changed);
        assert_eq!(session.scope().point_of_sale_id.as_deref(), Some("s2"));
    }

    #[test]
    fn test_inactive_stand_rejected() {
        let mut closed = stand("s1", "e1");
        closed.active = false;
        let mut session = PosSession::new(caisse_core::Selection::restore(Some("e1".into()), None));

        assert!(select_stand(&mut session, Some(&closed), false).is_err());
        assert!(select_stand(&mut session, None, false).is_ok());
    }
}
