//! # Checkout Workflow
//!
//! Converts the session's cart into a persisted [`Sale`].
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────┐  begin   ┌────────────┐  valid   ┌────────────┐            │
//! │   │ Idle │ ───────► │ Validating │ ───────► │ Persisting │            │
//! │   └──────┘          └─────┬──────┘          └─────┬──────┘            │
//! │      ▲                    │ precondition          │ ok: cart cleared   │
//! │      │                    │ failed                │ err: cart kept     │
//! │      └────────────────────┴───────────────────────┘                    │
//! │                                                                         │
//! │   A second begin while not Idle → CheckoutInProgress                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Preconditions (first failure wins)
//! 1. an event is selected
//! 2. a point-of-sale is selected (when scoping is required)
//! 3. the cart is not empty
//!
//! The session lock is only taken for short synchronous sections, never
//! across the catalog load or the store call.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CheckoutError;
use crate::session::{self, PosSession};
use crate::store::{CatalogSource, SaleStore};
use crate::totals::{build_line_item, compute_totals};
use crate::types::{PaymentMode, Product, Sale};

// =============================================================================
// Phase & Gate
// =============================================================================

/// Where the (single) checkout currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutPhase {
    Idle,
    Validating,
    Persisting,
}

impl CheckoutPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CheckoutPhase::Validating,
            2 => CheckoutPhase::Persisting,
            _ => CheckoutPhase::Idle,
        }
    }
}

/// Single-flight guard: at most one checkout between `begin` and drop.
#[derive(Debug, Default)]
pub struct CheckoutGate {
    phase: AtomicU8,
}

impl CheckoutGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CheckoutPhase {
        CheckoutPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Moves Idle → Validating, or fails if a checkout is running.
    pub fn begin(&self) -> Result<CheckoutGuard<'_>, CheckoutError> {
        self.phase
            .compare_exchange(
                CheckoutPhase::Idle as u8,
                CheckoutPhase::Validating as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| CheckoutError::CheckoutInProgress)?;
        Ok(CheckoutGuard { gate: self })
    }
}

/// Returns the gate to Idle when dropped, whatever the outcome.
#[derive(Debug)]
pub struct CheckoutGuard<'a> {
    gate: &'a CheckoutGate,
}

impl CheckoutGuard<'_> {
    fn persisting(&self) {
        self.gate
            .phase
            .store(CheckoutPhase::Persisting as u8, Ordering::Release);
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        self.gate
            .phase
            .store(CheckoutPhase::Idle as u8, Ordering::Release);
    }
}

// =============================================================================
// Options
// =============================================================================

/// What to do with cart entries whose product is no longer in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProductPolicy {
    /// Skip the line and report it; fail only if nothing is left.
    #[default]
    DropLine,
    /// Refuse the whole checkout.
    Abort,
}

impl FromStr for MissingProductPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" | "drop_line" => Ok(MissingProductPolicy::DropLine),
            "abort" => Ok(MissingProductPolicy::Abort),
            other => Err(format!("unknown missing product policy '{other}'")),
        }
    }
}

impl fmt::Display for MissingProductPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingProductPolicy::DropLine => f.write_str("drop_line"),
            MissingProductPolicy::Abort => f.write_str("abort"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// Refuse checkout without a selected point-of-sale.
    pub require_point_of_sale: bool,
    pub missing_product_policy: MissingProductPolicy,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            require_point_of_sale: true,
            missing_product_policy: MissingProductPolicy::DropLine,
        }
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub sale: Sale,
    /// Cart entries left out because their product was not found.
    pub dropped_product_ids: Vec<String>,
}

// =============================================================================
// Workflow
// =============================================================================

/// Runs one checkout for `session`.
///
/// ## Flow
/// ```text
/// gate.begin ──► snapshot(scope, cart) ──► preconditions
///      ──► catalog (cached or loaded for the snapshot scope)
///      ──► lines + totals ──► store.create_sale
///      ──► ok:  sold quantities removed from the cart
///      ──► err: cart untouched, PersistenceFailed
/// ```
pub async fn checkout<C, S>(
    gate: &CheckoutGate,
    session: &Mutex<PosSession>,
    catalog: &C,
    store: &S,
    payment_mode: PaymentMode,
    options: CheckoutOptions,
) -> Result<CheckoutReceipt, CheckoutError>
where
    C: CatalogSource + ?Sized,
    S: SaleStore + ?Sized,
{
    let guard = gate.begin()?;

    let (scope, cart, cached, generation) = {
        let session = session::lock(session);
        let scope = session.scope();
        let cached = session.catalog.get(&scope).map(<[Product]>::to_vec);
        (scope, session.cart.clone(), cached, session.catalog.generation())
    };

    let Some(event_id) = scope.event_id.clone() else {
        return Err(CheckoutError::NoEventSelected);
    };
    if options.require_point_of_sale && scope.point_of_sale_id.is_none() {
        return Err(CheckoutError::NoPointOfSaleSelected);
    }
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let products = match cached {
        Some(products) => products,
        None => {
            let products = catalog
                .products_for(&scope)
                .await
                .map_err(|e| CheckoutError::CatalogUnavailable(e.to_string()))?;
            let mut session = session::lock(session);
            if session.scope() == scope {
                session.catalog.store(generation, scope.clone(), products.clone());
            }
            products
        }
    };
    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let sale_id = Uuid::new_v4().to_string();
    let mut lines = Vec::with_capacity(cart.item_count());
    let mut dropped_product_ids = Vec::new();

    for (product_id, quantity) in cart.entries() {
        match by_id.get(product_id) {
            Some(product) => lines.push(
                build_line_item(&sale_id, product, quantity)
                    .map_err(|e| CheckoutError::AmountOutOfRange(e.to_string()))?,
            ),
            None => dropped_product_ids.push(product_id.to_string()),
        }
    }

    if !dropped_product_ids.is_empty() {
        tracing::warn!(
            products = ?dropped_product_ids,
            policy = %options.missing_product_policy,
            "cart references products missing from the catalog"
        );
        if options.missing_product_policy == MissingProductPolicy::Abort || lines.is_empty() {
            return Err(CheckoutError::ProductNotFound {
                product_ids: dropped_product_ids,
            });
        }
    }

    let totals =
        compute_totals(&lines).map_err(|e| CheckoutError::AmountOutOfRange(e.to_string()))?;
    let sale = Sale {
        id: sale_id,
        timestamp: Utc::now(),
        event_id,
        point_of_sale_id: scope.point_of_sale_id.clone(),
        payment_mode,
        total_inclusive_tax: totals.total_inclusive_tax,
        total_exclusive_tax: totals.total_exclusive_tax,
        total_tax_amount: totals.total_tax_amount,
        lines,
    };

    guard.persisting();
    let stored = store.create_sale(&sale).await.map_err(|e| {
        tracing::error!(sale_id = %sale.id, error = %e, "failed to persist sale");
        CheckoutError::PersistenceFailed(e.to_string())
    })?;

    session::lock(session).cart.subtract(&cart);

    tracing::info!(
        sale_id = %stored.id,
        total = %stored.total_inclusive_tax,
        lines = stored.lines.len(),
        payment = %stored.payment_mode,
        "sale recorded"
    );

    drop(guard);
    Ok(CheckoutReceipt {
        sale: stored,
        dropped_product_ids,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
