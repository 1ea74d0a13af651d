//! # Cashier Session
//!
//! One cashier's working state: the cart, the selected scope, and the
//! catalog loaded for that scope. The server holds exactly one of these
//! behind a mutex.
//!
//! Every selection change that moves the scope drops the cached catalog.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::cart::Cart;
use crate::error::{CoreResult, SelectionError};
use crate::money::round2;
use crate::selection::{CatalogCache, Scope, Selection, SelectionChange};
use crate::types::{PointOfSale, Product, SaleTotals};
use crate::totals::{build_line_item, compute_totals};

/// Cart, scope and cached catalog for a single cashier.
#[derive(Debug, Clone, Default)]
pub struct PosSession {
    pub cart: Cart,
    pub selection: Selection,
    pub catalog: CatalogCache,
}

impl PosSession {
    pub fn new(selection: Selection) -> Self {
        Self {
            cart: Cart::new(),
            selection,
            catalog: CatalogCache::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.selection.scope()
    }

    pub fn select_event(
        &mut self,
        event_id: Option<&str>,
        points_of_event: &[PointOfSale],
    ) -> SelectionChange {
        let change = self.selection.select_event(event_id, points_of_event);
        self.after_change(change)
    }

    pub fn select_point_of_sale(
        &mut self,
        point_of_sale_id: Option<&str>,
        confirmed: bool,
    ) -> Result<SelectionChange, SelectionError> {
        let change = self
            .selection
            .select_point_of_sale(point_of_sale_id, &mut self.cart, confirmed)?;
        Ok(self.after_change(change))
    }

    pub fn auto_select_point_of_sale(&mut self, points_of_event: &[PointOfSale]) -> SelectionChange {
        let change = self.selection.auto_select_point_of_sale(points_of_event);
        self.after_change(change)
    }

    pub fn forget_event(&mut self, event_id: &str) -> SelectionChange {
        let change = self.selection.forget_event(event_id);
        self.after_change(change)
    }

    pub fn forget_point_of_sale(&mut self, point_of_sale_id: &str) -> SelectionChange {
        let change = self.selection.forget_point_of_sale(point_of_sale_id);
        self.after_change(change)
    }

    /// A product left the catalog: drop it from the cart and the cache.
    pub fn forget_product(&mut self, product_id: &str) {
        self.cart.remove_entirely(product_id);
        self.catalog.invalidate();
    }

    /// Priced view of the cart against `catalog`, for display before checkout.
    pub fn preview(&self, catalog: &[Product]) -> CoreResult<CartPreview> {
        let by_id: HashMap<&str, &Product> = catalog.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut lines = Vec::with_capacity(self.cart.item_count());
        let mut missing_product_ids = Vec::new();
        let mut sale_lines = Vec::with_capacity(self.cart.item_count());

        for (product_id, quantity) in self.cart.entries() {
            match by_id.get(product_id) {
                Some(product) => {
                    let line = build_line_item("preview", product, quantity)?;
                    lines.push(CartLine {
                        product_id: product.id.clone(),
                        name: product.name.clone(),
                        quantity,
                        unit_price_inclusive_tax: product.unit_price_inclusive_tax,
                        line_subtotal_inclusive_tax: round2(line.line_subtotal_inclusive_tax),
                    });
                    sale_lines.push(line);
                }
                None => missing_product_ids.push(product_id.to_string()),
            }
        }

        Ok(CartPreview {
            lines,
            totals: compute_totals(&sale_lines)?,
            missing_product_ids,
        })
    }

    fn after_change(&mut self, change: SelectionChange) -> SelectionChange {
        if change.scope_changed {
            self.catalog.invalidate();
        }
        change
    }
}

/// One priced row of [`CartPreview`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_inclusive_tax: Decimal,
    pub line_subtotal_inclusive_tax: Decimal,
}

/// The cart as the cashier sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPreview {
    pub lines: Vec<CartLine>,
    pub totals: SaleTotals,
    /// Cart entries with no product in the current catalog.
    pub missing_product_ids: Vec<String>,
}

/// Locks a shared session, recovering the data if a holder panicked.
pub fn lock(session: &Mutex<PosSession>) -> MutexGuard<'_, PosSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Unit Tests
// =============================================================================
