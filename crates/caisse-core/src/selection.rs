//! # Selection / Scope Context
//!
//! Which event and point-of-sale the cashier is working at, and the product
//! list loaded for that pair.
//!
//! ## Scope Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  select_event(E2)                                                       │
//! │    ├── selected stand belongs to E2?  yes → keep it                     │
//! │    └──                                no  → clear stand                 │
//! │                                                                         │
//! │  select_point_of_sale(S2)                                               │
//! │    ├── same stand or empty cart  → switch                               │
//! │    ├── cart not empty, !confirm  → ConfirmationRequired, no change      │
//! │    └── cart not empty, confirm   → switch and empty the cart            │
//! │                                                                         │
//! │  any change of (event, stand) ─► catalog cache for old scope is stale   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::SelectionError;
use crate::types::{PointOfSale, Product};

// =============================================================================
// Scope
// =============================================================================

/// The active `(event, point-of-sale)` pair filtering products and sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub event_id: Option<String>,
    pub point_of_sale_id: Option<String>,
}

impl Scope {
    pub fn new(event_id: Option<String>, point_of_sale_id: Option<String>) -> Self {
        Self {
            event_id,
            point_of_sale_id,
        }
    }
}

// =============================================================================
// Selection
// =============================================================================

/// What a selection call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionChange {
    pub scope_changed: bool,
    pub point_of_sale_cleared: bool,
    pub cart_cleared: bool,
}

/// The cashier's current event and point-of-sale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    event_id: Option<String>,
    point_of_sale_id: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a selection loaded from durable storage.
    pub fn restore(event_id: Option<String>, point_of_sale_id: Option<String>) -> Self {
        Self {
            event_id,
            point_of_sale_id,
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn point_of_sale_id(&self) -> Option<&str> {
        self.point_of_sale_id.as_deref()
    }

    /// Snapshot of the current scope.
    pub fn scope(&self) -> Scope {
        Scope::new(self.event_id.clone(), self.point_of_sale_id.clone())
    }

    /// Selects an event (or none).
    ///
    /// `points_of_event` are the points-of-sale of the newly selected event;
    /// the current stand is kept only if it is among them.
    pub fn select_event(
        &mut self,
        event_id: Option<&str>,
        points_of_event: &[PointOfSale],
    ) -> SelectionChange {
        if self.event_id.as_deref() == event_id {
            return SelectionChange::default();
        }

        self.event_id = event_id.map(str::to_string);

        let keeps_point_of_sale = match (&self.point_of_sale_id, event_id) {
            (Some(current), Some(event)) => points_of_event
                .iter()
                .any(|p| &p.id == current && p.event_id == event),
            _ => false,
        };

        let point_of_sale_cleared = self.point_of_sale_id.is_some() && !keeps_point_of_sale;
        if point_of_sale_cleared {
            self.point_of_sale_id = None;
        }

        SelectionChange {
            scope_changed: true,
            point_of_sale_cleared,
            cart_cleared: false,
        }
    }

    /// Selects a point-of-sale (or none).
    ///
    /// A change that would discard a non-empty cart is refused unless
    /// `confirmed`; once confirmed the cart is emptied.
    pub fn select_point_of_sale(
        &mut self,
        point_of_sale_id: Option<&str>,
        cart: &mut Cart,
        confirmed: bool,
    ) -> Result<SelectionChange, SelectionError> {
        if self.point_of_sale_id.as_deref() == point_of_sale_id {
            return Ok(SelectionChange::default());
        }

        let cart_cleared = !cart.is_empty();
        if cart_cleared && !confirmed {
            return Err(SelectionError::ConfirmationRequired {
                cart_items: cart.item_count(),
            });
        }

        if cart_cleared {
            cart.clear();
        }
        self.point_of_sale_id = point_of_sale_id.map(str::to_string);

        Ok(SelectionChange {
            scope_changed: true,
            point_of_sale_cleared: point_of_sale_id.is_none(),
            cart_cleared,
        })
    }

    /// Picks the first active point-of-sale of the selected event when none is
    /// selected yet. `points_of_event` should already be in display order.
    pub fn auto_select_point_of_sale(&mut self, points_of_event: &[PointOfSale]) -> SelectionChange {
        if self.point_of_sale_id.is_some() {
            return SelectionChange::default();
        }
        let Some(event_id) = self.event_id.as_deref() else {
            return SelectionChange::default();
        };

        match points_of_event
            .iter()
            .find(|p| p.active && p.event_id == event_id)
        {
            Some(first) => {
                self.point_of_sale_id = Some(first.id.clone());
                SelectionChange {
                    scope_changed: true,
                    ..SelectionChange::default()
                }
            }
            None => SelectionChange::default(),
        }
    }

    /// Forgets the event (and its stand) if it is the selected one.
    pub fn forget_event(&mut self, event_id: &str) -> SelectionChange {
        if self.event_id.as_deref() != Some(event_id) {
            return SelectionChange::default();
        }
        let point_of_sale_cleared = self.point_of_sale_id.take().is_some();
        self.event_id = None;
        SelectionChange {
            scope_changed: true,
            point_of_sale_cleared,
            cart_cleared: false,
        }
    }

    /// Forgets the stand if it is the selected one.
    pub fn forget_point_of_sale(&mut self, point_of_sale_id: &str) -> SelectionChange {
        if self.point_of_sale_id.as_deref() != Some(point_of_sale_id) {
            return SelectionChange::default();
        }
        self.point_of_sale_id = None;
        SelectionChange {
            scope_changed: true,
            point_of_sale_cleared: true,
            cart_cleared: false,
        }
    }
}

// =============================================================================
// Catalog Cache
// =============================================================================

/// Product list for exactly one scope.
///
/// Reads for any other scope miss, so a stale list is never served after
/// the selection moves.
///
/// Every [`invalidate`](Self::invalidate) bumps a generation counter. A
/// loader reads [`generation`](Self::generation) before it awaits the
/// catalog and passes it back to [`store`](Self::store); a list loaded
/// across an invalidation is rejected.
///
/// ```text
/// gen = cache.generation()        (0)
/// load products ...               admin edits a price ──► invalidate (gen 1)
/// cache.store(0, scope, list)     ──► false, nothing cached
/// ```
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    entry: Option<(Scope, Vec<Product>)>,
    generation: u64,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: &Scope) -> Option<&[Product]> {
        match &self.entry {
            Some((cached, products)) if cached == scope => Some(products.as_slice()),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Caches `products` for `scope` if no invalidation happened since
    /// `generation` was read. Returns whether the list was kept.
    pub fn store(&mut self, generation: u64, scope: Scope, products: Vec<Product>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.entry = Some((scope, products));
        true
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
