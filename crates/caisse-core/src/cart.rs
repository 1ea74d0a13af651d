//! # Cart
//!
//! The cashier's in-progress order: product id → quantity.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Tap product ────────────► add(id) ────────────► qty + 1 (new → 1)     │
//! │                                                                         │
//! │  Tap minus ──────────────► remove(id) ─────────► qty − 1 (1 → gone)    │
//! │                                                                         │
//! │  Tap trash ──────────────► remove_entirely(id) ► entry gone            │
//! │                                                                         │
//! │  Clear / sale saved ─────► clear() ────────────► {}                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Quantities are always ≥ 1; an entry reaching 0 is removed
//! - Removing an absent product is a no-op
//! - Entries iterate in product-id order
//!
//! Prices are NOT stored here. They are read from the catalog when the cart
//! is checked out, so the sale reflects the catalog at that moment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// In-memory cart of product quantities. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    entries: BTreeMap<String, i64>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit of a product.
    ///
    /// ## Errors
    /// - [`CoreError::QuantityTooLarge`] past 999 units of one product
    /// - [`CoreError::CartTooLarge`] when a 101st distinct product is added
    pub fn add(&mut self, product_id: &str) -> CoreResult<i64> {
        if let Some(quantity) = self.entries.get_mut(product_id) {
            let requested = *quantity + 1;
            if requested > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            *quantity = requested;
            return Ok(requested);
        }

        if self.entries.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.entries.insert(product_id.to_string(), 1);
        Ok(1)
    }

    /// Removes one unit. Returns the remaining quantity (0 when gone).
    pub fn remove(&mut self, product_id: &str) -> i64 {
        match self.entries.get_mut(product_id) {
            Some(quantity) if *quantity > 1 => {
                *quantity -= 1;
                *quantity
            }
            Some(_) => {
                self.entries.remove(product_id);
                0
            }
            None => 0,
        }
    }

    /// Drops a product regardless of quantity. Returns whether it was present.
    pub fn remove_entirely(&mut self, product_id: &str) -> bool {
        self.entries.remove(product_id).is_some()
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Takes away the quantities of `sold`, keeping anything added since.
    pub fn subtract(&mut self, sold: &Cart) {
        for (product_id, sold_qty) in &sold.entries {
            if let Some(quantity) = self.entries.get_mut(product_id) {
                *quantity -= sold_qty;
                if *quantity <= 0 {
                    self.entries.remove(product_id);
                }
            }
        }
    }

    pub fn quantity(&self, product_id: &str) -> i64 {
        self.entries.get(product_id).copied().unwrap_or(0)
    }

    /// `(product_id, quantity)` pairs in product-id order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.entries.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    /// Number of distinct products.
    pub fn item_count(&self) -> usize {
        self.entries.len()
    }

    /// Total units across all products.
    pub fn total_quantity(&self) -> i64 {
        self.entries.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_creates_then_increments() {
        let mut cart = Cart::new();
        assert_eq!(cart.add("p1").unwrap(), 1);
        assert_eq!(cart.add("p1").unwrap(), 2);
        assert_eq!(cart.add("p2").unwrap(), 1);

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.quantity("p1"), 2);
    }

    #[test]
    fn test_remove_decrements_and_deletes_at_zero() {
        let mut cart = Cart::new();
        cart.add("p1").unwrap();
        cart.add("p1").unwrap();

        assert_eq!(cart.remove("p1"), 1);
        assert_eq!(cart.remove("p1"), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add("p1").unwrap();
        cart.remove("p1");
        cart.remove("p1");
        assert!(cart.is_empty());
        assert_eq!(cart.quantity("p1"), 0);

        let mut other = Cart::new();
        other.add("p2").unwrap();
        other.remove("nope");
        assert_eq!(other.quantity("p2"), 1);
    }

    #[test]
    fn test_remove_entirely() {
        let mut cart = Cart::new();
        for _ in 0..5 {
            cart.add("p1").unwrap();
        }
        cart.add("p2").unwrap();

        assert!(cart.remove_entirely("p1"));
        assert!(!cart.remove_entirely("p1"));
        assert_eq!(cart.entries().collect::<Vec<_>>(), vec![("p2", 1)]);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add("p1").unwrap();
        cart.add("p2").unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_quantity(), 0);
    }

    #[test]
    fn test_subtract_keeps_later_additions() {
        let mut sold = Cart::new();
        sold.add("p1").unwrap();
        sold.add("p2").unwrap();

        let mut cart = sold.clone();
        cart.add("p1").unwrap();
        cart.add("p3").unwrap();

        cart.subtract(&sold);
        assert_eq!(cart.entries().collect::<Vec<_>>(), vec![("p1", 1), ("p3", 1)]);

        cart.subtract(&cart.clone());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = Cart::new();
        for _ in 0..MAX_ITEM_QUANTITY {
            cart.add("p1").unwrap();
        }
        assert!(matches!(
            cart.add("p1"),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
        assert_eq!(cart.quantity("p1"), MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_distinct_item_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add(&format!("p{i}")).unwrap();
        }
        assert!(matches!(cart.add("one-too-many"), Err(CoreError::CartTooLarge { .. })));
        // existing entries can still grow
        assert_eq!(cart.add("p0").unwrap(), 2);
    }

    #[test]
    fn test_serializes_as_map() {
        let mut cart = Cart::new();
        cart.add("b").unwrap();
        cart.add("a").unwrap();
        cart.add("a").unwrap();
        assert_eq!(serde_json::to_string(&cart).unwrap(), r#"{"a":2,"b":1}"#);
    }
}
