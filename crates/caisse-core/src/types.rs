//! # Domain Types
//!
//! Core domain types used throughout Caisse.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Event       │◄──│  PointOfSale    │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name, location │   │  event_id (FK)  │   │  price (TTC)    │       │
//! │  │  start/end date │   │  name, active   │   │  tax_rate (%)   │       │
//! │  │  status         │   └─────────────────┘   │  point_of_sales │       │
//! │  └─────────────────┘                          └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │──►│  SaleLineItem   │   │    TaxRate      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  event, pos     │   │  product_id     │   │  percent        │       │
//! │  │  payment_mode   │   │  quantity       │   │  8.1 = 8.1 %    │       │
//! │  │  totals         │   │  price snapshot │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshots
//! A line item copies the product's price and tax rate at sale time. Later
//! catalog edits never change a recorded sale.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate expressed as a percentage (`8.1` means 8.1 %).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Creates a rate that is already a percentage.
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        TaxRate(percent)
    }

    /// Interprets a value typed by a user or sent by a client.
    ///
    /// Values up to and including 1 are fractions (`0.081` is 8.1 %),
    /// anything larger is already a percentage.
    ///
    /// ## Example
    /// ```rust
    /// use caisse_core::types::TaxRate;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(TaxRate::normalize(Decimal::new(77, 3)).percent(), Decimal::new(77, 1));
    /// assert_eq!(TaxRate::normalize(Decimal::new(77, 1)).percent(), Decimal::new(77, 1));
    /// ```
    pub fn normalize(entered: Decimal) -> Self {
        if entered <= Decimal::ONE {
            TaxRate(entered * Decimal::ONE_HUNDRED)
        } else {
            TaxRate(entered)
        }
    }

    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Payment Mode
// =============================================================================

/// How the customer paid. A label only: no gateway is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[serde(alias = "carte", alias = "CARD")]
    Card,
    #[serde(alias = "CASH", alias = "especes")]
    Cash,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Card => "card",
            PaymentMode::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" | "carte" => Ok(PaymentMode::Card),
            "cash" | "especes" => Ok(PaymentMode::Cash),
            other => Err(format!("unknown payment mode '{other}'")),
        }
    }
}

// =============================================================================
// Event
// =============================================================================

/// Lifecycle of an event. Archived events stay readable for history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    #[serde(alias = "actif")]
    Active,
    #[serde(alias = "archivé", alias = "archive")]
    Archived,
}

/// A dated happening (festival, market) where sales take place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub location: String,
    pub status: EventStatus,
}

impl Event {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }
}

// =============================================================================
// Point of Sale
// =============================================================================

/// A stand or till within an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PointOfSale {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub active: bool,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on exports.
    pub name: String,

    /// Shelf price, tax included.
    #[ts(type = "string")]
    pub unit_price_inclusive_tax: Decimal,

    /// Tax rate as a percentage (8.1 = 8.1 %).
    #[ts(type = "string")]
    pub tax_rate_percent: Decimal,

    /// Stock Keeping Unit - optional business identifier.
    pub sku: Option<String>,

    /// Opaque reference to an image, never interpreted.
    pub image_ref: Option<String>,

    /// Whether product is active (soft delete).
    pub active: bool,

    /// Points-of-sale this product is restricted to. Empty means everywhere.
    #[serde(default)]
    pub point_of_sale_ids: Vec<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_percent(self.tax_rate_percent)
    }

    /// Whether this product may be sold at the given point-of-sale.
    pub fn is_sold_at(&self, point_of_sale_id: &str) -> bool {
        self.point_of_sale_ids.is_empty()
            || self.point_of_sale_ids.iter().any(|id| id == point_of_sale_id)
    }
}

// =============================================================================
// Sale Line Item
// =============================================================================

/// One product × quantity within a sale, with price and rate snapshotted.
///
/// `line_subtotal_inclusive_tax == round2(unit_price_inclusive_tax * quantity)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    #[ts(type = "string")]
    pub unit_price_inclusive_tax: Decimal,
    #[ts(type = "string")]
    pub line_subtotal_inclusive_tax: Decimal,
    #[ts(type = "string")]
    pub tax_rate_percent: Decimal,
}

// =============================================================================
// Sale Totals
// =============================================================================

/// The three aggregate amounts carried by every sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    #[ts(type = "string")]
    pub total_inclusive_tax: Decimal,
    #[ts(type = "string")]
    pub total_exclusive_tax: Decimal,
    #[ts(type = "string")]
    pub total_tax_amount: Decimal,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,

    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,

    pub event_id: String,

    /// Required when point-of-sale scoping is enabled.
    pub point_of_sale_id: Option<String>,

    pub payment_mode: PaymentMode,

    #[ts(type = "string")]
    pub total_inclusive_tax: Decimal,

    #[ts(type = "string")]
    pub total_exclusive_tax: Decimal,

    #[ts(type = "string")]
    pub total_tax_amount: Decimal,

    pub lines: Vec<SaleLineItem>,
}

impl Sale {
    pub fn totals(&self) -> SaleTotals {
        SaleTotals {
            total_inclusive_tax: self.total_inclusive_tax,
            total_exclusive_tax: self.total_exclusive_tax,
            total_tax_amount: self.total_tax_amount,
        }
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tax_rate_normalization() {
        assert_eq!(TaxRate::normalize(dec!(0.077)).percent(), dec!(7.7));
        assert_eq!(TaxRate::normalize(dec!(7.7)).percent(), dec!(7.7));
        assert_eq!(TaxRate::normalize(dec!(0.081)).percent(), dec!(8.1));
        assert_eq!(TaxRate::normalize(dec!(0)).percent(), dec!(0));
        assert_eq!(TaxRate::normalize(dec!(2.5)).percent(), dec!(2.5));
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_percent(dec!(8.10)).to_string(), "8.1%");
    }

    #[test]
    fn test_payment_mode_aliases() {
        let card: PaymentMode = serde_json::from_str("\"carte\"").unwrap();
        assert_eq!(card, PaymentMode::Card);
        let card: PaymentMode = serde_json::from_str("\"card\"").unwrap();
        assert_eq!(card, PaymentMode::Card);
        assert_eq!("Cash".parse::<PaymentMode>().unwrap(), PaymentMode::Cash);
        assert!("cheque".parse::<PaymentMode>().is_err());
        assert_eq!(serde_json::to_string(&PaymentMode::Card).unwrap(), "\"card\"");
    }

    #[test]
    fn test_event_status_aliases() {
        let status: EventStatus = serde_json::from_str("\"archivé\"").unwrap();
        assert_eq!(status, EventStatus::Archived);
        let status: EventStatus = serde_json::from_str("\"actif\"").unwrap();
        assert_eq!(status, EventStatus::Active);
    }

    #[test]
    fn test_product_point_of_sale_restriction() {
        let now = Utc::now();
        let mut product = Product {
            id: "p1".into(),
            name: "Tote Bag".into(),
            unit_price_inclusive_tax: dec!(12),
            tax_rate_percent: dec!(8.1),
            sku: None,
            image_ref: None,
            active: true,
            point_of_sale_ids: vec![],
            created_at: now,
            updated_at: now,
        };
        assert!(product.is_sold_at("stand-a"));

        product.point_of_sale_ids = vec!["stand-b".into()];
        assert!(!product.is_sold_at("stand-a"));
        assert!(product.is_sold_at("stand-b"));
    }

    #[test]
    fn test_product_serializes_decimals_as_strings() {
        let now = Utc::now();
        let product = Product {
            id: "p1".into(),
            name: "Sticker Pack".into(),
            unit_price_inclusive_tax: dec!(5.00),
            tax_rate_percent: dec!(8.1),
            sku: Some("STICKERS".into()),
            image_ref: None,
            active: true,
            point_of_sale_ids: vec![],
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["unitPriceInclusiveTax"], "5.00");
        assert_eq!(json["taxRatePercent"], "8.1");
    }
}
