//! # Sale Repository
//!
//! Database operations for sales and their lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── insert() → header + lines in one transaction                   │
//! │                                                                         │
//! │  2. HISTORY                                                            │
//! │     └── list(event?, point_of_sale?) → newest first                    │
//! │                                                                         │
//! │  3. (OPTIONAL) EDIT                                                    │
//! │     └── replace() → header updated, lines swapped wholesale            │
//! │                                                                         │
//! │  4. (OPTIONAL) DELETE                                                  │
//! │     └── delete() → lines cascade                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A sale is never visible without its lines: every write that touches both
//! runs inside a single transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use caisse_core::{PaymentMode, Sale, SaleLineItem};

use crate::error::{DbError, DbResult};
use crate::repository::parse_decimal;

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    timestamp: DateTime<Utc>,
    event_id: String,
    point_of_sale_id: Option<String>,
    payment_mode: PaymentMode,
    total_inclusive_tax: String,
    total_exclusive_tax: String,
    total_tax_amount: String,
}

impl SaleRow {
    fn into_sale(self, lines: Vec<SaleLineItem>) -> DbResult<Sale> {
        Ok(Sale {
            total_inclusive_tax: parse_decimal("sales.total_inclusive_tax", &self.total_inclusive_tax)?,
            total_exclusive_tax: parse_decimal("sales.total_exclusive_tax", &self.total_exclusive_tax)?,
            total_tax_amount: parse_decimal("sales.total_tax_amount", &self.total_tax_amount)?,
            id: self.id,
            timestamp: self.timestamp,
            event_id: self.event_id,
            point_of_sale_id: self.point_of_sale_id,
            payment_mode: self.payment_mode,
            lines,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: String,
    sale_id: String,
    product_id: String,
    quantity: i64,
    unit_price_inclusive_tax: String,
    line_subtotal_inclusive_tax: String,
    tax_rate_percent: String,
}

impl TryFrom<LineRow> for SaleLineItem {
    type Error = DbError;

    fn try_from(row: LineRow) -> DbResult<Self> {
        Ok(SaleLineItem {
            unit_price_inclusive_tax: parse_decimal(
                "sale_lines.unit_price_inclusive_tax",
                &row.unit_price_inclusive_tax,
            )?,
            line_subtotal_inclusive_tax: parse_decimal(
                "sale_lines.line_subtotal_inclusive_tax",
                &row.line_subtotal_inclusive_tax,
            )?,
            tax_rate_percent: parse_decimal("sale_lines.tax_rate_percent", &row.tax_rate_percent)?,
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            quantity: row.quantity,
        })
    }
}

const SALE_COLUMNS: &str = "s.id, s.timestamp, s.event_id, s.point_of_sale_id, s.payment_mode, \
     s.total_inclusive_tax, s.total_exclusive_tax, s.total_tax_amount";

const LINE_COLUMNS: &str = "l.id, l.sale_id, l.product_id, l.quantity, \
     l.unit_price_inclusive_tax, l.line_subtotal_inclusive_tax, l.tax_rate_percent";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a sale and all its lines atomically.
    pub async fn insert(&self, sale: &Sale) -> DbResult<Sale> {
        debug!(
            id = %sale.id,
            event_id = %sale.event_id,
            lines = sale.lines.len(),
            total = %sale.total_inclusive_tax,
            "Inserting sale"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, timestamp, event_id, point_of_sale_id, payment_mode,
                total_inclusive_tax, total_exclusive_tax, total_tax_amount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.timestamp)
        .bind(&sale.event_id)
        .bind(&sale.point_of_sale_id)
        .bind(sale.payment_mode)
        .bind(sale.total_inclusive_tax.to_string())
        .bind(sale.total_exclusive_tax.to_string())
        .bind(sale.total_tax_amount.to_string())
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, &sale.lines).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(sale.clone())
    }

    /// Gets a sale with its lines, in entry order.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales s WHERE s.id = ?1");
        let Some(row) = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines l WHERE l.sale_id = ?1 ORDER BY l.position"
        );
        let lines = sqlx::query_as::<_, LineRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(SaleLineItem::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Some(row.into_sale(lines)?))
    }

    /// Lists sales newest first, filtered by event and/or point-of-sale.
    pub async fn list(
        &self,
        event_id: Option<&str>,
        point_of_sale_id: Option<&str>,
    ) -> DbResult<Vec<Sale>> {
        debug!(?event_id, ?point_of_sale_id, "Listing sales");

        let filter = "(?1 IS NULL OR s.event_id = ?1) AND (?2 IS NULL OR s.point_of_sale_id = ?2)";

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales s WHERE {filter} ORDER BY s.timestamp DESC, s.id"
        );
        let rows = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(event_id)
            .bind(point_of_sale_id)
            .fetch_all(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines l JOIN sales s ON s.id = l.sale_id \
             WHERE {filter} ORDER BY l.sale_id, l.position"
        );
        let line_rows = sqlx::query_as::<_, LineRow>(&sql)
            .bind(event_id)
            .bind(point_of_sale_id)
            .fetch_all(&self.pool)
            .await?;

        let mut lines_by_sale: HashMap<String, Vec<SaleLineItem>> = HashMap::new();
        for row in line_rows {
            let line = SaleLineItem::try_from(row)?;
            lines_by_sale.entry(line.sale_id.clone()).or_default().push(line);
        }

        rows.into_iter()
            .map(|row| {
                let lines = lines_by_sale.remove(&row.id).unwrap_or_default();
                row.into_sale(lines)
            })
            .collect()
    }

    /// Overwrites an edited sale: header fields and the full line set.
    pub async fn replace(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, lines = sale.lines.len(), "Replacing sale");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                payment_mode = ?2,
                total_inclusive_tax = ?3,
                total_exclusive_tax = ?4,
                total_tax_amount = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(sale.payment_mode)
        .bind(sale.total_inclusive_tax.to_string())
        .bind(sale.total_exclusive_tax.to_string())
        .bind(sale.total_tax_amount.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?1")
            .bind(&sale.id)
            .execute(&mut *tx)
            .await?;

        insert_lines(&mut tx, &sale.lines).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Deletes a sale and its lines.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn insert_lines(tx: &mut Transaction<'_, Sqlite>, lines: &[SaleLineItem]) -> DbResult<()> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, position, product_id, quantity,
                unit_price_inclusive_tax, line_subtotal_inclusive_tax, tax_rate_percent
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_inclusive_tax.to_string())
        .bind(line.line_subtotal_inclusive_tax.to_string())
        .bind(line.tax_rate_percent.to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use caisse_core::history::{apply_edit, assemble_sale, LineDraft, SaleEdit};
    use caisse_core::{Event, EventStatus, PointOfSale, Product};
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        for id in ["e1", "e2"] {
            db.events()
                .insert(&Event {
                    id: id.into(),
                    name: id.into(),
                    start_date: day,
                    end_date: day,
                    location: String::new(),
                    status: EventStatus::Active,
                })
                .await
                .unwrap();
        }
        db.points_of_sale()
            .insert(&PointOfSale {
                id: "s1".into(),
                event_id: "e1".into(),
                name: "Bar".into(),
                active: true,
            })
            .await
            .unwrap();
        for (id, price, rate) in [("p1", dec!(25.00), dec!(8.1)), ("p2", dec!(8.00), dec!(2.6))] {
            let now = Utc::now();
            db.products()
                .insert(&Product {
                    id: id.into(),
                    name: id.into(),
                    unit_price_inclusive_tax: price,
                    tax_rate_percent: rate,
                    sku: None,
                    image_ref: None,
                    active: true,
                    point_of_sale_ids: vec![],
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        db
    }

    fn draft(product_id: &str, quantity: i64, price: rust_decimal::Decimal) -> LineDraft {
        LineDraft {
            product_id: product_id.into(),
            quantity,
            unit_price_inclusive_tax: price,
            tax_rate_percent: dec!(8.1),
        }
    }

    fn sale_at(event: &str, pos: Option<&str>, hour: u32) -> Sale {
        let at = Utc.with_ymd_and_hms(2026, 7, 1, hour, 0, 0).unwrap();
        assemble_sale(event, pos, PaymentMode::Card, &[draft("p1", 2, dec!(25.00))], at).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_with_lines() {
        let db = seeded().await;
        let at = Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap();
        let sale = assemble_sale(
            "e1",
            Some("s1"),
            PaymentMode::Cash,
            &[draft("p1", 2, dec!(25.00)), draft("p2", 1, dec!(8.00))],
            at,
        )
        .unwrap();

        db.sales().insert(&sale).await.unwrap();

        let loaded = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded, sale);
        assert_eq!(loaded.lines[0].product_id, "p1");
        assert_eq!(loaded.lines[1].product_id, "p2");
        assert_eq!(loaded.total_inclusive_tax, dec!(58.00));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let db = seeded().await;
        let repo = db.sales();
        let early = sale_at("e1", Some("s1"), 9);
        let late = sale_at("e1", None, 15);
        let other = sale_at("e2", None, 12);
        for sale in [&early, &late, &other] {
            repo.insert(sale).await.unwrap();
        }

        let e1: Vec<String> = repo.list(Some("e1"), None).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(e1, vec![late.id.clone(), early.id.clone()]);

        let at_stand = repo.list(Some("e1"), Some("s1")).await.unwrap();
        assert_eq!(at_stand.len(), 1);
        assert_eq!(at_stand[0].lines.len(), 1);

        assert_eq!(repo.list(None, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_replace_swaps_lines() {
        let db = seeded().await;
        let sale = sale_at("e1", Some("s1"), 10);
        db.sales().insert(&sale).await.unwrap();

        let edited = apply_edit(
            &sale,
            &SaleEdit {
                lines: vec![draft("p2", 3, dec!(8.00))],
                payment_mode: Some(PaymentMode::Cash),
            },
        )
        .unwrap();
        db.sales().replace(&edited).await.unwrap();

        let loaded = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.payment_mode, PaymentMode::Cash);
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.total_inclusive_tax, dec!(24.00));
        assert_eq!(loaded.timestamp, sale.timestamp);
    }

    #[tokio::test]
    async fn test_delete_removes_lines() {
        let db = seeded().await;
        let sale = sale_at("e1", None, 10);
        db.sales().insert(&sale).await.unwrap();

        db.sales().delete(&sale.id).await.unwrap();

        assert!(db.sales().get_by_id(&sale.id).await.unwrap().is_none());
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_lines")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(db.sales().delete(&sale.id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_insert_rolls_back_on_bad_line() {
        let db = seeded().await;
        let mut sale = sale_at("e1", None, 10);
        let mut bad = sale.lines[0].clone();
        bad.id = "bad-line".into();
        bad.product_id = "unknown-product".into();
        sale.lines.push(bad);

        assert!(db.sales().insert(&sale).await.is_err());
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }
}
