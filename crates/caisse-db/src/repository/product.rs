//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Scoped Listing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  product_points_of_sale links        list_for_scope(E1, S1)             │
//! │  ─────────────────────────           ──────────────────────             │
//! │  T-shirt  → (none)                   T-shirt   ✓ (sold everywhere)      │
//! │  Vinyle   → S1                       Vinyle    ✓                        │
//! │  Affiche  → S2                       Affiche   ✗                        │
//! │                                                                         │
//! │  Scope (E1, none): products linked to any stand of E1, plus unlinked   │
//! │  Scope (none, none): every active product                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use caisse_core::Product;

use crate::error::{DbError, DbResult};
use crate::repository::parse_decimal;

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.unit_price_inclusive_tax, p.tax_rate_percent, \
     p.sku, p.image_ref, p.active, p.created_at, p.updated_at";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    unit_price_inclusive_tax: String,
    tax_rate_percent: String,
    sku: Option<String>,
    image_ref: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, point_of_sale_ids: Vec<String>) -> DbResult<Product> {
        Ok(Product {
            unit_price_inclusive_tax: parse_decimal(
                "products.unit_price_inclusive_tax",
                &self.unit_price_inclusive_tax,
            )?,
            tax_rate_percent: parse_decimal("products.tax_rate_percent", &self.tax_rate_percent)?,
            id: self.id,
            name: self.name,
            sku: self.sku,
            image_ref: self.image_ref,
            active: self.active,
            point_of_sale_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Active products sellable in the given scope, ordered by name.
    ///
    /// A point-of-sale narrows more than an event; with neither, every
    /// active product is returned.
    pub async fn list_for_scope(
        &self,
        event_id: Option<&str>,
        point_of_sale_id: Option<&str>,
    ) -> DbResult<Vec<Product>> {
        debug!(?event_id, ?point_of_sale_id, "Listing products for scope");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            WHERE p.active = 1
            AND (
                NOT EXISTS (SELECT 1 FROM product_points_of_sale l WHERE l.product_id = p.id)
                OR (?2 IS NOT NULL AND EXISTS (
                    SELECT 1 FROM product_points_of_sale l
                    WHERE l.product_id = p.id AND l.point_of_sale_id = ?2
                ))
                OR (?2 IS NULL AND ?1 IS NOT NULL AND EXISTS (
                    SELECT 1 FROM product_points_of_sale l
                    JOIN points_of_sale s ON s.id = l.point_of_sale_id
                    WHERE l.product_id = p.id AND s.event_id = ?1
                ))
                OR (?1 IS NULL AND ?2 IS NULL)
            )
            ORDER BY p.name
            "#
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(event_id)
            .bind(point_of_sale_id)
            .fetch_all(&self.pool)
            .await?;

        let products = self.attach_links(rows).await?;
        debug!(count = products.len(), "Scoped listing returned products");
        Ok(products)
    }

    /// All products for the admin screen, ordered by name.
    pub async fn list_all(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE (?1 OR p.active = 1) ORDER BY p.name"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        self.attach_links(rows).await
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_links(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Inserts a new product (id generated beforehand) with its stand links.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, unit_price_inclusive_tax, tax_rate_percent,
                sku, image_ref, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.unit_price_inclusive_tax.to_string())
        .bind(product.tax_rate_percent.to_string())
        .bind(&product.sku)
        .bind(&product.image_ref)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        replace_links(&mut tx, &product.id, &product.point_of_sale_ids).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(product.clone())
    }

    /// Updates an existing product, replacing its stand links.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                unit_price_inclusive_tax = ?3,
                tax_rate_percent = ?4,
                sku = ?5,
                image_ref = ?6,
                active = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.unit_price_inclusive_tax.to_string())
        .bind(product.tax_rate_percent.to_string())
        .bind(&product.sku)
        .bind(&product.image_ref)
        .bind(product.active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        replace_links(&mut tx, &product.id, &product.point_of_sale_ids).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Soft-deletes a product by setting active = false.
    ///
    /// Recorded sales keep referencing it.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn attach_links(&self, rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let links: Vec<(String, String)> = sqlx::query_as(
            "SELECT product_id, point_of_sale_id FROM product_points_of_sale ORDER BY point_of_sale_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<String, Vec<String>> = HashMap::new();
        for (product_id, point_of_sale_id) in links {
            by_product.entry(product_id).or_default().push(point_of_sale_id);
        }

        rows.into_iter()
            .map(|row| {
                let ids = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(ids)
            })
            .collect()
    }
}

async fn replace_links(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    point_of_sale_ids: &[String],
) -> DbResult<()> {
    sqlx::query("DELETE FROM product_points_of_sale WHERE product_id = ?1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    for point_of_sale_id in point_of_sale_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO product_points_of_sale (product_id, point_of_sale_id) VALUES (?1, ?2)",
        )
        .bind(product_id)
        .bind(point_of_sale_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use caisse_core::{Event, EventStatus, PointOfSale};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn product(name: &str, stands: &[&str]) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            name: name.to_string(),
            unit_price_inclusive_tax: dec!(25.00),
            tax_rate_percent: dec!(8.1),
            sku: None,
            image_ref: None,
            active: true,
            point_of_sale_ids: stands.iter().map(|s| s.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn db_with_stands() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        for event_id in ["e1", "e2"] {
            db.events()
                .insert(&Event {
                    id: event_id.into(),
                    name: event_id.to_uppercase(),
                    start_date: day,
                    end_date: day,
                    location: String::new(),
                    status: EventStatus::Active,
                })
                .await
                .unwrap();
        }
        for (id, event_id) in [("s1", "e1"), ("s2", "e1"), ("s3", "e2")] {
            db.points_of_sale()
                .insert(&PointOfSale {
                    id: id.into(),
                    event_id: event_id.into(),
                    name: id.to_uppercase(),
                    active: true,
                })
                .await
                .unwrap();
        }
        db
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip_decimals() {
        let db = db_with_stands().await;
        let mut p = product("Affiche A3", &["s1"]);
        p.unit_price_inclusive_tax = dec!(8.00);
        p.tax_rate_percent = dec!(2.6);
        p.sku = Some("POSTER-A3".into());
        db.products().insert(&p).await.unwrap();

        let loaded = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(loaded.unit_price_inclusive_tax, dec!(8.00));
        assert_eq!(loaded.tax_rate_percent, dec!(2.6));
        assert_eq!(loaded.sku.as_deref(), Some("POSTER-A3"));
        assert_eq!(loaded.point_of_sale_ids, vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn test_list_for_scope() {
        let db = db_with_stands().await;
        let repo = db.products();
        repo.insert(&product("T-shirt", &[])).await.unwrap();
        repo.insert(&product("Vinyle", &["s1"])).await.unwrap();
        repo.insert(&product("Affiche", &["s2"])).await.unwrap();
        repo.insert(&product("Casquette", &["s3"])).await.unwrap();

        let at_s1 = repo.list_for_scope(Some("e1"), Some("s1")).await.unwrap();
        assert_eq!(names(&at_s1), vec!["T-shirt", "Vinyle"]);

        let at_e1 = repo.list_for_scope(Some("e1"), None).await.unwrap();
        assert_eq!(names(&at_e1), vec!["Affiche", "T-shirt", "Vinyle"]);

        let everywhere = repo.list_for_scope(None, None).await.unwrap();
        assert_eq!(everywhere.len(), 4);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_listing() {
        let db = db_with_stands().await;
        let repo = db.products();
        let p = product("Sticker Pack", &[]);
        repo.insert(&p).await.unwrap();

        repo.soft_delete(&p.id).await.unwrap();

        assert!(repo.list_for_scope(None, None).await.unwrap().is_empty());
        assert_eq!(repo.list_all(true).await.unwrap().len(), 1);
        assert!(!repo.get_by_id(&p.id).await.unwrap().unwrap().active);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_links() {
        let db = db_with_stands().await;
        let repo = db.products();
        let mut p = product("Tote Bag", &["s1"]);
        repo.insert(&p).await.unwrap();

        p.point_of_sale_ids = vec!["s2".into(), "s3".into()];
        p.unit_price_inclusive_tax = dec!(12.00);
        repo.update(&p).await.unwrap();

        let loaded = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(loaded.point_of_sale_ids, vec!["s2".to_string(), "s3".to_string()]);
        assert_eq!(loaded.unit_price_inclusive_tax, dec!(12.00));
    }

    #[tokio::test]
    async fn test_missing_product_errors() {
        let db = db_with_stands().await;
        assert!(matches!(
            db.products().soft_delete("nope").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(db.products().get_by_id("nope").await.unwrap().is_none());
    }
}
