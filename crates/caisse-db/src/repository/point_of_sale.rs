//! # Point-of-Sale Repository
//!
//! Stands belong to exactly one event. Deleting a stand only deactivates it
//! so that historical sales keep a valid reference.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use caisse_core::PointOfSale;

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct PointOfSaleRow {
    id: String,
    event_id: String,
    name: String,
    active: bool,
}

impl From<PointOfSaleRow> for PointOfSale {
    fn from(row: PointOfSaleRow) -> Self {
        PointOfSale {
            id: row.id,
            event_id: row.event_id,
            name: row.name,
            active: row.active,
        }
    }
}

/// Repository for point-of-sale database operations.
#[derive(Debug, Clone)]
pub struct PointOfSaleRepository {
    pool: SqlitePool,
}

impl PointOfSaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PointOfSaleRepository { pool }
    }

    /// Lists stands ordered by name, optionally restricted to one event.
    pub async fn list(
        &self,
        event_id: Option<&str>,
        include_inactive: bool,
    ) -> DbResult<Vec<PointOfSale>> {
        let rows = sqlx::query_as::<_, PointOfSaleRow>(
            r#"
            SELECT id, event_id, name, active
            FROM points_of_sale
            WHERE (?1 IS NULL OR event_id = ?1)
            AND (?2 OR active = 1)
            ORDER BY name
            "#,
        )
        .bind(event_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PointOfSale::from).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PointOfSale>> {
        let row = sqlx::query_as::<_, PointOfSaleRow>(
            "SELECT id, event_id, name, active FROM points_of_sale WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PointOfSale::from))
    }

    /// Inserts a stand. Fails with a foreign key violation if the event is unknown.
    pub async fn insert(&self, point_of_sale: &PointOfSale) -> DbResult<PointOfSale> {
        debug!(id = %point_of_sale.id, event_id = %point_of_sale.event_id, "Inserting point-of-sale");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO points_of_sale (id, event_id, name, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&point_of_sale.id)
        .bind(&point_of_sale.event_id)
        .bind(&point_of_sale.name)
        .bind(point_of_sale.active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(point_of_sale.clone())
    }

    pub async fn update(&self, point_of_sale: &PointOfSale) -> DbResult<()> {
        debug!(id = %point_of_sale.id, "Updating point-of-sale");

        let result = sqlx::query(
            r#"
            UPDATE points_of_sale SET event_id = ?2, name = ?3, active = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&point_of_sale.id)
        .bind(&point_of_sale.event_id)
        .bind(&point_of_sale.name)
        .bind(point_of_sale.active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PointOfSale", &point_of_sale.id));
        }
        Ok(())
    }

    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating point-of-sale");

        let result =
            sqlx::query("UPDATE points_of_sale SET active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PointOfSale", id));
        }
        Ok(())
    }
}
