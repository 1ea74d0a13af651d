//! # Event Repository
//!
//! Events are never hard-deleted: archiving keeps their sales reportable.

use chrono::{NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use caisse_core::{Event, EventStatus};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct EventRow {
    id: String,
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    location: String,
    status: EventStatus,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            location: row.location,
            status: row.status,
        }
    }
}

/// Repository for event database operations.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Creates a new EventRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    /// Lists events, most recent start date first.
    pub async fn list(&self, include_archived: bool) -> DbResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, name, start_date, end_date, location, status
            FROM events
            WHERE (?1 OR status = 'active')
            ORDER BY start_date DESC, name
            "#,
        )
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    /// Gets an event by ID, archived or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, name, start_date, end_date, location, status FROM events WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    pub async fn insert(&self, event: &Event) -> DbResult<Event> {
        debug!(id = %event.id, name = %event.name, "Inserting event");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO events (id, name, start_date, end_date, location, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location)
        .bind(event.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(event.clone())
    }

    pub async fn update(&self, event: &Event) -> DbResult<()> {
        debug!(id = %event.id, "Updating event");

        let result = sqlx::query(
            r#"
            UPDATE events SET
                name = ?2, start_date = ?3, end_date = ?4,
                location = ?5, status = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location)
        .bind(event.status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Event", &event.id));
        }
        Ok(())
    }

    /// Marks an event archived. Its stands and sales stay in place.
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Archiving event");

        let result =
            sqlx::query("UPDATE events SET status = 'archived', updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Event", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn event(id: &str, start: (i32, u32, u32)) -> Event {
        let day = NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap();
        Event {
            id: id.into(),
            name: format!("Event {id}"),
            start_date: day,
            end_date: day,
            location: "Lausanne".into(),
            status: EventStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_start_date_desc() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.events();
        repo.insert(&event("old", (2025, 12, 1))).await.unwrap();
        repo.insert(&event("new", (2026, 7, 1))).await.unwrap();

        let ids: Vec<String> = repo.list(true).await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_archive_hides_from_active_listing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.events();
        repo.insert(&event("e1", (2026, 7, 1))).await.unwrap();

        repo.archive("e1").await.unwrap();

        assert!(repo.list(false).await.unwrap().is_empty());
        let archived = repo.get_by_id("e1").await.unwrap().unwrap();
        assert_eq!(archived.status, EventStatus::Archived);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_event() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.events().update(&event("ghost", (2026, 1, 1))).await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
    }
}
