//! # Session State
//!
//! The cashier's live session: cart, `(event, point-of-sale)` selection,
//! catalog cache and the checkout gate.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  startup ──► restore()                                                  │
//! │               ├── read pos.selectedEventId / pos.selectedPointOfSaleId  │
//! │               ├── drop ids that no longer exist, are archived/inactive  │
//! │               │   or don't belong together                              │
//! │               └── auto-select the first stand of the event              │
//! │                                                                         │
//! │  PUT /api/session/event ──► select ──► persist_selection()              │
//! │  DELETE /api/events/:id ──► forget ──► persist_selection()              │
//! │                                                                         │
//! │  POST /api/session/checkout ──► caisse_core::checkout(gate, session..)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! `PosSession` sits behind a `std::sync::Mutex`. Every accessor here takes
//! the lock in a synchronous closure, so it is never held across an `.await`.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use caisse_core::session::lock;
use caisse_core::{CheckoutGate, EventStatus, PosSession, Product, Scope, Selection};
use caisse_db::{Database, DbResult, SELECTED_EVENT_KEY, SELECTED_POINT_OF_SALE_KEY};

/// Shared handle to the single cashier session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    session: Arc<Mutex<PosSession>>,
    gate: Arc<CheckoutGate>,
}

impl SessionState {
    pub fn new(session: PosSession) -> Self {
        SessionState {
            session: Arc::new(Mutex::new(session)),
            gate: Arc::new(CheckoutGate::new()),
        }
    }

    /// Rebuilds the session from the persisted selection.
    pub async fn restore(db: &Database) -> DbResult<Self> {
        let settings = db.settings();
        let stored_event = settings.get(SELECTED_EVENT_KEY).await?;
        let stored_point = settings.get(SELECTED_POINT_OF_SALE_KEY).await?;

        let mut event_id = None;
        if let Some(id) = stored_event.as_deref() {
            match db.events().get_by_id(id).await? {
                Some(event) if event.status == EventStatus::Active => event_id = Some(event.id),
                _ => info!(event_id = %id, "Stored event is gone or archived, ignoring"),
            }
        }

        let mut point_of_sale_id = None;
        if let (Some(event), Some(id)) = (event_id.as_deref(), stored_point.as_deref()) {
            match db.points_of_sale().get_by_id(id).await? {
                Some(point) if point.active && point.event_id == event => {
                    point_of_sale_id = Some(point.id)
                }
                _ => info!(point_of_sale_id = %id, "Stored point-of-sale is no longer valid, ignoring"),
            }
        }

        let mut session = PosSession::new(Selection::restore(event_id.clone(), point_of_sale_id));
        if let Some(event) = event_id.as_deref() {
            let points = db.points_of_sale().list(Some(event), false).await?;
            session.auto_select_point_of_sale(&points);
        }

        let state = SessionState::new(session);
        let scope = state.scope();
        if scope.event_id != stored_event || scope.point_of_sale_id != stored_point {
            state.persist_selection(db).await?;
        }

        info!(
            event_id = ?scope.event_id,
            point_of_sale_id = ?scope.point_of_sale_id,
            "Session restored"
        );
        Ok(state)
    }

    /// Executes a function with read access to the session.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&PosSession) -> R,
    {
        let session = lock(&self.session);
        f(&session)
    }

    /// Executes a function with write access to the session.
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PosSession) -> R,
    {
        let mut session = lock(&self.session);
        f(&mut session)
    }

    pub fn scope(&self) -> Scope {
        self.with_session(|s| s.scope())
    }

    /// The mutex itself, for the checkout workflow.
    pub fn shared(&self) -> &Mutex<PosSession> {
        &self.session
    }

    pub fn gate(&self) -> &CheckoutGate {
        &self.gate
    }

    /// Writes the current selection to the settings table.
    pub async fn persist_selection(&self, db: &Database) -> DbResult<()> {
        let scope = self.scope();
        debug!(event_id = ?scope.event_id, point_of_sale_id = ?scope.point_of_sale_id, "Persisting selection");

        let settings = db.settings();
        settings
            .set_optional(SELECTED_EVENT_KEY, scope.event_id.as_deref())
            .await?;
        settings
            .set_optional(SELECTED_POINT_OF_SALE_KEY, scope.point_of_sale_id.as_deref())
            .await?;
        Ok(())
    }

    /// Catalog for the current scope, from the cache when it matches.
    ///
    /// A list loaded while the scope moved, or while an admin change
    /// invalidated the cache, is returned but not cached.
    pub async fn catalog(&self, db: &Database) -> DbResult<Vec<Product>> {
        let (scope, cached, generation) = self.with_session(|s| {
            let scope = s.scope();
            let cached = s.catalog.get(&scope).map(<[Product]>::to_vec);
            (scope, cached, s.catalog.generation())
        });
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let products = db
            .products()
            .list_for_scope(scope.event_id.as_deref(), scope.point_of_sale_id.as_deref())
            .await?;

        self.with_session_mut(|s| {
            if s.scope() == scope {
                s.catalog.store(generation, scope.clone(), products.clone());
            }
        });
        debug!(count = products.len(), "Catalog loaded");
        Ok(products)
    }

    /// Drops the cached catalog after an admin change.
    pub fn invalidate_catalog(&self) {
        self.with_session_mut(|s| s.catalog.invalidate());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_core::{Event, PointOfSale};
    use caisse_db::DbConfig;
    use chrono::NaiveDate;

    async fn db_with_event(status: EventStatus) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        db.events()
            .insert(&Event {
                id: "e1".into(),
                name: "Festival".into(),
                start_date: day,
                end_date: day,
                location: String::new(),
                status,
            })
            .await
            .unwrap();
        for (id, name) in [("s2", "Stand B"), ("s1", "Stand A")] {
            db.points_of_sale()
                .insert(&PointOfSale {
                    id: id.into(),
                    event_id: "e1".into(),
                    name: name.into(),
                    active: true,
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_restore_auto_selects_first_stand_by_name() {
        let db = db_with_event(EventStatus::Active).await;
        db.settings().set(SELECTED_EVENT_KEY, "e1").await.unwrap();

        let state = SessionState::restore(&db).await.unwrap();

        assert_eq!(state.scope(), Scope::new(Some("e1".into()), Some("s1".into())));
        assert_eq!(
            db.settings().get(SELECTED_POINT_OF_SALE_KEY).await.unwrap().as_deref(),
            Some("s1")
        );
    }

    #[tokio::test]
    async fn test_restore_drops_archived_event() {
        let db = db_with_event(EventStatus::Archived).await;
        db.settings().set(SELECTED_EVENT_KEY, "e1").await.unwrap();
        db.settings().set(SELECTED_POINT_OF_SALE_KEY, "s2").await.unwrap();

        let state = SessionState::restore(&db).await.unwrap();

        assert_eq!(state.scope(), Scope::default());
        assert_eq!(db.settings().get(SELECTED_EVENT_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_keeps_valid_stand() {
        let db = db_with_event(EventStatus::Active).await;
        db.settings().set(SELECTED_EVENT_KEY, "e1").await.unwrap();
        db.settings().set(SELECTED_POINT_OF_SALE_KEY, "s2").await.unwrap();

        let state = SessionState::restore(&db).await.unwrap();
        assert_eq!(state.scope().point_of_sale_id.as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn test_catalog_is_cached_per_scope() {
        let db = db_with_event(EventStatus::Active).await;
        let state = SessionState::new(PosSession::new(Selection::restore(
            Some("e1".into()),
            Some("s1".into()),
        )));

        assert!(state.catalog(&db).await.unwrap().is_empty());
        assert!(state.with_session(|s| s.catalog.is_cached()));

        state.invalidate_catalog();
        assert!(!state.with_session(|s| s.catalog.is_cached()));
    }
}
