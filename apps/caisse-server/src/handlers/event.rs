//! # Event Handlers
//!
//! Event CRUD. Deleting an event archives it; if it was the selected event,
//! the selection is cleared and persisted.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use caisse_core::validation::{validate_date_range, validate_name};
use caisse_core::{Event, EventStatus, ValidationError};

use crate::error::{ApiError, ApiResult};
use crate::handlers::reject_if_any;
use crate::state::{DbState, SessionState};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    #[serde(default, alias = "include_archived")]
    pub include_archived: bool,
}

/// Create/update payload. On update, absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "start_date")]
    pub start_date: Option<NaiveDate>,
    /// Defaults to the start date for one-day events.
    #[serde(default, alias = "end_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<EventStatus>,
}

impl EventInput {
    fn into_event(self, existing: Option<Event>) -> Result<Event, ApiError> {
        let mut errors = Vec::new();

        let name = match (self.name, &existing) {
            (Some(name), _) => validate_name("name", &name).map_err(|e| errors.push(e)).ok(),
            (None, Some(event)) => Some(event.name.clone()),
            (None, None) => {
                errors.push(ValidationError::Required {
                    field: "name".to_string(),
                });
                None
            }
        };

        let start_date = self.start_date.or(existing.as_ref().map(|e| e.start_date));
        if start_date.is_none() {
            errors.push(ValidationError::Required {
                field: "startDate".to_string(),
            });
        }

        let end_date = self
            .end_date
            .or(existing.as_ref().map(|e| e.end_date))
            .or(start_date);
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if let Err(e) = validate_date_range(start, end) {
                errors.push(e);
            }
        }

        reject_if_any(errors)?;

        let (Some(name), Some(start_date), Some(end_date)) = (name, start_date, end_date) else {
            return Err(ApiError::internal("Event validation left a field unset"));
        };

        Ok(Event {
            id: existing
                .as_ref()
                .map(|e| e.id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name,
            start_date,
            end_date,
            location: self
                .location
                .map(|l| l.trim().to_string())
                .or_else(|| existing.as_ref().map(|e| e.location.clone()))
                .unwrap_or_default(),
            status: self
                .status
                .or(existing.as_ref().map(|e| e.status))
                .unwrap_or_default(),
        })
    }
}

/// `GET /api/events` (newest start date first)
pub async fn list_events(
    State(db): State<DbState>,
    Query(query): Query<EventQuery>,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(db.inner().events().list(query.include_archived).await?))
}

/// `GET /api/events/:id`
pub async fn get_event(
    State(db): State<DbState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Event>> {
    let event = db
        .inner()
        .events()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event", &id))?;
    Ok(Json(event))
}

/// `POST /api/events`
pub async fn create_event(
    State(db): State<DbState>,
    Json(input): Json<EventInput>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = input.into_event(None)?;
    let event = db.inner().events().insert(&event).await?;

    info!(id = %event.id, name = %event.name, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// `PUT /api/events/:id`
pub async fn update_event(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    Path(id): Path<String>,
    Json(input): Json<EventInput>,
) -> ApiResult<Json<Event>> {
    let existing = db
        .inner()
        .events()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event", &id))?;

    let event = input.into_event(Some(existing))?;
    db.inner().events().update(&event).await?;

    if event.status == EventStatus::Archived {
        forget_selected_event(&db, &session, &event.id).await?;
    }

    info!(id = %event.id, "Event updated");
    Ok(Json(event))
}

/// `DELETE /api/events/:id` (archive)
pub async fn delete_event(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    db.inner().events().archive(&id).await?;
    forget_selected_event(&db, &session, &id).await?;

    info!(id = %id, "Event archived");
    Ok(StatusCode::NO_CONTENT)
}

async fn forget_selected_event(
    db: &DbState,
    session: &SessionState,
    event_id: &str,
) -> ApiResult<()> {
    let change = session.with_session_mut(|s| s.forget_event(event_id));
    if change.scope_changed {
        session.persist_selection(db.inner()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, d).unwrap()
    }

    #[test]
    fn test_one_day_event_defaults_end_date() {
        let event = EventInput {
            name: Some(" Festival Été ".into()),
            start_date: Some(day(3)),
            ..EventInput::default()
        }
        .into_event(None)
        .unwrap();

        assert_eq!(event.name, "Festival Été");
        assert_eq!(event.end_date, day(3));
        assert_eq!(event.status, EventStatus::Active);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let err = EventInput {
            name: Some("Festival".into()),
            start_date: Some(day(5)),
            end_date: Some(day(3)),
            ..EventInput::default()
        }
        .into_event(None)
        .unwrap_err();

        assert_eq!(err.fields, vec!["endDate"]);
    }

    #[test]
    fn test_missing_name_and_start_reported_together() {
        let err = EventInput::default().into_event(None).unwrap_err();
        assert_eq!(err.fields, vec!["name", "startDate"]);
    }
}
