//! # Point-of-Sale Handlers
//!
//! Stand CRUD. A stand is created inside an existing event; deleting it only
//! deactivates it and clears it from the selection.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use caisse_core::validation::validate_name;
use caisse_core::{PointOfSale, ValidationError};

use crate::error::{ApiError, ApiResult};
use crate::handlers::{non_blank, reject_if_any};
use crate::state::{DbState, SessionState};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfSaleQuery {
    #[serde(default, alias = "event_id")]
    pub event_id: Option<String>,
    #[serde(default, alias = "include_inactive")]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfSaleInput {
    #[serde(default, alias = "event_id")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// `GET /api/points-of-sale` (by name, optional `eventId`)
pub async fn list_points_of_sale(
    State(db): State<DbState>,
    Query(query): Query<PointOfSaleQuery>,
) -> ApiResult<Json<Vec<PointOfSale>>> {
    let points = db
        .inner()
        .points_of_sale()
        .list(non_blank(query.event_id.as_deref()), query.include_inactive)
        .await?;
    Ok(Json(points))
}

/// `GET /api/points-of-sale/:id`
pub async fn get_point_of_sale(
    State(db): State<DbState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PointOfSale>> {
    let point = db
        .inner()
        .points_of_sale()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("PointOfSale", &id))?;
    Ok(Json(point))
}

/// `POST /api/points-of-sale`
pub async fn create_point_of_sale(
    State(db): State<DbState>,
    Json(input): Json<PointOfSaleInput>,
) -> ApiResult<(StatusCode, Json<PointOfSale>)> {
    let mut errors = Vec::new();

    let event_id = non_blank(input.event_id.as_deref()).map(str::to_string);
    if event_id.is_none() {
        errors.push(ValidationError::Required {
            field: "eventId".to_string(),
        });
    }
    let name = match input.name.as_deref() {
        Some(name) => validate_name("name", name).map_err(|e| errors.push(e)).ok(),
        None => {
            errors.push(ValidationError::Required {
                field: "name".to_string(),
            });
            None
        }
    };
    reject_if_any(errors)?;

    let (Some(event_id), Some(name)) = (event_id, name) else {
        return Err(ApiError::internal("Point-of-sale validation left a field unset"));
    };

    if db.inner().events().get_by_id(&event_id).await?.is_none() {
        return Err(ApiError::from(ValidationError::InvalidFormat {
            field: "eventId".to_string(),
            reason: format!("unknown event '{event_id}'"),
        }));
    }

    let point = PointOfSale {
        id: Uuid::new_v4().to_string(),
        event_id,
        name,
        active: input.active.unwrap_or(true),
    };
    let point = db.inner().points_of_sale().insert(&point).await?;

    info!(id = %point.id, event_id = %point.event_id, "Point-of-sale created");
    Ok((StatusCode::CREATED, Json(point)))
}

/// `PUT /api/points-of-sale/:id`
pub async fn update_point_of_sale(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    Path(id): Path<String>,
    Json(input): Json<PointOfSaleInput>,
) -> ApiResult<Json<PointOfSale>> {
    let mut point = db
        .inner()
        .points_of_sale()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("PointOfSale", &id))?;

    if let Some(name) = input.name.as_deref() {
        point.name = validate_name("name", name)?;
    }
    if let Some(event_id) = non_blank(input.event_id.as_deref()) {
        point.event_id = event_id.to_string();
    }
    if let Some(active) = input.active {
        point.active = active;
    }

    db.inner().points_of_sale().update(&point).await?;

    let selected_elsewhere = session.with_session(|s| {
        s.selection.point_of_sale_id() == Some(point.id.as_str())
            && s.selection.event_id() != Some(point.event_id.as_str())
    });
    if !point.active || selected_elsewhere {
        forget_selected_point(&db, &session, &point.id).await?;
    } else {
        session.invalidate_catalog();
    }

    info!(id = %point.id, "Point-of-sale updated");
    Ok(Json(point))
}

/// `DELETE /api/points-of-sale/:id` (deactivate)
pub async fn delete_point_of_sale(
    State(db): State<DbState>,
    State(session): State<SessionState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    db.inner().points_of_sale().soft_delete(&id).await?;
    forget_selected_point(&db, &session, &id).await?;

    info!(id = %id, "Point-of-sale deactivated");
    Ok(StatusCode::NO_CONTENT)
}

async fn forget_selected_point(
    db: &DbState,
    session: &SessionState,
    point_of_sale_id: &str,
) -> ApiResult<()> {
    let change = session.with_session_mut(|s| s.forget_point_of_sale(point_of_sale_id));
    if change.scope_changed {
        session.persist_selection(db.inner()).await?;
    }
    Ok(())
}
