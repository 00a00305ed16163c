//! Handlers for per-tree measurements (append-only).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use canopy_core::error::CoreError;
use canopy_core::health::HealthStatus;
use canopy_core::types::DbId;
use canopy_db::models::audit::CreateAuditLog;
use canopy_db::models::measurement::{CreateMeasurement, Measurement};
use canopy_db::repositories::{AuditLogRepo, MeasurementRepo, TreeRepo};
use canopy_events::DomainEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{clamp_limit, clamp_offset, PaginationParams, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /trees/{id}/measurements
///
/// List a tree's measurements in measurement order.
pub async fn list_measurements(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(tree_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Vec<Measurement>>>> {
    if TreeRepo::find_by_id(&state.pool, tree_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Tree",
            id: tree_id,
        }));
    }

    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = clamp_offset(params.offset);

    let measurements = MeasurementRepo::list_for_tree(&state.pool, tree_id, limit, offset).await?;
    Ok(Json(ApiResponse::ok(measurements)))
}

/// POST /trees/{id}/measurements
///
/// Append a measurement to a tree. Any authenticated user may record one.
pub async fn add_measurement(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(tree_id): Path<DbId>,
    Json(input): Json<CreateMeasurement>,
) -> AppResult<(StatusCode, Json<ApiResponse<Measurement>>)> {
    let tree = TreeRepo::find_by_id(&state.pool, tree_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Tree",
            id: tree_id,
        }))?;

    if input.height_m.is_none()
        && input.diameter_cm.is_none()
        && input.health.is_none()
        && input.co2_absorbed_kg.is_none()
        && input.notes.is_none()
    {
        return Err(AppError::Core(CoreError::Validation(
            "At least one measurement value is required".into(),
        )));
    }
    if let Some(ref health) = input.health {
        HealthStatus::from_str_value(health)
            .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    }
    if input.height_m.is_some_and(|h| h < 0.0) || input.diameter_cm.is_some_and(|d| d < 0.0) {
        return Err(AppError::Core(CoreError::Validation(
            "Measurement values must not be negative".into(),
        )));
    }

    let measurement =
        MeasurementRepo::insert(&state.pool, tree_id, Some(auth.user_id), &input).await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(auth.user_id),
            action: "measurement_added".to_string(),
            entity_type: "tree".to_string(),
            entity_id: Some(tree_id),
            details_json: Some(serde_json::json!({"measurementId": measurement.id})),
        },
    )
    .await?;

    state.event_bus.publish(
        DomainEvent::new("measurement.added")
            .with_entity("tree", tree_id)
            .with_actor(auth.user_id)
            .with_forest(tree.forest_id),
    );

    tracing::info!(
        user_id = auth.user_id,
        tree_id,
        measurement_id = measurement.id,
        "Measurement recorded"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(measurement))))
}

/// GET /trees/{id}/measurements/latest
///
/// The most recent measurement for a tree, if any.
pub async fn latest_measurement(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(tree_id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Option<Measurement>>>> {
    if TreeRepo::find_by_id(&state.pool, tree_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Tree",
            id: tree_id,
        }));
    }

    let latest = MeasurementRepo::latest_for_tree(&state.pool, tree_id).await?;
    Ok(Json(ApiResponse::ok(latest)))
}
