//! Handlers for the `/forests` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use canopy_core::error::CoreError;
use canopy_core::geo::validate_coordinates;
use canopy_core::types::DbId;
use canopy_db::models::audit::CreateAuditLog;
use canopy_db::models::forest::{CreateForest, Forest, UpdateForest};
use canopy_db::repositories::{AuditLogRepo, ForestRepo};
use canopy_events::DomainEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeInactiveParams;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /forests
///
/// List forests; `?includeInactive=true` also returns soft-deleted ones.
pub async fn list_forests(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<ApiResponse<Vec<Forest>>>> {
    let forests = ForestRepo::list(&state.pool, params.include_inactive).await?;
    Ok(Json(ApiResponse::ok(forests)))
}

/// GET /forests/{id}
pub async fn get_forest(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Forest>>> {
    let forest = ForestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Forest", id }))?;
    Ok(Json(ApiResponse::ok(forest)))
}

/// POST /forests
///
/// Create a forest (admin only).
pub async fn create_forest(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateForest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Forest>>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Forest name is required".into(),
        )));
    }
    validate_coordinates(input.latitude, input.longitude)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    if input.area <= 0.0 {
        return Err(AppError::Core(CoreError::Validation(
            "Area must be positive".into(),
        )));
    }

    let forest = ForestRepo::create(&state.pool, &input).await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "forest_created".to_string(),
            entity_type: "forest".to_string(),
            entity_id: Some(forest.id),
            details_json: Some(serde_json::json!({"name": forest.name, "region": forest.region})),
        },
    )
    .await?;

    state.event_bus.publish(
        DomainEvent::new("forest.created")
            .with_entity("forest", forest.id)
            .with_actor(admin.user_id)
            .with_forest(forest.id),
    );

    tracing::info!(user_id = admin.user_id, forest_id = forest.id, "Forest created");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(forest))))
}

/// PUT /forests/{id}
///
/// Update a forest (admin only).
pub async fn update_forest(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateForest>,
) -> AppResult<Json<ApiResponse<Forest>>> {
    if let (Some(lat), Some(lon)) = (input.latitude, input.longitude) {
        validate_coordinates(lat, lon)
            .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    }

    let forest = ForestRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Forest", id }))?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "forest_updated".to_string(),
            entity_type: "forest".to_string(),
            entity_id: Some(id),
            details_json: None,
        },
    )
    .await?;

    state.event_bus.publish(
        DomainEvent::new("forest.updated")
            .with_entity("forest", id)
            .with_actor(admin.user_id)
            .with_forest(id),
    );

    Ok(Json(ApiResponse::ok(forest)))
}

/// DELETE /forests/{id}
///
/// Soft-delete a forest (admin only). Trees keep their forest reference.
pub async fn delete_forest(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    let deleted = ForestRepo::soft_delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound { entity: "Forest", id }));
    }

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "forest_deleted".to_string(),
            entity_type: "forest".to_string(),
            entity_id: Some(id),
            details_json: None,
        },
    )
    .await?;

    state.event_bus.publish(
        DomainEvent::new("forest.deleted")
            .with_entity("forest", id)
            .with_actor(admin.user_id)
            .with_forest(id),
    );

    tracing::info!(user_id = admin.user_id, forest_id = id, "Forest soft-deleted");

    Ok(Json(ApiResponse::message("Forest deleted")))
}
