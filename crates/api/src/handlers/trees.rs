//! Handlers for the `/trees` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use canopy_core::error::CoreError;
use canopy_core::geo::validate_coordinates;
use canopy_core::types::DbId;
use canopy_db::models::audit::CreateAuditLog;
use canopy_db::models::measurement::Measurement;
use canopy_db::models::tree::{CreateTree, Tree, TreeFilter, UpdateTree};
use canopy_db::repositories::{
    AuditLogRepo, ForestRepo, MeasurementRepo, TreeImageRepo, TreeRepo,
};
use canopy_events::DomainEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::{clamp_limit, clamp_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /trees` and the CSV export.
///
/// Spelled out flat (no nested filter struct) because query strings carry
/// no structure; [`into_filter`](Self::into_filter) converts to the
/// repository's [`TreeFilter`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQueryParams {
    pub forest_id: Option<DbId>,
    pub species: Option<String>,
    pub is_alive: Option<bool>,
    pub planted_after: Option<chrono::NaiveDate>,
    pub planted_before: Option<chrono::NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TreeQueryParams {
    pub fn into_filter(self) -> TreeFilter {
        TreeFilter {
            forest_id: self.forest_id,
            forest_ids: None,
            species: self.species,
            is_alive: self.is_alive,
            planted_after: self.planted_after,
            planted_before: self.planted_before,
        }
    }
}

/// Paginated tree listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreePage {
    pub items: Vec<Tree>,
    pub total: i64,
}

/// A tree enriched with its most recent measurement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDetail {
    #[serde(flatten)]
    pub tree: Tree,
    pub latest_measurement: Option<Measurement>,
}

/// Query parameters for `DELETE /trees/{id}`.
#[derive(Debug, Deserialize)]
pub struct DeleteTreeParams {
    /// Permanently remove the row (and deactivate its images) instead of
    /// soft-deleting.
    #[serde(default)]
    pub hard: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /trees
///
/// List active trees with filtering and pagination.
pub async fn list_trees(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TreeQueryParams>,
) -> AppResult<Json<ApiResponse<TreePage>>> {
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = clamp_offset(params.offset);
    let filter = params.into_filter();

    let items = TreeRepo::list(&state.pool, &filter, limit, offset).await?;
    let total = TreeRepo::count(&state.pool, &filter).await?;

    Ok(Json(ApiResponse::ok(TreePage { items, total })))
}

/// GET /trees/{id}
///
/// Get a tree with its latest measurement.
pub async fn get_tree(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<TreeDetail>>> {
    let tree = TreeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Tree", id }))?;

    let latest_measurement = MeasurementRepo::latest_for_tree(&state.pool, id).await?;

    Ok(Json(ApiResponse::ok(TreeDetail {
        tree,
        latest_measurement,
    })))
}

/// GET /trees/code/{code}
///
/// Look a tree up by its human-facing tree code.
pub async fn get_tree_by_code(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<TreeDetail>>> {
    let tree = TreeRepo::find_by_code(&state.pool, &code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tree with code '{code}' not found")))?;

    let latest_measurement = MeasurementRepo::latest_for_tree(&state.pool, tree.id).await?;

    Ok(Json(ApiResponse::ok(TreeDetail {
        tree,
        latest_measurement,
    })))
}

/// POST /trees
///
/// Create a tree (admin only).
pub async fn create_tree(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTree>,
) -> AppResult<(StatusCode, Json<ApiResponse<Tree>>)> {
    if input.species.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Species is required".into(),
        )));
    }
    validate_coordinates(input.latitude, input.longitude)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    if !ForestRepo::exists_active(&state.pool, input.forest_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Forest",
            id: input.forest_id,
        }));
    }

    let tree = TreeRepo::create(&state.pool, &input).await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "tree_created".to_string(),
            entity_type: "tree".to_string(),
            entity_id: Some(tree.id),
            details_json: Some(serde_json::json!({
                "treeCode": tree.tree_code,
                "species": tree.species,
                "forestId": tree.forest_id,
            })),
        },
    )
    .await?;

    state.event_bus.publish(
        DomainEvent::new("tree.created")
            .with_entity("tree", tree.id)
            .with_actor(admin.user_id)
            .with_forest(tree.forest_id),
    );

    tracing::info!(user_id = admin.user_id, tree_id = tree.id, "Tree created");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(tree))))
}

/// PUT /trees/{id}
///
/// Update a tree (admin only).
pub async fn update_tree(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTree>,
) -> AppResult<Json<ApiResponse<Tree>>> {
    if let (Some(lat), Some(lon)) = (input.latitude, input.longitude) {
        validate_coordinates(lat, lon)
            .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    }
    if let Some(forest_id) = input.forest_id {
        if !ForestRepo::exists_active(&state.pool, forest_id).await? {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Forest",
                id: forest_id,
            }));
        }
    }

    let tree = TreeRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Tree", id }))?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "tree_updated".to_string(),
            entity_type: "tree".to_string(),
            entity_id: Some(id),
            details_json: None,
        },
    )
    .await?;

    state.event_bus.publish(
        DomainEvent::new("tree.updated")
            .with_entity("tree", id)
            .with_actor(admin.user_id)
            .with_forest(tree.forest_id),
    );

    Ok(Json(ApiResponse::ok(tree)))
}

/// DELETE /trees/{id}?hard=true|false
///
/// Soft-delete by default. A hard delete permanently removes the row and
/// deactivates every image owned by the tree, all in one transaction.
/// Both variants are admin-only.
pub async fn delete_tree(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<DeleteTreeParams>,
) -> AppResult<Json<ApiResponse<()>>> {
    let tree = TreeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Tree", id }))?;

    if params.hard {
        let mut tx = state.pool.begin().await?;

        let images_deactivated = TreeImageRepo::deactivate_for_trees(&mut tx, &[id]).await?;
        TreeRepo::bulk_hard_delete(&mut tx, &[id]).await?;
        AuditLogRepo::insert(
            &mut tx,
            &CreateAuditLog {
                user_id: Some(admin.user_id),
                action: "tree_hard_deleted".to_string(),
                entity_type: "tree".to_string(),
                entity_id: Some(id),
                details_json: Some(serde_json::json!({
                    "treeCode": tree.tree_code,
                    "imagesDeactivated": images_deactivated,
                })),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = admin.user_id,
            tree_id = id,
            images_deactivated,
            "Tree hard-deleted"
        );
    } else {
        let deleted = TreeRepo::soft_delete(&state.pool, id, admin.user_id).await?;
        if !deleted {
            return Err(AppError::Core(CoreError::NotFound { entity: "Tree", id }));
        }

        let mut conn = state.pool.acquire().await?;
        AuditLogRepo::insert(
            &mut conn,
            &CreateAuditLog {
                user_id: Some(admin.user_id),
                action: "tree_deleted".to_string(),
                entity_type: "tree".to_string(),
                entity_id: Some(id),
                details_json: None,
            },
        )
        .await?;

        tracing::info!(user_id = admin.user_id, tree_id = id, "Tree soft-deleted");
    }

    state.event_bus.publish(
        DomainEvent::new("tree.deleted")
            .with_entity("tree", id)
            .with_actor(admin.user_id)
            .with_forest(tree.forest_id),
    );

    Ok(Json(ApiResponse::message("Tree deleted")))
}
