//! The bulk write orchestrator.
//!
//! All four operations share the same shape: validate the batch exhaustively
//! (collecting every row error), open one transaction, apply the mutation and
//! its cascades, write exactly one audit record, commit, and only then fan
//! out notifications. A failure anywhere inside the transactional section
//! persists nothing; a failed fan-out never fails the request.
//!
//! Selections are capped at 1000 affected rows. Exceeding the cap is a
//! client error, never a partial application.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use canopy_core::bulk::{
    apply_tree_defaults, group_measurements_by_tree, validate_batch_size,
    validate_measurement_rows, validate_tree_rows, NewMeasurementRow, NewTreeRow, MAX_BULK_ROWS,
};
use canopy_core::error::CoreError;
use canopy_core::types::DbId;
use canopy_db::models::audit::{BulkActionSummary, CreateAuditLog};
use canopy_db::models::tree::{BulkTreeUpdates, Tree, TreeFilter};
use canopy_db::repositories::{
    AuditLogRepo, ForestRepo, MeasurementRepo, TreeImageRepo, TreeRepo,
};
use canopy_events::DomainEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Message returned when a bulk selection resolves to zero trees.
const NO_MATCH_MESSAGE: &str = "No trees found matching the criteria";

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /bulk/trees/create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateRequest {
    pub trees: Vec<NewTreeRow>,
    /// Default forest applied to rows that name none.
    pub forest_id: Option<DbId>,
    /// Skip per-row requirement checks (species, forest, coordinates).
    #[serde(default)]
    pub skip_validation: bool,
}

/// Request body for `PUT /bulk/trees/update`.
///
/// Selection is either an explicit id list or a filter, never both.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    pub tree_ids: Option<Vec<DbId>>,
    pub filter: Option<TreeFilter>,
    pub updates: BulkTreeUpdates,
}

/// Request body for `DELETE /bulk/trees/delete`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub tree_ids: Option<Vec<DbId>>,
    pub filter: Option<TreeFilter>,
    /// Permanently remove rows instead of soft-deleting. Admin only.
    #[serde(default)]
    pub hard_delete: bool,
}

/// Request body for `POST /bulk/measurements/add`.
#[derive(Debug, Deserialize)]
pub struct BulkMeasurementsRequest {
    pub measurements: Vec<NewMeasurementRow>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Response body for a successful bulk create.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateResponse {
    pub created_trees: Vec<Tree>,
    pub summary: BulkCreateSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateSummary {
    pub total_created: usize,
    pub forest_id: Option<DbId>,
}

/// Response body for a successful bulk update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResponse {
    pub tree_ids: Vec<DbId>,
    pub summary: BulkUpdateSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateSummary {
    pub total_updated: u64,
    pub measurements_added: u64,
}

/// Response body for a successful bulk delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub tree_ids: Vec<DbId>,
    pub summary: BulkDeleteSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteSummary {
    pub total_deleted: u64,
    pub hard_delete: bool,
    pub images_deactivated: u64,
}

/// Response body for a successful bulk measurement append.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMeasurementsResponse {
    pub summary: BulkMeasurementsSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMeasurementsSummary {
    pub total_measurements: u64,
    pub trees_affected: usize,
}

/// Response body for the bulk operation status endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusResponse {
    pub since: canopy_core::types::Timestamp,
    pub operations: Vec<BulkActionSummary>,
}

// ---------------------------------------------------------------------------
// POST /bulk/trees/create
// ---------------------------------------------------------------------------

/// Batch tree insert: all rows or none.
pub async fn bulk_create_trees(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkCreateRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BulkCreateResponse>>)> {
    validate_batch_size(body.trees.len(), "trees").map_err(AppError::BadRequest)?;

    // Inject batch-level defaults before validating.
    let mut rows = body.trees;
    apply_tree_defaults(&mut rows, body.forest_id, chrono::Utc::now().date_naive());

    if !body.skip_validation {
        let errors = validate_tree_rows(&rows);
        if !errors.is_empty() {
            return Err(AppError::batch_validation(
                format!("Validation failed for {} of {} rows", row_count(&errors), rows.len()),
                errors,
            ));
        }
    }

    let mut tx = state.pool.begin().await?;

    // Every referenced forest must exist and be active; one lookup.
    let mut forest_ids: Vec<DbId> = rows.iter().filter_map(|r| r.forest_id).collect();
    forest_ids.sort_unstable();
    forest_ids.dedup();
    let missing = ForestRepo::missing_active_ids(&mut tx, &forest_ids).await?;
    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "Forests not found or inactive: {}",
            join_ids(&missing)
        )));
    }

    let created = TreeRepo::bulk_insert(&mut tx, &rows).await?;

    AuditLogRepo::insert(
        &mut tx,
        &CreateAuditLog {
            user_id: Some(auth.user_id),
            action: "bulk_create_trees".to_string(),
            entity_type: "tree".to_string(),
            entity_id: None,
            details_json: Some(serde_json::json!({
                "count": created.len(),
                "forestId": body.forest_id,
            })),
        },
    )
    .await?;

    tx.commit().await?;

    // Post-commit fan-out: one event per tree plus one batch summary.
    for tree in &created {
        state.event_bus.publish(
            DomainEvent::new("tree.created")
                .with_entity("tree", tree.id)
                .with_actor(auth.user_id)
                .with_forest(tree.forest_id),
        );
    }
    state.event_bus.publish(
        DomainEvent::new("tree.bulk_created")
            .with_actor(auth.user_id)
            .with_payload(serde_json::json!({"count": created.len()})),
    );

    tracing::info!(
        user_id = auth.user_id,
        count = created.len(),
        "Bulk tree create committed"
    );

    let total_created = created.len();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            format!("{total_created} trees created"),
            BulkCreateResponse {
                created_trees: created,
                summary: BulkCreateSummary {
                    total_created,
                    forest_id: body.forest_id,
                },
            },
        )),
    ))
}

// ---------------------------------------------------------------------------
// PUT /bulk/trees/update
// ---------------------------------------------------------------------------

/// Batch tree update: one multi-row UPDATE plus optional per-tree
/// measurement appends, as a single unit.
pub async fn bulk_update_trees(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkUpdateRequest>,
) -> AppResult<Json<ApiResponse<BulkUpdateResponse>>> {
    if body.updates.is_empty() {
        return Err(AppError::BadRequest(
            "No updates provided".to_string(),
        ));
    }
    if let Some(ref species) = body.updates.species {
        if species.trim().is_empty() {
            return Err(AppError::Core(CoreError::Validation(
                "Species must not be empty".into(),
            )));
        }
    }
    if let Some(ref row) = body.updates.add_measurement {
        if !row.has_any_value() {
            return Err(AppError::Core(CoreError::Validation(
                "addMeasurement requires at least one measurement value".into(),
            )));
        }
    }

    let mut tx = state.pool.begin().await?;

    if let Some(forest_id) = body.updates.forest_id {
        let missing = ForestRepo::missing_active_ids(&mut tx, &[forest_id]).await?;
        if !missing.is_empty() {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Forest",
                id: forest_id,
            }));
        }
    }

    // Resolve the selection to concrete trees first, for the audit record
    // and the per-document notifications.
    let trees = resolve_selection(&mut tx, body.tree_ids, body.filter).await?;
    let ids: Vec<DbId> = trees.iter().map(|t| t.id).collect();

    let updated = if body.updates.has_column_updates() {
        TreeRepo::bulk_update(&mut tx, &ids, &body.updates).await?
    } else {
        ids.len() as u64
    };

    // A measurement append is an INSERT per selected tree, never an
    // overwrite; repeating the call appends again by design.
    let mut measurements_added = 0u64;
    if let Some(ref row) = body.updates.add_measurement {
        for tree in &trees {
            measurements_added += MeasurementRepo::bulk_append(
                &mut tx,
                tree.id,
                Some(auth.user_id),
                std::slice::from_ref(row),
            )
            .await?;
        }
    }

    AuditLogRepo::insert(
        &mut tx,
        &CreateAuditLog {
            user_id: Some(auth.user_id),
            action: "bulk_update_trees".to_string(),
            entity_type: "tree".to_string(),
            entity_id: None,
            details_json: Some(serde_json::json!({
                "count": ids.len(),
                "treeIds": ids,
                "measurementsAdded": measurements_added,
            })),
        },
    )
    .await?;

    tx.commit().await?;

    for tree in &trees {
        state.event_bus.publish(
            DomainEvent::new("tree.updated")
                .with_entity("tree", tree.id)
                .with_actor(auth.user_id)
                .with_forest(tree.forest_id),
        );
    }
    state.event_bus.publish(
        DomainEvent::new("tree.bulk_updated")
            .with_actor(auth.user_id)
            .with_payload(serde_json::json!({"count": ids.len()})),
    );

    tracing::info!(
        user_id = auth.user_id,
        count = ids.len(),
        measurements_added,
        "Bulk tree update committed"
    );

    Ok(Json(ApiResponse::with_message(
        format!("{} trees updated", ids.len()),
        BulkUpdateResponse {
            tree_ids: ids,
            summary: BulkUpdateSummary {
                total_updated: updated,
                measurements_added,
            },
        },
    )))
}

// ---------------------------------------------------------------------------
// DELETE /bulk/trees/delete
// ---------------------------------------------------------------------------

/// Batch soft/hard delete. Hard delete requires the admin role, checked
/// before any selection is read, and deactivates the deleted trees' images
/// inside the same transaction.
pub async fn bulk_delete_trees(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> AppResult<Json<ApiResponse<BulkDeleteResponse>>> {
    if body.hard_delete && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Hard delete requires the admin role".into(),
        )));
    }

    let mut tx = state.pool.begin().await?;

    let trees = resolve_selection(&mut tx, body.tree_ids, body.filter).await?;
    let ids: Vec<DbId> = trees.iter().map(|t| t.id).collect();

    let (deleted, images_deactivated) = if body.hard_delete {
        let images = TreeImageRepo::deactivate_for_trees(&mut tx, &ids).await?;
        let deleted = TreeRepo::bulk_hard_delete(&mut tx, &ids).await?;
        (deleted, images)
    } else {
        let deleted = TreeRepo::bulk_soft_delete(&mut tx, &ids, auth.user_id).await?;
        (deleted, 0)
    };

    AuditLogRepo::insert(
        &mut tx,
        &CreateAuditLog {
            user_id: Some(auth.user_id),
            action: "bulk_delete_trees".to_string(),
            entity_type: "tree".to_string(),
            entity_id: None,
            details_json: Some(serde_json::json!({
                "count": deleted,
                "treeIds": ids,
                "hardDelete": body.hard_delete,
                "imagesDeactivated": images_deactivated,
            })),
        },
    )
    .await?;

    tx.commit().await?;

    for tree in &trees {
        state.event_bus.publish(
            DomainEvent::new("tree.deleted")
                .with_entity("tree", tree.id)
                .with_actor(auth.user_id)
                .with_forest(tree.forest_id),
        );
    }
    state.event_bus.publish(
        DomainEvent::new("tree.bulk_deleted")
            .with_actor(auth.user_id)
            .with_payload(serde_json::json!({
                "count": deleted,
                "hardDelete": body.hard_delete,
            })),
    );

    tracing::info!(
        user_id = auth.user_id,
        count = deleted,
        hard_delete = body.hard_delete,
        images_deactivated,
        "Bulk tree delete committed"
    );

    Ok(Json(ApiResponse::with_message(
        format!("{deleted} trees deleted"),
        BulkDeleteResponse {
            tree_ids: ids,
            summary: BulkDeleteSummary {
                total_deleted: deleted,
                hard_delete: body.hard_delete,
                images_deactivated,
            },
        },
    )))
}

// ---------------------------------------------------------------------------
// POST /bulk/measurements/add
// ---------------------------------------------------------------------------

/// Batch measurement append, grouped so each tree receives one INSERT
/// carrying all of its new measurements.
pub async fn bulk_add_measurements(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkMeasurementsRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BulkMeasurementsResponse>>)> {
    validate_batch_size(body.measurements.len(), "measurements").map_err(AppError::BadRequest)?;

    let errors = validate_measurement_rows(&body.measurements);
    if !errors.is_empty() {
        return Err(AppError::batch_validation(
            format!(
                "Validation failed for {} of {} rows",
                row_count(&errors),
                body.measurements.len()
            ),
            errors,
        ));
    }

    let groups = group_measurements_by_tree(body.measurements);
    let tree_ids: Vec<DbId> = groups.iter().map(|(id, _)| *id).collect();

    let mut tx = state.pool.begin().await?;

    // Verify every referenced tree exists and is active in one lookup.
    let found = TreeRepo::fetch_active_by_ids(&mut tx, &tree_ids).await?;
    if found.len() != tree_ids.len() {
        let missing = missing_ids(&tree_ids, &found);
        return Err(AppError::NotFound(format!(
            "Trees not found or inactive: {}",
            join_ids(&missing)
        )));
    }

    let mut total_measurements = 0u64;
    for (tree_id, rows) in &groups {
        total_measurements +=
            MeasurementRepo::bulk_append(&mut tx, *tree_id, Some(auth.user_id), rows).await?;
    }

    AuditLogRepo::insert(
        &mut tx,
        &CreateAuditLog {
            user_id: Some(auth.user_id),
            action: "bulk_add_measurements".to_string(),
            entity_type: "tree".to_string(),
            entity_id: None,
            details_json: Some(serde_json::json!({
                "count": total_measurements,
                "treesAffected": tree_ids.len(),
            })),
        },
    )
    .await?;

    tx.commit().await?;

    for tree in &found {
        state.event_bus.publish(
            DomainEvent::new("measurement.added")
                .with_entity("tree", tree.id)
                .with_actor(auth.user_id)
                .with_forest(tree.forest_id),
        );
    }
    state.event_bus.publish(
        DomainEvent::new("measurement.bulk_added")
            .with_actor(auth.user_id)
            .with_payload(serde_json::json!({
                "count": total_measurements,
                "treesAffected": tree_ids.len(),
            })),
    );

    tracing::info!(
        user_id = auth.user_id,
        count = total_measurements,
        trees = tree_ids.len(),
        "Bulk measurement append committed"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            format!("{total_measurements} measurements added"),
            BulkMeasurementsResponse {
                summary: BulkMeasurementsSummary {
                    total_measurements,
                    trees_affected: tree_ids.len(),
                },
            },
        )),
    ))
}

// ---------------------------------------------------------------------------
// GET /bulk/operations/status
// ---------------------------------------------------------------------------

/// Summary of bulk-operation audit entries from the last 24 hours.
pub async fn bulk_operations_status(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BulkStatusResponse>>> {
    let since = chrono::Utc::now() - chrono::Duration::hours(24);
    let operations = AuditLogRepo::bulk_actions_since(&state.pool, since).await?;
    Ok(Json(ApiResponse::ok(BulkStatusResponse { since, operations })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve a bulk selection (explicit ids or filter) to concrete active
/// trees, enforcing the batch ceiling.
///
/// - No selection at all is a 400.
/// - An id list over the ceiling is a 400 before any query runs.
/// - Zero matches is a 404 with [`NO_MATCH_MESSAGE`].
/// - A filter matching more than the ceiling is a 400.
async fn resolve_selection(
    tx: &mut sqlx::PgConnection,
    tree_ids: Option<Vec<DbId>>,
    filter: Option<TreeFilter>,
) -> Result<Vec<Tree>, AppError> {
    let trees = match (tree_ids, filter) {
        (Some(ids), _) => {
            validate_batch_size(ids.len(), "trees").map_err(AppError::BadRequest)?;
            TreeRepo::fetch_active_by_ids(tx, &ids).await?
        }
        (None, Some(filter)) => {
            let matches =
                TreeRepo::fetch_active_by_filter(tx, &filter, (MAX_BULK_ROWS + 1) as i64).await?;
            if matches.len() > MAX_BULK_ROWS {
                return Err(AppError::BadRequest(format!(
                    "Maximum {MAX_BULK_ROWS} trees per bulk operation; narrow the filter"
                )));
            }
            matches
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either treeIds or filter is required".to_string(),
            ));
        }
    };

    if trees.is_empty() {
        return Err(AppError::NotFound(NO_MATCH_MESSAGE.to_string()));
    }

    Ok(trees)
}

/// Number of distinct row indexes covered by an error list.
fn row_count(errors: &[canopy_core::bulk::RowError]) -> usize {
    let mut indexes: Vec<usize> = errors.iter().map(|e| e.index).collect();
    indexes.sort_unstable();
    indexes.dedup();
    indexes.len()
}

/// Of `wanted`, the ids that are absent from `found`.
fn missing_ids(wanted: &[DbId], found: &[Tree]) -> Vec<DbId> {
    wanted
        .iter()
        .copied()
        .filter(|id| !found.iter().any(|t| t.id == *id))
        .collect()
}

/// Comma-join ids for an error message.
fn join_ids(ids: &[DbId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
