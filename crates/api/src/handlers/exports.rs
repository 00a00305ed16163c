//! CSV export endpoints for trees and measurements.
//!
//! CSV is assembled by string building; values that may contain commas or
//! quotes are quoted and escaped.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use canopy_core::error::CoreError;
use canopy_core::types::DbId;
use canopy_db::repositories::{MeasurementRepo, TreeRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::trees::TreeQueryParams;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Row ceiling for exports; a filter matching more is rejected rather than
/// silently truncated.
const MAX_EXPORT_ROWS: i64 = 100_000;

/// GET /exports/trees.csv
///
/// Export active trees as CSV, honoring the same filters as `GET /trees`.
pub async fn export_trees_csv(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TreeQueryParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter();
    let total = TreeRepo::count(&state.pool, &filter).await?;
    if total > MAX_EXPORT_ROWS {
        return Err(AppError::BadRequest(format!(
            "Export would contain {total} rows (limit {MAX_EXPORT_ROWS}); narrow the filter"
        )));
    }

    let trees = TreeRepo::list(&state.pool, &filter, MAX_EXPORT_ROWS, 0).await?;

    let mut csv_output = String::from(
        "id,tree_code,forest_id,species,planted_at,died_at,is_alive,latitude,longitude,created_at\n",
    );
    for tree in &trees {
        csv_output.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            tree.id,
            csv_escape(&tree.tree_code),
            tree.forest_id,
            csv_escape(&tree.species),
            tree.planted_at,
            tree.died_at.map_or(String::new(), |d| d.to_string()),
            tree.is_alive,
            tree.latitude,
            tree.longitude,
            tree.created_at.to_rfc3339(),
        ));
    }

    csv_response(csv_output, "trees.csv")
}

/// GET /exports/trees/{id}/measurements.csv
///
/// Export one tree's measurement history as CSV, in measurement order.
pub async fn export_measurements_csv(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(tree_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if TreeRepo::find_by_id(&state.pool, tree_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Tree",
            id: tree_id,
        }));
    }

    let measurements =
        MeasurementRepo::list_for_tree(&state.pool, tree_id, MAX_EXPORT_ROWS, 0).await?;

    let mut csv_output = String::from(
        "id,tree_id,height_m,diameter_cm,health,co2_absorbed_kg,notes,measured_at\n",
    );
    for m in &measurements {
        csv_output.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            m.id,
            m.tree_id,
            m.height_m.map_or(String::new(), |v| v.to_string()),
            m.diameter_cm.map_or(String::new(), |v| v.to_string()),
            m.health.as_deref().unwrap_or(""),
            m.co2_absorbed_kg.map_or(String::new(), |v| v.to_string()),
            csv_escape(m.notes.as_deref().unwrap_or("")),
            m.measured_at.to_rfc3339(),
        ));
    }

    csv_response(csv_output, "measurements.csv")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Quote a CSV value when it contains a delimiter, quote, or newline.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Build a `text/csv` attachment response.
fn csv_response(
    csv_output: String,
    filename: &str,
) -> AppResult<axum::response::Response> {
    Ok(axum::response::Response::builder()
        .header("Content-Type", "text/csv")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        )
        .body(axum::body::Body::from(csv_output))
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .into_response())
}
