//! Route definitions for the bulk write endpoints.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::bulk;
use crate::state::AppState;

/// Routes mounted at `/bulk`.
///
/// All routes require authentication; hard delete additionally requires
/// the admin role (checked in the handler before any data is read).
///
/// ```text
/// POST   /trees/create       -> bulk_create_trees
/// PUT    /trees/update       -> bulk_update_trees
/// DELETE /trees/delete       -> bulk_delete_trees
/// POST   /measurements/add   -> bulk_add_measurements
/// GET    /operations/status  -> bulk_operations_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trees/create", post(bulk::bulk_create_trees))
        .route("/trees/update", put(bulk::bulk_update_trees))
        .route("/trees/delete", delete(bulk::bulk_delete_trees))
        .route("/measurements/add", post(bulk::bulk_add_measurements))
        .route("/operations/status", get(bulk::bulk_operations_status))
}
