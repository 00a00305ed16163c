//! Route definitions for the `/trees` resource and nested measurements.

use axum::routing::get;
use axum::Router;

use crate::handlers::{measurements, trees};
use crate::state::AppState;

/// Routes mounted at `/trees`.
///
/// ```text
/// GET    /                            -> list_trees
/// POST   /                            -> create_tree (admin)
/// GET    /code/{code}                 -> get_tree_by_code
/// GET    /{id}                        -> get_tree
/// PUT    /{id}                        -> update_tree (admin)
/// DELETE /{id}?hard=                  -> delete_tree (admin)
/// GET    /{id}/measurements           -> list_measurements
/// POST   /{id}/measurements           -> add_measurement
/// GET    /{id}/measurements/latest    -> latest_measurement
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(trees::list_trees).post(trees::create_tree))
        .route("/code/{code}", get(trees::get_tree_by_code))
        .route(
            "/{id}",
            get(trees::get_tree)
                .put(trees::update_tree)
                .delete(trees::delete_tree),
        )
        .route(
            "/{id}/measurements",
            get(measurements::list_measurements).post(measurements::add_measurement),
        )
        .route(
            "/{id}/measurements/latest",
            get(measurements::latest_measurement),
        )
}
