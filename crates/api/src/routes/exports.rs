//! Route definitions for CSV exports.

use axum::routing::get;
use axum::Router;

use crate::handlers::exports;
use crate::state::AppState;

/// Routes mounted at `/exports`.
///
/// ```text
/// GET /trees.csv                    -> export_trees_csv
/// GET /trees/{id}/measurements.csv  -> export_measurements_csv
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trees.csv", get(exports::export_trees_csv))
        .route(
            "/trees/{id}/measurements.csv",
            get(exports::export_measurements_csv),
        )
}
