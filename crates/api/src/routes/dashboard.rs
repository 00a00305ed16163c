//! Route definitions for the dashboard aggregation endpoints.

use axum::routing::get;
use axum::Router;

use crate::handlers::dashboard;
use crate::state::AppState;

/// Routes mounted at `/dashboard`.
///
/// ```text
/// GET /overview  -> overview
/// GET /species   -> species_distribution
/// GET /health    -> health_distribution
/// GET /heights   -> latest_heights
/// GET /forests   -> forest_comparison
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(dashboard::overview))
        .route("/species", get(dashboard::species_distribution))
        .route("/health", get(dashboard::health_distribution))
        .route("/heights", get(dashboard::latest_heights))
        .route("/forests", get(dashboard::forest_comparison))
}
