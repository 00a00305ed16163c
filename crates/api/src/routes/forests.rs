//! Route definitions for the `/forests` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::forests;
use crate::state::AppState;

/// Routes mounted at `/forests`.
///
/// ```text
/// GET    /      -> list_forests
/// POST   /      -> create_forest (admin)
/// GET    /{id}  -> get_forest
/// PUT    /{id}  -> update_forest (admin)
/// DELETE /{id}  -> delete_forest (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(forests::list_forests).post(forests::create_forest),
        )
        .route(
            "/{id}",
            get(forests::get_forest)
                .put(forests::update_forest)
                .delete(forests::delete_forest),
        )
}
