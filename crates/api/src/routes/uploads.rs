//! Route definitions for image uploads.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::uploads;
use crate::state::AppState;

/// Routes mounted at `/uploads`.
///
/// ```text
/// POST   /trees/{id}/images  -> upload_tree_images (multipart)
/// GET    /trees/{id}/images  -> list_tree_images
/// DELETE /images/{id}        -> delete_tree_image (uploader or admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/trees/{id}/images",
            get(uploads::list_tree_images).post(uploads::upload_tree_images),
        )
        .route("/images/{id}", delete(uploads::delete_tree_image))
}
