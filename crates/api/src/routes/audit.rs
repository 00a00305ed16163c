//! Route definitions for audit log access.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Audit routes mounted at `/audit`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET /         -> query_audit_logs
/// GET /export   -> export_audit_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(audit::query_audit_logs))
        .route("/export", get(audit::export_audit_logs))
}
