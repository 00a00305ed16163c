//! Handlers for audit log querying and export (admin only).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use canopy_core::types::Timestamp;
use canopy_db::models::audit::{AuditLogPage, AuditQuery};
use canopy_db::repositories::AuditLogRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for `GET /audit/export`.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /audit
///
/// Query audit logs with filtering and pagination. Admin only.
pub async fn query_audit_logs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<ApiResponse<AuditLogPage>>> {
    let items = AuditLogRepo::query(&state.pool, &params).await?;
    let total = AuditLogRepo::count(&state.pool, &params).await?;
    Ok(Json(ApiResponse::ok(AuditLogPage { items, total })))
}

/// GET /audit/export?format=csv|json&from=X&to=Y
///
/// Export audit logs for a date range. Admin only. Defaults to the last
/// 30 days when no range is given.
pub async fn export_audit_logs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    let from = parse_timestamp(&params.from, Utc::now() - chrono::Duration::days(30))?;
    let to = parse_timestamp(&params.to, Utc::now())?;

    let logs = AuditLogRepo::export_range(&state.pool, from, to).await?;

    match params.format.as_deref().unwrap_or("json") {
        "csv" => {
            // Build CSV output.
            let mut csv_output =
                String::from("id,created_at,user_id,action,entity_type,entity_id\n");
            for log in &logs {
                csv_output.push_str(&format!(
                    "{},{},{},{},{},{}\n",
                    log.id,
                    log.created_at.to_rfc3339(),
                    log.user_id.map_or(String::new(), |id| id.to_string()),
                    log.action,
                    log.entity_type,
                    log.entity_id.map_or(String::new(), |id| id.to_string()),
                ));
            }

            Ok(axum::response::Response::builder()
                .header("Content-Type", "text/csv")
                .header(
                    "Content-Disposition",
                    "attachment; filename=\"audit-logs.csv\"",
                )
                .body(axum::body::Body::from(csv_output))
                .map_err(|e| AppError::InternalError(e.to_string()))?
                .into_response())
        }
        _ => {
            // Default: JSON export.
            Ok(Json(ApiResponse::ok(logs)).into_response())
        }
    }
}

/// Parse an optional RFC 3339 timestamp parameter, with a default.
fn parse_timestamp(value: &Option<String>, default: Timestamp) -> AppResult<Timestamp> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse::<Timestamp>()
            .map_err(|_| AppError::BadRequest(format!("Invalid timestamp '{raw}'"))),
    }
}
