//! Handlers for the dashboard aggregation endpoints.
//!
//! Every endpoint here is a thin wrapper over one declarative aggregation
//! query; there is no application-side computation.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use canopy_core::types::DbId;
use canopy_db::models::dashboard::{
    ForestComparison, HealthCount, LatestHeight, OverviewStats, SpeciesCount,
};
use canopy_db::repositories::DashboardRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::clamp_limit;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Optional forest scope shared by several dashboard endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestScopeParams {
    pub forest_id: Option<DbId>,
    pub limit: Option<i64>,
}

/// GET /dashboard/overview
pub async fn overview(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<OverviewStats>>> {
    let stats = DashboardRepo::overview(&state.pool).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /dashboard/species?forestId=
pub async fn species_distribution(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ForestScopeParams>,
) -> AppResult<Json<ApiResponse<Vec<SpeciesCount>>>> {
    let rows = DashboardRepo::species_distribution(&state.pool, params.forest_id).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /dashboard/health?forestId=
pub async fn health_distribution(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ForestScopeParams>,
) -> AppResult<Json<ApiResponse<Vec<HealthCount>>>> {
    let rows = DashboardRepo::health_distribution(&state.pool, params.forest_id).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /dashboard/heights?forestId=&limit=
pub async fn latest_heights(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ForestScopeParams>,
) -> AppResult<Json<ApiResponse<Vec<LatestHeight>>>> {
    let limit = clamp_limit(params.limit, 50, 500);
    let rows = DashboardRepo::latest_heights(&state.pool, params.forest_id, limit).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /dashboard/forests
pub async fn forest_comparison(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<ForestComparison>>>> {
    let rows = DashboardRepo::forest_comparison(&state.pool).await?;
    Ok(Json(ApiResponse::ok(rows)))
}
