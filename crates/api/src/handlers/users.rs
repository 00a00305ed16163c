//! Handlers for admin user management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use canopy_core::error::CoreError;
use canopy_core::roles::{ROLE_ADMIN, ROLE_USER};
use canopy_core::types::DbId;
use canopy_db::models::audit::CreateAuditLog;
use canopy_db::models::user::{CreateUser, UpdateUser, UserResponse};
use canopy_db::repositories::{AuditLogRepo, SessionRepo, UserRepo};

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for creating a user as admin (role may be set).
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

/// Request body for resetting a user's password.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// Reject role strings outside the known set.
fn validate_role(role: &str) -> Result<(), AppError> {
    if role != ROLE_USER && role != ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Invalid role '{role}'. Valid roles: {ROLE_USER}, {ROLE_ADMIN}"
        ))));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /users
///
/// List all users (admin only).
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool).await?;
    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(ApiResponse::ok(users)))
}

/// GET /users/{id}
///
/// Get a single user by ID (admin only).
pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(Json(ApiResponse::ok(UserResponse::from(user))))
}

/// POST /users
///
/// Create a user with an explicit role (admin only).
pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let role = input.role.unwrap_or_else(|| ROLE_USER.to_string());
    validate_role(&role)?;
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            password_hash,
            role,
        },
    )
    .await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "user_created".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(user.id),
            details_json: Some(serde_json::json!({"username": user.username, "role": user.role})),
        },
    )
    .await?;

    tracing::info!(admin_id = admin.user_id, user_id = user.id, "User created by admin");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(user))),
    ))
}

/// PUT /users/{id}
///
/// Update a user's profile, role, or active flag (admin only).
pub async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    if let Some(ref role) = input.role {
        validate_role(role)?;
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "user_updated".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(id),
            details_json: Some(serde_json::json!({"role": user.role, "isActive": user.is_active})),
        },
    )
    .await?;

    Ok(Json(ApiResponse::ok(UserResponse::from(user))))
}

/// POST /users/{id}/reset-password
///
/// Set a new password for a user and revoke their sessions (admin only).
pub async fn reset_password(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    validate_password_strength(&input.new_password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let updated = UserRepo::update_password(&state.pool, id, &password_hash).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }

    // Force re-authentication everywhere.
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "user_password_reset".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(id),
            details_json: None,
        },
    )
    .await?;

    tracing::info!(admin_id = admin.user_id, user_id = id, "Password reset");

    Ok(Json(ApiResponse::message("Password reset successfully")))
}

/// DELETE /users/{id}
///
/// Deactivate a user and revoke their sessions (admin only, soft delete).
pub async fn deactivate_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    if id == admin.user_id {
        return Err(AppError::BadRequest(
            "Admins cannot deactivate their own account".to_string(),
        ));
    }

    let deactivated = UserRepo::deactivate(&state.pool, id).await?;
    if !deactivated {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }

    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(admin.user_id),
            action: "user_deactivated".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(id),
            details_json: None,
        },
    )
    .await?;

    Ok(Json(ApiResponse::message("User deactivated")))
}
