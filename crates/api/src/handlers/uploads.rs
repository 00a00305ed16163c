//! Handlers for tree image uploads.
//!
//! Accepts multipart uploads of one or more image files per request.
//! Per-file failures are isolated: a bad file is skipped and logged while
//! the remaining files in the same request continue processing. Stored
//! filenames are random UUIDs, so concurrent uploads cannot collide.

use std::path::PathBuf;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use canopy_core::error::CoreError;
use canopy_core::types::DbId;
use canopy_db::models::audit::CreateAuditLog;
use canopy_db::models::tree_image::{CreateTreeImage, TreeImage, VALID_CLASSIFICATIONS};
use canopy_db::repositories::{AuditLogRepo, TreeImageRepo, TreeRepo};
use canopy_events::DomainEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Maximum accepted file size per image (10 MiB).
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Thumbnail bounding box in pixels.
const THUMBNAIL_MAX_DIM: u32 = 256;

/// MIME types accepted for upload, with their stored file extension.
const ALLOWED_MIME_TYPES: &[(&str, &str)] =
    &[("image/png", "png"), ("image/jpeg", "jpg"), ("image/webp", "webp")];

/// Result of a multi-file upload: stored images plus per-file skip reasons.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub images: Vec<TreeImage>,
    pub skipped: Vec<SkippedFile>,
}

/// A file that could not be processed; the rest of the request continued.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

/// POST /uploads/trees/{id}/images
///
/// Multipart upload of image files for a tree. Form fields:
/// - `file` (repeatable): the image bytes
/// - `classification` (optional): one of the classification enum values
/// - `tags` (optional): comma-separated free-form tags
pub async fn upload_tree_images(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(tree_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<UploadResult>>)> {
    let tree = TreeRepo::find_by_id(&state.pool, tree_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Tree",
            id: tree_id,
        }))?;

    let mut files: Vec<(String, String, Vec<u8>)> = Vec::new();
    let mut classification = "other".to_string();
    let mut tags: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let mime = field.content_type().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                files.push((file_name, mime, data.to_vec()));
            }
            "classification" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !VALID_CLASSIFICATIONS.contains(&text.as_str()) {
                    return Err(AppError::BadRequest(format!(
                        "Invalid classification '{text}'. Valid values: {}",
                        VALID_CLASSIFICATIONS.join(", ")
                    )));
                }
                classification = text;
            }
            "tags" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                tags = text
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            _ => {} // ignore unknown fields
        }
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(
            "At least one 'file' field is required".to_string(),
        ));
    }

    let tree_dir = PathBuf::from(&state.config.upload_dir).join(format!("tree_{tree_id}"));
    tokio::fs::create_dir_all(&tree_dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let mut images = Vec::new();
    let mut skipped = Vec::new();

    // One bad file must not sink the rest of the batch.
    for (file_name, mime, data) in files {
        match store_one_image(
            &state,
            &tree_dir,
            tree_id,
            auth.user_id,
            &file_name,
            &mime,
            data,
            &classification,
            &tags,
        )
        .await
        {
            Ok(image) => images.push(image),
            Err(e) => {
                tracing::warn!(
                    tree_id,
                    file_name = %file_name,
                    error = %e,
                    "Skipping file in multi-file upload"
                );
                skipped.push(SkippedFile {
                    file_name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !images.is_empty() {
        let mut conn = state.pool.acquire().await?;
        AuditLogRepo::insert(
            &mut conn,
            &CreateAuditLog {
                user_id: Some(auth.user_id),
                action: "images_uploaded".to_string(),
                entity_type: "tree".to_string(),
                entity_id: Some(tree_id),
                details_json: Some(serde_json::json!({
                    "count": images.len(),
                    "skipped": skipped.len(),
                })),
            },
        )
        .await?;

        state.event_bus.publish(
            DomainEvent::new("image.uploaded")
                .with_entity("tree", tree_id)
                .with_actor(auth.user_id)
                .with_forest(tree.forest_id)
                .with_payload(serde_json::json!({"count": images.len()})),
        );
    }

    tracing::info!(
        user_id = auth.user_id,
        tree_id,
        stored = images.len(),
        skipped = skipped.len(),
        "Image upload processed"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UploadResult { images, skipped })),
    ))
}

/// GET /uploads/trees/{id}/images
///
/// List a tree's active images, newest first.
pub async fn list_tree_images(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(tree_id): Path<DbId>,
) -> AppResult<Json<ApiResponse<Vec<TreeImage>>>> {
    if TreeRepo::find_by_id(&state.pool, tree_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Tree",
            id: tree_id,
        }));
    }
    let images = TreeImageRepo::list_for_tree(&state.pool, tree_id).await?;
    Ok(Json(ApiResponse::ok(images)))
}

/// DELETE /uploads/images/{id}
///
/// Soft-delete an image. Allowed for its uploader or an admin.
pub async fn delete_tree_image(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    let image = TreeImageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TreeImage",
            id,
        }))?;

    if image.uploaded_by != Some(auth.user_id) && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the uploader or an admin may delete an image".into(),
        )));
    }

    TreeImageRepo::soft_delete(&state.pool, id).await?;

    let mut conn = state.pool.acquire().await?;
    AuditLogRepo::insert(
        &mut conn,
        &CreateAuditLog {
            user_id: Some(auth.user_id),
            action: "image_deleted".to_string(),
            entity_type: "tree_image".to_string(),
            entity_id: Some(id),
            details_json: None,
        },
    )
    .await?;

    Ok(Json(ApiResponse::message("Image deleted")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate, store, thumbnail, and record one uploaded file.
#[allow(clippy::too_many_arguments)]
async fn store_one_image(
    state: &AppState,
    tree_dir: &std::path::Path,
    tree_id: DbId,
    uploaded_by: DbId,
    file_name: &str,
    mime: &str,
    data: Vec<u8>,
    classification: &str,
    tags: &[String],
) -> AppResult<TreeImage> {
    let ext = ALLOWED_MIME_TYPES
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Unsupported content type '{mime}'. Supported: image/png, image/jpeg, image/webp"
            ))
        })?;

    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "File '{file_name}' exceeds the {MAX_IMAGE_BYTES} byte limit"
        )));
    }

    // Decode up front so corrupt files are rejected before anything is
    // written to disk.
    let decoded = image::load_from_memory(&data)
        .map_err(|e| AppError::BadRequest(format!("Not a valid image: {e}")))?;

    let stem = uuid::Uuid::new_v4().simple().to_string();
    let original_path = tree_dir.join(format!("{stem}.{ext}"));
    // Thumbnails are always JPEG regardless of the source format.
    let thumbnail_path = tree_dir.join(format!("{stem}_thumb.jpg"));

    tokio::fs::write(&original_path, &data)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    // Thumbnail generation is CPU-bound; keep it off the async executor.
    let thumb_target = thumbnail_path.clone();
    let size_bytes = data.len() as i64;
    tokio::task::spawn_blocking(move || {
        // JPEG has no alpha channel; flatten before saving.
        let thumb = decoded.thumbnail(THUMBNAIL_MAX_DIM, THUMBNAIL_MAX_DIM).to_rgb8();
        thumb.save(&thumb_target)
    })
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?
    .map_err(|e| AppError::InternalError(format!("Thumbnail generation failed: {e}")))?;

    let record = TreeImageRepo::create(
        &state.pool,
        &CreateTreeImage {
            tree_id,
            file_path: original_path.to_string_lossy().to_string(),
            thumbnail_path: Some(thumbnail_path.to_string_lossy().to_string()),
            mime_type: mime.to_string(),
            size_bytes,
            classification: classification.to_string(),
            tags: tags.to_vec(),
            uploaded_by: Some(uploaded_by),
        },
    )
    .await?;

    Ok(record)
}
