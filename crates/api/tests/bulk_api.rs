//! HTTP-level integration tests for the bulk write endpoints.
//!
//! Uses Axum's tower::ServiceExt to send requests directly to the router
//! without an actual TCP listener.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;

use common::{body_json, delete_json, get, post_json, put_json, seed_user_with_token};

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

async fn seed_forest(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO forests (name, region, latitude, longitude, area) \
         VALUES ($1, 'Svealand', 59.3, 18.0, 100.0) RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn tree_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM trees WHERE is_active = true")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn audit_count(pool: &PgPool, action: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM audit_logs WHERE action = $1")
        .bind(action)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn tree_row(species: &str) -> serde_json::Value {
    serde_json::json!({
        "species": species,
        "latitude": 59.33,
        "longitude": 18.07,
    })
}

// ---------------------------------------------------------------------------
// Bulk create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_create_returns_201_with_summary(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "creator", "user").await;
    let forest_id = seed_forest(&pool, "Create Forest").await;

    // Coordinates in either form: GeoJSON location or flat fields.
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({
            "forestId": forest_id,
            "trees": [
                {"species": "Oak", "location": {"coordinates": [18.07, 59.33]}},
                {"species": "Pine", "location": {"coordinates": [18.08, 59.34]}},
            ],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["createdTrees"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["summary"]["totalCreated"], 2);
    // GeoJSON order is [lon, lat]; stored fields are flat.
    assert_eq!(json["data"]["createdTrees"][0]["latitude"], 59.33);
    assert_eq!(json["data"]["createdTrees"][0]["longitude"], 18.07);

    // Exactly one audit record carrying the batch count.
    assert_eq!(audit_count(&pool, "bulk_create_trees").await, 1);
    let details: serde_json::Value = sqlx::query_scalar(
        "SELECT details_json FROM audit_logs WHERE action = 'bulk_create_trees'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(details["count"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_create_with_bad_rows_persists_nothing(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "validator", "user").await;
    let forest_id = seed_forest(&pool, "Validation Forest").await;

    // Row 0 valid, row 1 missing species, row 2 missing coordinates.
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({
            "forestId": forest_id,
            "trees": [
                tree_row("Oak"),
                {"latitude": 59.0, "longitude": 18.0},
                {"species": "Pine"},
            ],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);

    // Every failing row is reported, with its index and field.
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["index"], 1);
    assert_eq!(errors[0]["field"], "species");
    assert_eq!(errors[1]["index"], 2);
    assert_eq!(errors[1]["field"], "location");

    // Nothing was persisted: no trees, no audit record.
    assert_eq!(tree_count(&pool).await, 0);
    assert_eq!(audit_count(&pool, "bulk_create_trees").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_create_over_1000_rows_is_rejected(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "overflow", "user").await;
    let forest_id = seed_forest(&pool, "Overflow Forest").await;

    let rows: Vec<_> = (0..1001).map(|_| tree_row("Oak")).collect();

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": rows}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(
        json["message"].as_str().unwrap().contains("Maximum 1000 trees"),
        "message was: {}",
        json["message"]
    );
    assert_eq!(tree_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_create_requires_authentication(pool: PgPool) {
    let forest_id = seed_forest(&pool, "Anon Forest").await;

    let app = common::build_test_app(pool.clone());
    let response = common::request(
        app,
        axum::http::Method::POST,
        "/api/v1/bulk/trees/create",
        None,
        Some(serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak")]})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Bulk update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_update_by_filter_with_no_match_returns_404(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "nomatch", "user").await;
    seed_forest(&pool, "Empty Forest").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        "/api/v1/bulk/trees/update",
        &token,
        serde_json::json!({
            "filter": {"species": "NonExistentSpecies"},
            "updates": {"isAlive": false},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "No trees found matching the criteria");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_update_add_measurement_appends_each_call(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "appender", "user").await;
    let forest_id = seed_forest(&pool, "Measure Forest").await;

    // Create two trees first.
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak"), tree_row("Pine")]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = serde_json::json!({
        "filter": {"forestId": forest_id},
        "updates": {"addMeasurement": {"heightM": 4.2, "health": "good"}},
    });

    // Two identical calls append twice: NOT idempotent, by design.
    for _ in 0..2 {
        let app = common::build_test_app(pool.clone());
        let response = put_json(app, "/api/v1/bulk/trees/update", &token, body.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let measurements: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM measurements")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(measurements, 4, "2 trees x 2 calls");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_update_plain_field_is_idempotent(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "idem", "user").await;
    let forest_id = seed_forest(&pool, "Idem Forest").await;

    let app = common::build_test_app(pool.clone());
    post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak"), tree_row("Oak")]}),
    )
    .await;

    let body = serde_json::json!({
        "filter": {"forestId": forest_id},
        "updates": {"isAlive": false},
    });

    for _ in 0..2 {
        let app = common::build_test_app(pool.clone());
        let response = put_json(app, "/api/v1/bulk/trees/update", &token, body.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let dead: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM trees WHERE is_alive = false AND is_active = true",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(dead, 2);
}

// ---------------------------------------------------------------------------
// Bulk delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hard_delete_requires_admin_role(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "plainuser", "user").await;
    let forest_id = seed_forest(&pool, "Forbidden Forest").await;

    let app = common::build_test_app(pool.clone());
    post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak")]}),
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let response = delete_json(
        app,
        "/api/v1/bulk/trees/delete",
        &token,
        serde_json::json!({"filter": {"forestId": forest_id}, "hardDelete": true}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(tree_count(&pool).await, 1, "nothing may be deleted");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_is_default_and_preserves_rows(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "softie", "user").await;
    let forest_id = seed_forest(&pool, "Soft Forest").await;

    let app = common::build_test_app(pool.clone());
    post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak"), tree_row("Pine")]}),
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let response = delete_json(
        app,
        "/api/v1/bulk/trees/delete",
        &token,
        serde_json::json!({"filter": {"forestId": forest_id}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["summary"]["totalDeleted"], 2);
    assert_eq!(json["data"]["summary"]["hardDelete"], false);

    // Hidden from the active set, but the rows survive.
    assert_eq!(tree_count(&pool).await, 0);
    let raw: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM trees")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(raw, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hard_delete_deactivates_images(pool: PgPool) {
    let (admin_id, token) = seed_user_with_token(&pool, "hardadmin", "admin").await;
    let forest_id = seed_forest(&pool, "Hard Forest").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak")]}),
    )
    .await;
    let json = body_json(response).await;
    let tree_id = json["data"]["createdTrees"][0]["id"].as_i64().unwrap();

    // Attach an image directly.
    sqlx::query(
        "INSERT INTO tree_images (tree_id, file_path, mime_type, size_bytes, uploaded_by) \
         VALUES ($1, 'uploads/a.jpg', 'image/jpeg', 100, $2)",
    )
    .bind(tree_id)
    .bind(admin_id)
    .execute(&pool)
    .await
    .unwrap();

    let app = common::build_test_app(pool.clone());
    let response = delete_json(
        app,
        "/api/v1/bulk/trees/delete",
        &token,
        serde_json::json!({"treeIds": [tree_id], "hardDelete": true}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["summary"]["imagesDeactivated"], 1);

    let (tree_rows, active_images): (i64, i64) = (
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM trees")
            .fetch_one(&pool)
            .await
            .unwrap(),
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM tree_images WHERE is_active = true")
            .fetch_one(&pool)
            .await
            .unwrap(),
    );
    assert_eq!(tree_rows, 0, "hard delete removes the row");
    assert_eq!(active_images, 0, "images are deactivated, not removed");
}

// ---------------------------------------------------------------------------
// Bulk measurement append
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_measurements_with_unknown_tree_appends_nothing(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "strict", "user").await;
    let forest_id = seed_forest(&pool, "Strict Forest").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak")]}),
    )
    .await;
    let json = body_json(response).await;
    let real_id = json["data"]["createdTrees"][0]["id"].as_i64().unwrap();
    let ghost_id = real_id + 9999;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/measurements/add",
        &token,
        serde_json::json!({"measurements": [
            {"treeId": real_id, "heightM": 2.0},
            {"treeId": ghost_id, "heightM": 3.0},
        ]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert!(
        json["message"].as_str().unwrap().contains(&ghost_id.to_string()),
        "missing ids must be named: {}",
        json["message"]
    );

    // Nothing was appended to ANY tree in the call.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM measurements")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_measurements_groups_rows_per_tree(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "grouper", "user").await;
    let forest_id = seed_forest(&pool, "Group Forest").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak"), tree_row("Pine")]}),
    )
    .await;
    let json = body_json(response).await;
    let a = json["data"]["createdTrees"][0]["id"].as_i64().unwrap();
    let b = json["data"]["createdTrees"][1]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/measurements/add",
        &token,
        serde_json::json!({"measurements": [
            {"treeId": a, "heightM": 1.0},
            {"treeId": b, "heightM": 2.0},
            {"treeId": a, "diameterCm": 30.0},
        ]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["summary"]["totalMeasurements"], 3);
    assert_eq!(json["data"]["summary"]["treesAffected"], 2);
    assert_eq!(audit_count(&pool, "bulk_add_measurements").await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_measurements_row_errors_are_exhaustive(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "exhaustive", "user").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/bulk/measurements/add",
        &token,
        serde_json::json!({"measurements": [
            {"heightM": 2.0},
            {"treeId": 1},
        ]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2, "both rows must be reported: {errors:?}");
    assert_eq!(errors[0]["index"], 0);
    assert_eq!(errors[0]["field"], "treeId");
    assert_eq!(errors[1]["index"], 1);
    assert_eq!(errors[1]["field"], "measurement");
}

// ---------------------------------------------------------------------------
// Bulk operation status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_status_reports_recent_operations(pool: PgPool) {
    let (_user, token) = seed_user_with_token(&pool, "statuser", "user").await;
    let forest_id = seed_forest(&pool, "Status Forest").await;

    let app = common::build_test_app(pool.clone());
    post_json(
        app,
        "/api/v1/bulk/trees/create",
        &token,
        serde_json::json!({"forestId": forest_id, "trees": [tree_row("Oak")]}),
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/bulk/operations/status", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let operations = json["data"]["operations"].as_array().unwrap();
    assert!(operations
        .iter()
        .any(|op| op["action"] == "bulk_create_trees" && op["operations"] == 1));
}
