//! HTTP-level integration tests for the CRUD, dashboard, and export
//! endpoints.

mod common;

use axum::http::{Method, StatusCode};
use sqlx::PgPool;

use common::{body_json, get, post_json, put_json, request, seed_user_with_token};

async fn create_forest(pool: &PgPool, token: &str, name: &str) -> i64 {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/forests",
        token,
        serde_json::json!({
            "name": name,
            "region": "Svealand",
            "latitude": 59.3,
            "longitude": 18.0,
            "area": 250.0,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn create_tree(pool: &PgPool, token: &str, forest_id: i64, species: &str) -> i64 {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/trees",
        token,
        serde_json::json!({
            "forestId": forest_id,
            "species": species,
            "latitude": 59.31,
            "longitude": 18.02,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Tree CRUD
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tree_create_and_get_with_latest_measurement(pool: PgPool) {
    let (_id, token) = seed_user_with_token(&pool, "arborist", "admin").await;
    let forest_id = create_forest(&pool, &token, "Detail Forest").await;
    let tree_id = create_tree(&pool, &token, forest_id, "Oak").await;

    // No measurements yet.
    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/trees/{tree_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["species"], "Oak");
    assert!(json["data"]["latestMeasurement"].is_null());

    // Record one and see it surface.
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/trees/{tree_id}/measurements"),
        &token,
        serde_json::json!({"heightM": 5.5, "health": "excellent"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/trees/{tree_id}"), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["latestMeasurement"]["heightM"], 5.5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tree_list_filters_by_species(pool: PgPool) {
    let (_id, token) = seed_user_with_token(&pool, "lister", "admin").await;
    let forest_id = create_forest(&pool, &token, "List Forest").await;
    create_tree(&pool, &token, forest_id, "Oak").await;
    create_tree(&pool, &token, forest_id, "Pine").await;

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/trees?species=oak", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["items"][0]["species"], "Oak");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tree_create_with_unknown_forest_is_404(pool: PgPool) {
    let (_id, token) = seed_user_with_token(&pool, "lost", "admin").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/trees",
        &token,
        serde_json::json!({
            "forestId": 424242,
            "species": "Oak",
            "latitude": 59.31,
            "longitude": 18.02,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_measurement_rejects_bad_health_value(pool: PgPool) {
    let (_id, token) = seed_user_with_token(&pool, "healthnut", "admin").await;
    let forest_id = create_forest(&pool, &token, "Health Forest").await;
    let tree_id = create_tree(&pool, &token, forest_id, "Oak").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/trees/{tree_id}/measurements"),
        &token,
        serde_json::json!({"health": "thriving"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_tree_changes_only_given_fields(pool: PgPool) {
    let (_id, token) = seed_user_with_token(&pool, "editor", "admin").await;
    let forest_id = create_forest(&pool, &token, "Edit Forest").await;
    let tree_id = create_tree(&pool, &token, forest_id, "Oak").await;

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &format!("/api/v1/trees/{tree_id}"),
        &token,
        serde_json::json!({"isAlive": false}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["isAlive"], false);
    assert_eq!(json["data"]["species"], "Oak", "untouched fields survive");
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dashboard_overview_and_species(pool: PgPool) {
    let (_id, token) = seed_user_with_token(&pool, "viewer", "admin").await;
    let forest_id = create_forest(&pool, &token, "Stats Forest").await;
    create_tree(&pool, &token, forest_id, "Oak").await;
    create_tree(&pool, &token, forest_id, "Oak").await;
    create_tree(&pool, &token, forest_id, "Pine").await;

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/dashboard/overview", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["totalForests"], 1);
    assert_eq!(json["data"]["totalTrees"], 3);
    assert_eq!(json["data"]["aliveTrees"], 3);

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/dashboard/species", &token).await;
    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows[0]["species"], "Oak");
    assert_eq!(rows[0]["count"], 2);
    assert_eq!(rows[1]["species"], "Pine");
    assert_eq!(rows[1]["count"], 1);
}

// ---------------------------------------------------------------------------
// Exports & audit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tree_export_is_csv(pool: PgPool) {
    let (_id, token) = seed_user_with_token(&pool, "exporter", "admin").await;
    let forest_id = create_forest(&pool, &token, "Export Forest").await;
    create_tree(&pool, &token, forest_id, "Oak").await;

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/exports/trees.csv", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/csv"
    );

    let body = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("id,tree_code,"));
    assert!(text.contains("Oak"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mutations_write_audit_entries(pool: PgPool) {
    let (admin_id, token) = seed_user_with_token(&pool, "audited", "admin").await;
    let forest_id = create_forest(&pool, &token, "Audit Forest").await;
    create_tree(&pool, &token, forest_id, "Oak").await;

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/audit?entityType=tree", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["items"][0]["action"], "tree_created");
    assert_eq!(json["data"]["items"][0]["userId"], admin_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_health_endpoint_is_public(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = request(app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["dbHealthy"], true);
}
