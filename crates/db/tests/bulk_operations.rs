//! Integration tests for the transactional bulk surface of the tree and
//! measurement repositories.
//!
//! Exercises multi-row inserts, selection resolution, bulk updates and
//! deletes, the image-deactivation cascade, and transaction rollback.

mod common;

use sqlx::PgPool;

use canopy_core::bulk::NewMeasurementRow;
use canopy_core::health::HealthStatus;
use canopy_db::models::tree::{BulkTreeUpdates, TreeFilter};
use canopy_db::models::tree_image::CreateTreeImage;
use canopy_db::repositories::{MeasurementRepo, TreeImageRepo, TreeRepo};

use common::{new_tree_row, seed_forest, seed_tree, seed_user};

fn no_updates() -> BulkTreeUpdates {
    BulkTreeUpdates {
        forest_id: None,
        species: None,
        planted_at: None,
        died_at: None,
        is_alive: None,
        add_measurement: None,
    }
}

fn measurement(height: f64) -> NewMeasurementRow {
    NewMeasurementRow {
        tree_id: None,
        height_m: Some(height),
        diameter_cm: None,
        health: Some(HealthStatus::Good),
        co2_absorbed_kg: None,
        notes: None,
        measured_at: None,
    }
}

// ---------------------------------------------------------------------------
// Bulk insert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_insert_creates_all_rows(pool: PgPool) {
    let forest = seed_forest(&pool, "Batch Forest").await;

    let rows: Vec<_> = (0..5)
        .map(|i| new_tree_row(&format!("Species {i}"), forest.id))
        .collect();

    let mut tx = pool.begin().await.unwrap();
    let created = TreeRepo::bulk_insert(&mut tx, &rows).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(created.len(), 5);
    // Generated tree codes are unique and non-empty.
    for tree in &created {
        assert!(tree.tree_code.starts_with("TR-"));
    }

    let count = TreeRepo::count(&pool, &TreeFilter::default()).await.unwrap();
    assert_eq!(count, 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_insert_rolls_back_with_transaction(pool: PgPool) {
    let forest = seed_forest(&pool, "Rollback Forest").await;
    let rows = vec![new_tree_row("Oak", forest.id), new_tree_row("Pine", forest.id)];

    let mut tx = pool.begin().await.unwrap();
    let created = TreeRepo::bulk_insert(&mut tx, &rows).await.unwrap();
    assert_eq!(created.len(), 2);
    // Abort instead of committing.
    tx.rollback().await.unwrap();

    let count = TreeRepo::count(&pool, &TreeFilter::default()).await.unwrap();
    assert_eq!(count, 0, "rolled-back inserts must not persist");
}

// ---------------------------------------------------------------------------
// Selection resolution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_fetch_active_by_ids_omits_inactive(pool: PgPool) {
    let forest = seed_forest(&pool, "Selection Forest").await;
    let user = seed_user(&pool, "ranger", "user").await;

    let keep = seed_tree(&pool, forest.id, "Oak").await;
    let gone = seed_tree(&pool, forest.id, "Pine").await;
    TreeRepo::soft_delete(&pool, gone.id, user.id).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let found = TreeRepo::fetch_active_by_ids(&mut conn, &[keep.id, gone.id])
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, keep.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_fetch_active_by_filter_matches_species_case_insensitively(pool: PgPool) {
    let forest = seed_forest(&pool, "Filter Forest").await;
    seed_tree(&pool, forest.id, "Oak").await;
    seed_tree(&pool, forest.id, "Pine").await;

    let filter = TreeFilter {
        species: Some("oak".to_string()),
        ..TreeFilter::default()
    };

    let mut conn = pool.acquire().await.unwrap();
    let found = TreeRepo::fetch_active_by_filter(&mut conn, &filter, 1001)
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].species, "Oak");
}

// ---------------------------------------------------------------------------
// Bulk update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_update_is_idempotent_for_plain_fields(pool: PgPool) {
    let forest = seed_forest(&pool, "Idempotent Forest").await;
    let a = seed_tree(&pool, forest.id, "Oak").await;
    let b = seed_tree(&pool, forest.id, "Oak").await;
    let ids = vec![a.id, b.id];

    let updates = BulkTreeUpdates {
        is_alive: Some(false),
        ..no_updates()
    };

    for _ in 0..2 {
        let mut tx = pool.begin().await.unwrap();
        let affected = TreeRepo::bulk_update(&mut tx, &ids, &updates).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(affected, 2);
    }

    let filter = TreeFilter {
        is_alive: Some(false),
        ..TreeFilter::default()
    };
    let dead = TreeRepo::count(&pool, &filter).await.unwrap();
    assert_eq!(dead, 2, "applying the same update twice changes nothing more");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_measurement_append_is_not_idempotent(pool: PgPool) {
    let forest = seed_forest(&pool, "Append Forest").await;
    let user = seed_user(&pool, "surveyor", "user").await;
    let tree = seed_tree(&pool, forest.id, "Birch").await;

    // Each call appends another entry by design.
    for i in 0..2 {
        let mut tx = pool.begin().await.unwrap();
        let rows = vec![measurement(4.0 + i as f64)];
        MeasurementRepo::bulk_append(&mut tx, tree.id, Some(user.id), &rows)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    let count = MeasurementRepo::count_for_tree(&pool, tree.id).await.unwrap();
    assert_eq!(count, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_append_preserves_measurement_order(pool: PgPool) {
    let forest = seed_forest(&pool, "Ordered Forest").await;
    let user = seed_user(&pool, "orderly", "user").await;
    let tree = seed_tree(&pool, forest.id, "Elm").await;

    let base = chrono::Utc::now() - chrono::Duration::days(3);
    let rows: Vec<_> = (0..3)
        .map(|i| NewMeasurementRow {
            measured_at: Some(base + chrono::Duration::days(i)),
            ..measurement(1.0 + i as f64)
        })
        .collect();

    let mut tx = pool.begin().await.unwrap();
    let inserted = MeasurementRepo::bulk_append(&mut tx, tree.id, Some(user.id), &rows)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(inserted, 3);

    let listed = MeasurementRepo::list_for_tree(&pool, tree.id, 50, 0)
        .await
        .unwrap();
    let heights: Vec<_> = listed.iter().map(|m| m.height_m.unwrap()).collect();
    assert_eq!(heights, vec![1.0, 2.0, 3.0], "listing is measured_at ascending");

    let latest = MeasurementRepo::latest_for_tree(&pool, tree.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.height_m, Some(3.0));
}

// ---------------------------------------------------------------------------
// Bulk delete + image cascade
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_soft_delete_records_actor_and_is_idempotent(pool: PgPool) {
    let forest = seed_forest(&pool, "Soft Delete Forest").await;
    let user = seed_user(&pool, "deleter", "admin").await;
    let tree = seed_tree(&pool, forest.id, "Ash").await;

    let mut tx = pool.begin().await.unwrap();
    let first = TreeRepo::bulk_soft_delete(&mut tx, &[tree.id], user.id)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(first, 1);

    // Second pass affects nothing: the row is already inactive.
    let mut tx = pool.begin().await.unwrap();
    let second = TreeRepo::bulk_soft_delete(&mut tx, &[tree.id], user.id)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(second, 0);

    assert!(TreeRepo::find_by_id(&pool, tree.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hard_delete_deactivates_images_but_keeps_them(pool: PgPool) {
    let forest = seed_forest(&pool, "Cascade Forest").await;
    let user = seed_user(&pool, "photographer", "admin").await;
    let tree = seed_tree(&pool, forest.id, "Maple").await;

    let image = TreeImageRepo::create(
        &pool,
        &CreateTreeImage {
            tree_id: tree.id,
            file_path: "uploads/tree_1/a.jpg".to_string(),
            thumbnail_path: None,
            mime_type: "image/jpeg".to_string(),
            size_bytes: 1024,
            classification: "bark".to_string(),
            tags: vec!["test".to_string()],
            uploaded_by: Some(user.id),
        },
    )
    .await
    .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let deactivated = TreeImageRepo::deactivate_for_trees(&mut tx, &[tree.id])
        .await
        .unwrap();
    let deleted = TreeRepo::bulk_hard_delete(&mut tx, &[tree.id]).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(deactivated, 1);
    assert_eq!(deleted, 1);

    // The tree row is gone entirely.
    assert!(TreeRepo::find_by_id(&pool, tree.id).await.unwrap().is_none());

    // The image row survives, deactivated, still referencing the old tree id.
    let row: (bool, i64) =
        sqlx::query_as("SELECT is_active, tree_id FROM tree_images WHERE id = $1")
            .bind(image.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!row.0, "image must be deactivated, not deleted");
    assert_eq!(row.1, tree.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_hard_delete_cascades_measurements(pool: PgPool) {
    let forest = seed_forest(&pool, "Measurement Cascade Forest").await;
    let user = seed_user(&pool, "cascader", "admin").await;
    let tree = seed_tree(&pool, forest.id, "Spruce").await;

    let mut tx = pool.begin().await.unwrap();
    MeasurementRepo::bulk_append(&mut tx, tree.id, Some(user.id), &[measurement(2.0)])
        .await
        .unwrap();
    TreeRepo::bulk_hard_delete(&mut tx, &[tree.id]).await.unwrap();
    tx.commit().await.unwrap();

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM measurements WHERE tree_id = $1")
            .bind(tree.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0, "measurements cascade with the hard-deleted tree");
}
