//! Shared fixtures for repository integration tests.

#![allow(dead_code)]

use sqlx::PgPool;

use canopy_core::bulk::NewTreeRow;
use canopy_core::types::DbId;
use canopy_db::models::forest::{CreateForest, Forest};
use canopy_db::models::tree::{CreateTree, Tree};
use canopy_db::models::user::{CreateUser, User};
use canopy_db::repositories::{ForestRepo, TreeRepo, UserRepo};

pub async fn seed_forest(pool: &PgPool, name: &str) -> Forest {
    ForestRepo::create(
        pool,
        &CreateForest {
            name: name.to_string(),
            region: "Svealand".to_string(),
            latitude: 59.33,
            longitude: 18.07,
            area: 120.5,
            area_unit: None,
            established_at: None,
        },
    )
    .await
    .unwrap()
}

pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            // Not a real hash; these tests never log in.
            password_hash: "$argon2id$test".to_string(),
            role: role.to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_tree(pool: &PgPool, forest_id: DbId, species: &str) -> Tree {
    TreeRepo::create(
        pool,
        &CreateTree {
            tree_code: None,
            forest_id,
            species: species.to_string(),
            planted_at: None,
            is_alive: None,
            latitude: 59.34,
            longitude: 18.08,
        },
    )
    .await
    .unwrap()
}

pub fn new_tree_row(species: &str, forest_id: DbId) -> NewTreeRow {
    NewTreeRow {
        tree_code: None,
        species: Some(species.to_string()),
        forest_id: Some(forest_id),
        planted_at: Some(chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
        is_alive: Some(true),
        location: None,
        latitude: Some(59.35),
        longitude: Some(18.09),
    }
}
