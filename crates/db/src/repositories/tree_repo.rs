//! Repository for the `trees` table, including the transactional bulk
//! surface used by the bulk write endpoints.

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use canopy_core::bulk::NewTreeRow;
use canopy_core::types::DbId;

use crate::models::tree::{BulkTreeUpdates, CreateTree, Tree, TreeFilter, UpdateTree};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, tree_code, forest_id, species, planted_at, died_at, is_alive, \
    latitude, longitude, is_active, deleted_at, deleted_by, created_at, updated_at";

/// Columns bound per row in bulk inserts (tree_code handled separately).
const INSERT_BIND_COUNT: u32 = 7;

/// Provides CRUD and bulk operations for trees.
pub struct TreeRepo;

impl TreeRepo {
    /// Insert a new tree, returning the created row.
    ///
    /// A missing `tree_code` is generated server-side from a random UUID.
    pub async fn create(pool: &PgPool, input: &CreateTree) -> Result<Tree, sqlx::Error> {
        let query = format!(
            "INSERT INTO trees \
                (tree_code, forest_id, species, planted_at, is_alive, latitude, longitude) \
             VALUES \
                (COALESCE($1, 'TR-' || gen_random_uuid()), $2, $3, COALESCE($4, CURRENT_DATE), \
                 COALESCE($5, true), $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tree>(&query)
            .bind(&input.tree_code)
            .bind(input.forest_id)
            .bind(&input.species)
            .bind(input.planted_at)
            .bind(input.is_alive)
            .bind(input.latitude)
            .bind(input.longitude)
            .fetch_one(pool)
            .await
    }

    /// Find an active tree by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Tree>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM trees WHERE id = $1 AND is_active = true");
        sqlx::query_as::<_, Tree>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active tree by its unique tree code.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Tree>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM trees WHERE tree_code = $1 AND is_active = true");
        sqlx::query_as::<_, Tree>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// List active trees matching the filter, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &TreeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Tree>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_tree_filter(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM trees {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );
        let q = bind_tree_values(sqlx::query_as::<_, Tree>(&query), &bind_values);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count active trees matching the filter.
    pub async fn count(pool: &PgPool, filter: &TreeFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_tree_filter(filter);
        let query = format!("SELECT COUNT(*)::BIGINT FROM trees {where_clause}");
        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::BigIntArray(v) => q.bind(v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Bool(v) => q.bind(*v),
                BindValue::Date(v) => q.bind(*v),
            };
        }
        q.fetch_one(pool).await
    }

    /// Update a tree. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no active row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTree,
    ) -> Result<Option<Tree>, sqlx::Error> {
        let query = format!(
            "UPDATE trees SET \
                forest_id = COALESCE($2, forest_id), \
                species = COALESCE($3, species), \
                planted_at = COALESCE($4, planted_at), \
                died_at = COALESCE($5, died_at), \
                is_alive = COALESCE($6, is_alive), \
                latitude = COALESCE($7, latitude), \
                longitude = COALESCE($8, longitude), \
                updated_at = NOW() \
             WHERE id = $1 AND is_active = true \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tree>(&query)
            .bind(id)
            .bind(input.forest_id)
            .bind(&input.species)
            .bind(input.planted_at)
            .bind(input.died_at)
            .bind(input.is_alive)
            .bind(input.latitude)
            .bind(input.longitude)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a tree, recording when and by whom.
    ///
    /// Returns `true` if the row was updated (idempotent: a second call
    /// returns `false`).
    pub async fn soft_delete(
        pool: &PgPool,
        id: DbId,
        deleted_by: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE trees SET is_active = false, deleted_at = NOW(), deleted_by = $2, \
                updated_at = NOW() \
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .bind(deleted_by)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Bulk surface (transactional; callers pass `&mut *tx`)
    // -----------------------------------------------------------------------

    /// Insert a batch of validated tree rows in one multi-row INSERT.
    ///
    /// Rows must already have defaults applied; missing tree codes are
    /// generated server-side. Returns the created rows in input order.
    pub async fn bulk_insert(
        conn: &mut PgConnection,
        rows: &[NewTreeRow],
    ) -> Result<Vec<Tree>, sqlx::Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // Build a multi-row INSERT statement.
        let mut query = String::from(
            "INSERT INTO trees \
                (tree_code, forest_id, species, planted_at, is_alive, latitude, longitude) \
             VALUES ",
        );
        let mut param_idx = 1u32;
        let mut first = true;

        for _ in rows {
            if !first {
                query.push_str(", ");
            }
            first = false;
            query.push_str(&format!(
                "(COALESCE(${}, 'TR-' || gen_random_uuid()), ${}, ${}, ${}, ${}, ${}, ${})",
                param_idx,
                param_idx + 1,
                param_idx + 2,
                param_idx + 3,
                param_idx + 4,
                param_idx + 5,
                param_idx + 6,
            ));
            param_idx += INSERT_BIND_COUNT;
        }

        query.push_str(&format!(" RETURNING {COLUMNS}"));

        let mut q = sqlx::query_as::<_, Tree>(&query);
        for row in rows {
            let coords = row.coordinates();
            q = q
                .bind(&row.tree_code)
                .bind(row.forest_id)
                .bind(&row.species)
                .bind(row.planted_at)
                .bind(row.is_alive)
                .bind(coords.map(|c| c.0))
                .bind(coords.map(|c| c.1));
        }

        q.fetch_all(conn).await
    }

    /// Fetch active trees by explicit id list (selection resolution).
    ///
    /// Silently omits ids that do not exist or are inactive; the caller
    /// compares counts to decide whether the selection was satisfied.
    pub async fn fetch_active_by_ids(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<Tree>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM trees WHERE id = ANY($1) AND is_active = true ORDER BY id"
        );
        sqlx::query_as::<_, Tree>(&query)
            .bind(ids)
            .fetch_all(conn)
            .await
    }

    /// Fetch active trees matching a bulk selection filter (selection
    /// resolution), capped at `limit` rows.
    ///
    /// Pass the batch ceiling + 1 as `limit` so the caller can detect an
    /// oversized selection without loading the full match set.
    pub async fn fetch_active_by_filter(
        conn: &mut PgConnection,
        filter: &TreeFilter,
        limit: i64,
    ) -> Result<Vec<Tree>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_tree_filter(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM trees {where_clause} ORDER BY id LIMIT ${bind_idx}"
        );
        let q = bind_tree_values(sqlx::query_as::<_, Tree>(&query), &bind_values);
        q.bind(limit).fetch_all(conn).await
    }

    /// Apply column-level updates to every tree in `ids` as one UPDATE.
    ///
    /// Returns the number of rows affected.
    pub async fn bulk_update(
        conn: &mut PgConnection,
        ids: &[DbId],
        updates: &BulkTreeUpdates,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE trees SET \
                forest_id = COALESCE($2, forest_id), \
                species = COALESCE($3, species), \
                planted_at = COALESCE($4, planted_at), \
                died_at = COALESCE($5, died_at), \
                is_alive = COALESCE($6, is_alive), \
                updated_at = NOW() \
             WHERE id = ANY($1) AND is_active = true",
        )
        .bind(ids)
        .bind(updates.forest_id)
        .bind(&updates.species)
        .bind(updates.planted_at)
        .bind(updates.died_at)
        .bind(updates.is_alive)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Soft-delete every tree in `ids` as one UPDATE, recording the actor.
    pub async fn bulk_soft_delete(
        conn: &mut PgConnection,
        ids: &[DbId],
        deleted_by: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE trees SET is_active = false, deleted_at = NOW(), deleted_by = $2, \
                updated_at = NOW() \
             WHERE id = ANY($1) AND is_active = true",
        )
        .bind(ids)
        .bind(deleted_by)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Permanently delete every tree in `ids`.
    ///
    /// Measurements cascade at the schema level; image deactivation is the
    /// caller's responsibility (same transaction).
    pub async fn bulk_hard_delete(conn: &mut PgConnection, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trees WHERE id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built tree queries.
enum BindValue {
    BigInt(DbId),
    BigIntArray(Vec<DbId>),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

/// Build a WHERE clause and bind values from `TreeFilter` parameters.
///
/// Always excludes soft-deleted rows. Returns
/// `(where_clause, bind_values, next_bind_index)`.
fn build_tree_filter(filter: &TreeFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = vec!["is_active = true".to_string()];
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(forest_id) = filter.forest_id {
        conditions.push(format!("forest_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(forest_id));
    }

    if let Some(ref forest_ids) = filter.forest_ids {
        if !forest_ids.is_empty() {
            conditions.push(format!("forest_id = ANY(${bind_idx})"));
            bind_idx += 1;
            bind_values.push(BindValue::BigIntArray(forest_ids.clone()));
        }
    }

    if let Some(ref species) = filter.species {
        conditions.push(format!("LOWER(species) = LOWER(${bind_idx})"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(species.clone()));
    }

    if let Some(is_alive) = filter.is_alive {
        conditions.push(format!("is_alive = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Bool(is_alive));
    }

    if let Some(planted_after) = filter.planted_after {
        conditions.push(format!("planted_at >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Date(planted_after));
    }

    if let Some(planted_before) = filter.planted_before {
        conditions.push(format!("planted_at <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Date(planted_before));
    }

    let where_clause = format!("WHERE {}", conditions.join(" AND "));
    (where_clause, bind_values, bind_idx)
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
fn bind_tree_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        q = match val {
            BindValue::BigInt(v) => q.bind(*v),
            BindValue::BigIntArray(v) => q.bind(v),
            BindValue::Text(v) => q.bind(v.as_str()),
            BindValue::Bool(v) => q.bind(*v),
            BindValue::Date(v) => q.bind(*v),
        };
    }
    q
}
