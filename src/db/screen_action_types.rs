use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest};
use crate::models::{ScreenActionType, ScreenActionTypeInput};

const SEARCH: &str = "($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[("name", "name"), ("createdAt", "created_at")];

pub async fn list(pool: &PgPool, deleted: Deleted) -> Result<Vec<ScreenActionType>, sqlx::Error> {
    sqlx::query_as::<_, ScreenActionType>(
        "SELECT * FROM screen_action_types WHERE is_deleted = $1 ORDER BY name",
    )
    .bind(deleted.flag())
    .fetch_all(pool)
    .await
}

pub async fn page(
    pool: &PgPool,
    req: &PageRequest,
) -> Result<(Vec<ScreenActionType>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, ScreenActionType>(&format!(
        "SELECT * FROM screen_action_types WHERE is_deleted = $1 AND {SEARCH}
         ORDER BY {} LIMIT $3 OFFSET $4",
        req.order_by(SORT_COLUMNS)
    ))
    .bind(false)
    .bind(&pattern)
    .bind(req.page_size)
    .bind(req.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM screen_action_types WHERE is_deleted = $1 AND {SEARCH}"
    ))
    .bind(false)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ScreenActionType>, sqlx::Error> {
    sqlx::query_as::<_, ScreenActionType>(
        "SELECT * FROM screen_action_types WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    input: &ScreenActionTypeInput,
    actor: Uuid,
) -> Result<ScreenActionType, sqlx::Error> {
    sqlx::query_as::<_, ScreenActionType>(
        "INSERT INTO screen_action_types (name, description, created_by)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(actor)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    input: &ScreenActionTypeInput,
    actor: Uuid,
) -> Result<Option<ScreenActionType>, sqlx::Error> {
    sqlx::query_as::<_, ScreenActionType>(
        "UPDATE screen_action_types
         SET name = $2, description = $3, updated_at = now(), updated_by = $4
         WHERE id = $1 AND NOT is_deleted RETURNING *",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(actor)
    .fetch_optional(pool)
    .await
}

pub async fn soft_delete(pool: &PgPool, id: Uuid, actor: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE screen_action_types SET is_deleted = true, deleted_at = now(), deleted_by = $2
         WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .bind(actor)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn restore(pool: &PgPool, id: Uuid, actor: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE screen_action_types
         SET is_deleted = false, deleted_at = NULL, deleted_by = NULL,
             updated_at = now(), updated_by = $2
         WHERE id = $1 AND is_deleted",
    )
    .bind(id)
    .bind(actor)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
