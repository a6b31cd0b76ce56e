use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest, Scope, TENANT};
use crate::models::{ScreenAction, ScreenActionInput};

/// An action is visible when its screen's project is.
const VISIBLE: &str = "($3::uuid IS NULL OR screen_id IN (
     SELECT s.id FROM screens s JOIN projects p ON p.id = s.project_id
     WHERE p.owner_id = $3 OR p.is_shared))";

const BY_SCREEN: &str = "($4::uuid IS NULL OR screen_id = $4)";

const SEARCH: &str = "($5::text IS NULL OR name ILIKE $5 OR description ILIKE $5
     OR action_type_name ILIKE $5 OR screen_name ILIKE $5)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("sortOrder", "sort_order"),
    ("createdAt", "created_at"),
    ("name", "name"),
    ("actionTypeName", "action_type_name"),
    ("screenName", "screen_name"),
];

const RETURNING_VIEW: &str = "SELECT r.*, s.name AS screen_name, t.name AS action_type_name
     FROM returned r
     JOIN screens s ON s.id = r.screen_id
     JOIN screen_action_types t ON t.id = r.action_type_id";

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    screen_id: Option<Uuid>,
    deleted: Deleted,
) -> Result<Vec<ScreenAction>, sqlx::Error> {
    sqlx::query_as::<_, ScreenAction>(&format!(
        "SELECT * FROM screen_action_view WHERE {TENANT} AND {VISIBLE} AND {BY_SCREEN}
         ORDER BY screen_name, sort_order, name"
    ))
    .bind(scope.company_id)
    .bind(deleted.flag())
    .bind(scope.owner_id)
    .bind(screen_id)
    .fetch_all(pool)
    .await
}

pub async fn page(
    pool: &PgPool,
    scope: Scope,
    screen_id: Option<Uuid>,
    req: &PageRequest,
) -> Result<(Vec<ScreenAction>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, ScreenAction>(&format!(
        "SELECT * FROM screen_action_view WHERE {TENANT} AND {VISIBLE} AND {BY_SCREEN} AND {SEARCH}
         ORDER BY {} LIMIT $6 OFFSET $7",
        req.order_by(SORT_COLUMNS)
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(screen_id)
    .bind(&pattern)
    .bind(req.page_size)
    .bind(req.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM screen_action_view
         WHERE {TENANT} AND {VISIBLE} AND {BY_SCREEN} AND {SEARCH}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(screen_id)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub async fn find_by_id(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
) -> Result<Option<ScreenAction>, sqlx::Error> {
    sqlx::query_as::<_, ScreenAction>(&format!(
        "SELECT * FROM screen_action_view WHERE {TENANT} AND {VISIBLE} AND id = $4"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// `company_id` must be the owning screen's company.
pub async fn create(
    pool: &PgPool,
    company_id: Uuid,
    input: &ScreenActionInput,
    actor: Uuid,
) -> Result<ScreenAction, sqlx::Error> {
    sqlx::query_as::<_, ScreenAction>(&format!(
        "WITH returned AS (
             INSERT INTO screen_actions (company_id, screen_id, action_type_id, name,
                                         description, sort_order, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(company_id)
    .bind(input.screen_id)
    .bind(input.action_type_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.sort_order)
    .bind(actor)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    input: &ScreenActionInput,
    actor: Uuid,
) -> Result<Option<ScreenAction>, sqlx::Error> {
    sqlx::query_as::<_, ScreenAction>(&format!(
        "WITH returned AS (
             UPDATE screen_actions
             SET screen_id = $4, action_type_id = $5, name = $6, description = $7,
                 sort_order = $8, updated_at = now(), updated_by = $9
             WHERE {TENANT} AND id = $3
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(input.screen_id)
    .bind(input.action_type_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.sort_order)
    .bind(actor)
    .fetch_optional(pool)
    .await
}

pub async fn soft_delete(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    actor: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE screen_actions SET is_deleted = true, deleted_at = now(), deleted_by = $4
         WHERE {TENANT} AND id = $3"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(actor)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn restore(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    actor: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE screen_actions
         SET is_deleted = false, deleted_at = NULL, deleted_by = NULL,
             updated_at = now(), updated_by = $4
         WHERE {TENANT} AND id = $3"
    ))
    .bind(scope.company_id)
    .bind(true)
    .bind(id)
    .bind(actor)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
