use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest, Scope, TENANT};
use crate::models::{Screen, ScreenInput};

/// A screen is visible when its project is.
const VISIBLE: &str = "($3::uuid IS NULL OR project_id IN (
     SELECT id FROM projects WHERE owner_id = $3 OR is_shared))";

const BY_PROJECT: &str = "($4::uuid IS NULL OR project_id = $4)";

const SEARCH: &str = "($5::text IS NULL OR name ILIKE $5 OR description ILIKE $5
     OR route ILIKE $5 OR project_name ILIKE $5)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("name", "name"),
    ("route", "route"),
    ("projectName", "project_name"),
];

const RETURNING_VIEW: &str = "SELECT r.*, p.name AS project_name
     FROM returned r JOIN projects p ON p.id = r.project_id";

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    project_id: Option<Uuid>,
    deleted: Deleted,
) -> Result<Vec<Screen>, sqlx::Error> {
    sqlx::query_as::<_, Screen>(&format!(
        "SELECT * FROM screen_view WHERE {TENANT} AND {VISIBLE} AND {BY_PROJECT}
         ORDER BY project_name, name"
    ))
    .bind(scope.company_id)
    .bind(deleted.flag())
    .bind(scope.owner_id)
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn page(
    pool: &PgPool,
    scope: Scope,
    project_id: Option<Uuid>,
    req: &PageRequest,
) -> Result<(Vec<Screen>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, Screen>(&format!(
        "SELECT * FROM screen_view WHERE {TENANT} AND {VISIBLE} AND {BY_PROJECT} AND {SEARCH}
         ORDER BY {} LIMIT $6 OFFSET $7",
        req.order_by(SORT_COLUMNS)
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(project_id)
    .bind(&pattern)
    .bind(req.page_size)
    .bind(req.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM screen_view WHERE {TENANT} AND {VISIBLE} AND {BY_PROJECT} AND {SEARCH}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(project_id)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub async fn count(pool: &PgPool, scope: Scope) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM screens WHERE {TENANT} AND {VISIBLE}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .fetch_one(pool)
    .await
}

/// Owner of the private project a screen belongs to.
pub async fn private_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT p.owner_id FROM screens s JOIN projects p ON p.id = s.project_id
         WHERE s.id = $1 AND NOT p.is_shared",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
) -> Result<Option<Screen>, sqlx::Error> {
    sqlx::query_as::<_, Screen>(&format!(
        "SELECT * FROM screen_view WHERE {TENANT} AND {VISIBLE} AND id = $4"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// `company_id` must be the owning project's company.
pub async fn create(
    pool: &PgPool,
    company_id: Uuid,
    input: &ScreenInput,
    actor: Uuid,
) -> Result<Screen, sqlx::Error> {
    sqlx::query_as::<_, Screen>(&format!(
        "WITH returned AS (
             INSERT INTO screens (company_id, project_id, name, description, route, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(company_id)
    .bind(input.project_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.route)
    .bind(actor)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    input: &ScreenInput,
    actor: Uuid,
) -> Result<Option<Screen>, sqlx::Error> {
    sqlx::query_as::<_, Screen>(&format!(
        "WITH returned AS (
             UPDATE screens
             SET project_id = $4, name = $5, description = $6, route = $7,
                 updated_at = now(), updated_by = $8
             WHERE {TENANT} AND id = $3
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(input.project_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.route)
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
        "UPDATE screens SET is_deleted = true, deleted_at = now(), deleted_by = $4
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
        "UPDATE screens
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
