use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest, Scope, TENANT};
use crate::models::{Project, ProjectInput};

/// Plain users see what they own plus anything shared within their company.
const VISIBLE: &str = "($3::uuid IS NULL OR owner_id = $3 OR is_shared)";

const SEARCH: &str = "($4::text IS NULL OR name ILIKE $4 OR description ILIKE $4
     OR owner_email ILIKE $4)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("name", "name"),
    ("ownerEmail", "owner_email"),
    ("isShared", "is_shared"),
    ("updatedAt", "updated_at"),
];

const RETURNING_VIEW: &str = "SELECT r.*, c.name AS company_name, u.email AS owner_email
     FROM returned r
     JOIN companies c ON c.id = r.company_id
     JOIN users u ON u.id = r.owner_id";

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    deleted: Deleted,
) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT * FROM project_view WHERE {TENANT} AND {VISIBLE} ORDER BY name"
    ))
    .bind(scope.company_id)
    .bind(deleted.flag())
    .bind(scope.owner_id)
    .fetch_all(pool)
    .await
}

pub async fn page(
    pool: &PgPool,
    scope: Scope,
    req: &PageRequest,
) -> Result<(Vec<Project>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, Project>(&format!(
        "SELECT * FROM project_view WHERE {TENANT} AND {VISIBLE} AND {SEARCH}
         ORDER BY {} LIMIT $5 OFFSET $6",
        req.order_by(SORT_COLUMNS)
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(&pattern)
    .bind(req.page_size)
    .bind(req.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM project_view WHERE {TENANT} AND {VISIBLE} AND {SEARCH}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub async fn recent(pool: &PgPool, scope: Scope, limit: i64) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT * FROM project_view WHERE {TENANT} AND {VISIBLE}
         ORDER BY created_at DESC LIMIT $4"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, scope: Scope) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM projects WHERE {TENANT} AND {VISIBLE}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .fetch_one(pool)
    .await
}

/// Owner of a private project, regardless of its delete state.
pub async fn private_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT owner_id FROM projects WHERE id = $1 AND NOT is_shared")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT * FROM project_view WHERE {TENANT} AND {VISIBLE} AND id = $4"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(scope.owner_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    company_id: Uuid,
    owner_id: Uuid,
    input: &ProjectInput,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "WITH returned AS (
             INSERT INTO projects (company_id, owner_id, name, description, is_shared, created_by)
             VALUES ($1, $2, $3, $4, $5, $2)
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(company_id)
    .bind(owner_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.is_shared)
    .fetch_one(pool)
    .await
}

/// Tenant-checked update. Ownership is checked by the caller beforehand.
pub async fn update(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    input: &ProjectInput,
    actor: Uuid,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "WITH returned AS (
             UPDATE projects
             SET name = $4, description = $5, is_shared = $6, updated_at = now(), updated_by = $7
             WHERE {TENANT} AND id = $3
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.is_shared)
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
        "UPDATE projects SET is_deleted = true, deleted_at = now(), deleted_by = $4
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
        "UPDATE projects
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
