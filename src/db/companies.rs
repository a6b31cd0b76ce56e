use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest, Scope};
use crate::models::{Company, CompanyInput};

/// A company is its own tenant, so scoping compares against `id`.
const SCOPED: &str = "($1::uuid IS NULL OR id = $1) AND is_deleted = $2";

const SEARCH: &str = "($3::text IS NULL OR name ILIKE $3 OR address ILIKE $3
     OR phone ILIKE $3 OR email ILIKE $3)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("name", "name"),
    ("email", "email"),
    ("updatedAt", "updated_at"),
];

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    deleted: Deleted,
) -> Result<Vec<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "SELECT * FROM companies WHERE {SCOPED} ORDER BY name"
    ))
    .bind(scope.company_id)
    .bind(deleted.flag())
    .fetch_all(pool)
    .await
}

pub async fn page(
    pool: &PgPool,
    scope: Scope,
    req: &PageRequest,
) -> Result<(Vec<Company>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, Company>(&format!(
        "SELECT * FROM companies WHERE {SCOPED} AND {SEARCH}
         ORDER BY {} LIMIT $4 OFFSET $5",
        req.order_by(SORT_COLUMNS)
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(&pattern)
    .bind(req.page_size)
    .bind(req.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM companies WHERE {SCOPED} AND {SEARCH}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub async fn find_by_id(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "SELECT * FROM companies WHERE {SCOPED} AND id = $3"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn exists_active(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1 AND NOT is_deleted)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    input: &CompanyInput,
    actor: Option<Uuid>,
) -> Result<Company, sqlx::Error> {
    sqlx::query_as::<_, Company>(
        "INSERT INTO companies (name, address, phone, email, created_by)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(actor)
    .fetch_one(executor)
    .await
}

pub async fn update(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    input: &CompanyInput,
    actor: Uuid,
) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "UPDATE companies
         SET name = $4, address = $5, phone = $6, email = $7, updated_at = now(), updated_by = $8
         WHERE {SCOPED} AND id = $3 RETURNING *"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.phone)
    .bind(&input.email)
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
        "UPDATE companies SET is_deleted = true, deleted_at = now(), deleted_by = $4
         WHERE {SCOPED} AND id = $3"
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
        "UPDATE companies
         SET is_deleted = false, deleted_at = NULL, deleted_by = NULL,
             updated_at = now(), updated_by = $4
         WHERE {SCOPED} AND id = $3"
    ))
    .bind(scope.company_id)
    .bind(true)
    .bind(id)
    .bind(actor)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count_active_users(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE company_id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_one(pool)
        .await
}
