use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest, Scope, TENANT};
use crate::models::{Employee, EmployeeInput};

const SEARCH: &str = "($3::text IS NULL OR first_name ILIKE $3 OR last_name ILIKE $3
     OR email ILIKE $3 OR phone ILIKE $3 OR position ILIKE $3)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("position", "position"),
    ("hiredOn", "hired_on"),
];

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    deleted: Deleted,
) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT * FROM employees WHERE {TENANT} ORDER BY last_name, first_name"
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
) -> Result<(Vec<Employee>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, Employee>(&format!(
        "SELECT * FROM employees WHERE {TENANT} AND {SEARCH}
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
        "SELECT COUNT(*) FROM employees WHERE {TENANT} AND {SEARCH}"
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
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!("SELECT * FROM employees WHERE {TENANT} AND id = $3"))
        .bind(scope.company_id)
        .bind(false)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    company_id: Uuid,
    input: &EmployeeInput,
    actor: Uuid,
) -> Result<Employee, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        "INSERT INTO employees (company_id, user_id, first_name, last_name, email, phone,
                                position, hired_on, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(company_id)
    .bind(input.user_id)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.position)
    .bind(input.hired_on)
    .bind(actor)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    input: &EmployeeInput,
    actor: Uuid,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "UPDATE employees
         SET user_id = $4, first_name = $5, last_name = $6, email = $7, phone = $8,
             position = $9, hired_on = $10, updated_at = now(), updated_by = $11
         WHERE {TENANT} AND id = $3 RETURNING *"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(input.user_id)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.position)
    .bind(input.hired_on)
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
        "UPDATE employees SET is_deleted = true, deleted_at = now(), deleted_by = $4
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
        "UPDATE employees
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
