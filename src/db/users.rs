use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest, Scope, TENANT};
use crate::models::User;

const SEARCH: &str = "($3::text IS NULL OR email ILIKE $3 OR first_name ILIKE $3
     OR last_name ILIKE $3 OR company_name ILIKE $3)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("email", "email"),
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("role", "role"),
    ("lastLoginAt", "last_login_at"),
];

/// Columns written on create and update.
pub struct UserFields<'a> {
    pub company_id: Uuid,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: &'a str,
}

pub async fn list(pool: &PgPool, scope: Scope, deleted: Deleted) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT * FROM user_view WHERE {TENANT} ORDER BY last_name, first_name"
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
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, User>(&format!(
        "SELECT * FROM user_view WHERE {TENANT} AND {SEARCH}
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
        "SELECT COUNT(*) FROM user_view WHERE {TENANT} AND {SEARCH}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub async fn find_by_id(pool: &PgPool, scope: Scope, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT * FROM user_view WHERE {TENANT} AND id = $3"))
        .bind(scope.company_id)
        .bind(false)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Active users only; a soft-deleted account cannot sign in.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM user_view WHERE lower(email) = lower($1) AND NOT is_deleted",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await
}

pub async fn count_all<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(executor)
        .await
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    fields: &UserFields<'_>,
    password_hash: Option<&str>,
    actor: Option<Uuid>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "WITH inserted AS (
             INSERT INTO users (company_id, email, first_name, last_name, role,
                                password_hash, is_password_set, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $6 IS NOT NULL, $7)
             RETURNING *
         )
         SELECT i.*, c.name AS company_name
         FROM inserted i JOIN companies c ON c.id = i.company_id",
    )
    .bind(fields.company_id)
    .bind(fields.email)
    .bind(fields.first_name)
    .bind(fields.last_name)
    .bind(fields.role)
    .bind(password_hash)
    .bind(actor)
    .fetch_one(executor)
    .await
}

pub async fn update(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    fields: &UserFields<'_>,
    actor: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "WITH updated AS (
             UPDATE users
             SET company_id = $4, email = $5, first_name = $6, last_name = $7, role = $8,
                 updated_at = now(), updated_by = $9
             WHERE {TENANT} AND id = $3
             RETURNING *
         )
         SELECT u.*, c.name AS company_name
         FROM updated u JOIN companies c ON c.id = u.company_id"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(fields.company_id)
    .bind(fields.email)
    .bind(fields.first_name)
    .bind(fields.last_name)
    .bind(fields.role)
    .bind(actor)
    .fetch_optional(pool)
    .await
}

pub async fn set_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET password_hash = $2, is_password_set = true, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(())
}

/// Put the account back into the awaiting-setup state.
pub async fn clear_password(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    actor: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE users
         SET password_hash = NULL, is_password_set = false, updated_at = now(), updated_by = $4
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

pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn soft_delete(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    actor: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE users SET is_deleted = true, deleted_at = now(), deleted_by = $4
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
        "UPDATE users
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
