use sqlx::PgPool;
use uuid::Uuid;

use super::{Deleted, PageRequest, Scope, TENANT};
use crate::models::{Note, NoteInput};

/// Plain users only see their own notes.
const VISIBLE: &str = "($3::uuid IS NULL OR author_id = $3)";

const BY_PROJECT: &str = "($4::uuid IS NULL OR project_id = $4)";

const SEARCH: &str = "($5::text IS NULL OR title ILIKE $5 OR content ILIKE $5
     OR author_email ILIKE $5)";

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("title", "title"),
    ("authorEmail", "author_email"),
    ("updatedAt", "updated_at"),
];

const RETURNING_VIEW: &str = "SELECT r.*, u.email AS author_email
     FROM returned r JOIN users u ON u.id = r.author_id";

pub async fn list(
    pool: &PgPool,
    scope: Scope,
    project_id: Option<Uuid>,
    deleted: Deleted,
) -> Result<Vec<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT * FROM note_view WHERE {TENANT} AND {VISIBLE} AND {BY_PROJECT}
         ORDER BY created_at DESC"
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
) -> Result<(Vec<Note>, i64), sqlx::Error> {
    let pattern = req.search_pattern();

    let items = sqlx::query_as::<_, Note>(&format!(
        "SELECT * FROM note_view WHERE {TENANT} AND {VISIBLE} AND {BY_PROJECT} AND {SEARCH}
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
        "SELECT COUNT(*) FROM note_view WHERE {TENANT} AND {VISIBLE} AND {BY_PROJECT} AND {SEARCH}"
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

pub async fn recent(pool: &PgPool, scope: Scope, limit: i64) -> Result<Vec<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT * FROM note_view WHERE {TENANT} AND {VISIBLE}
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
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM notes WHERE {TENANT} AND {VISIBLE}"))
        .bind(scope.company_id)
        .bind(false)
        .bind(scope.owner_id)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, scope: Scope, id: Uuid) -> Result<Option<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT * FROM note_view WHERE {TENANT} AND {VISIBLE} AND id = $4"
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
    author_id: Uuid,
    input: &NoteInput,
) -> Result<Note, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "WITH returned AS (
             INSERT INTO notes (company_id, author_id, project_id, title, content, created_by)
             VALUES ($1, $2, $3, $4, $5, $2)
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(company_id)
    .bind(author_id)
    .bind(input.project_id)
    .bind(&input.title)
    .bind(&input.content)
    .fetch_one(pool)
    .await
}

/// Tenant-checked update. Authorship is checked by the caller beforehand.
pub async fn update(
    pool: &PgPool,
    scope: Scope,
    id: Uuid,
    input: &NoteInput,
    actor: Uuid,
) -> Result<Option<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "WITH returned AS (
             UPDATE notes
             SET project_id = $4, title = $5, content = $6, updated_at = now(), updated_by = $7
             WHERE {TENANT} AND id = $3
             RETURNING *
         )
         {RETURNING_VIEW}"
    ))
    .bind(scope.company_id)
    .bind(false)
    .bind(id)
    .bind(input.project_id)
    .bind(&input.title)
    .bind(&input.content)
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
        "UPDATE notes SET is_deleted = true, deleted_at = now(), deleted_by = $4
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
        "UPDATE notes
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
