use sqlx::PgPool;

use super::{Scope, TENANT};

/// Active row count of a company-owned table. Only called with table names
/// from this crate, never with request input.
pub async fn count_table(pool: &PgPool, table: &'static str, scope: Scope) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE {TENANT}"))
        .bind(scope.company_id)
        .bind(false)
        .fetch_one(pool)
        .await
}

pub async fn count_companies(pool: &PgPool, scope: Scope) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM companies WHERE ($1::uuid IS NULL OR id = $1) AND NOT is_deleted")
        .bind(scope.company_id)
        .fetch_one(pool)
        .await
}
