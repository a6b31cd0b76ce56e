use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PasswordSetupToken;

/// Issue a new setup token, invalidating any earlier unused ones for the user.
pub async fn replace(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordSetupToken, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE password_setup_tokens SET used = true WHERE user_id = $1 AND used = false")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let token = sqlx::query_as::<_, PasswordSetupToken>(
        "INSERT INTO password_setup_tokens (user_id, token_hash, expires_at)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(token)
}

pub async fn find_valid_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<PasswordSetupToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordSetupToken>(
        "SELECT * FROM password_setup_tokens
         WHERE token_hash = $1 AND used = false AND expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Mark the token used. Returns false when a concurrent request got there first.
pub async fn claim(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let claimed = sqlx::query_scalar::<_, Uuid>(
        "UPDATE password_setup_tokens SET used = true WHERE id = $1 AND used = false RETURNING id",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(claimed.is_some())
}

pub async fn delete_stale(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM password_setup_tokens WHERE used = true OR expires_at < now()")
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
