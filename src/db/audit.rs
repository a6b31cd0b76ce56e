use sqlx::PgPool;
use uuid::Uuid;

/// One row of the audit trail. `action` is `<entity>.<verb>`, e.g. `project.deleted`.
#[derive(Debug, Clone, Copy)]
pub struct AuditEvent<'a> {
    pub company_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: &'a str,
    pub entity: &'a str,
    pub entity_id: Option<Uuid>,
}

pub async fn insert(pool: &PgPool, event: &AuditEvent<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (company_id, user_id, action, entity, entity_id)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(event.company_id)
    .bind(event.user_id)
    .bind(event.action)
    .bind(event.entity)
    .bind(event.entity_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Write the event, logging instead of failing when the insert errors.
pub async fn record(pool: &PgPool, event: AuditEvent<'_>) {
    if let Err(e) = insert(pool, &event).await {
        tracing::error!(action = event.action, "Failed to write audit event: {e}");
    }
}
