use axum::extract::State;
use axum::Json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::Dashboard;
use crate::state::SharedState;

const RECENT_LIMIT: i64 = 5;

/// Active row counts in the caller's scope plus their most recent projects and notes.
pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Dashboard>, AppError> {
    let pool = &state.pool;
    let visible = auth.scope();
    let tenant = visible.tenant_only();

    let dashboard = Dashboard {
        companies: db::dashboard::count_companies(pool, tenant).await?,
        users: db::dashboard::count_table(pool, "users", tenant).await?,
        employees: db::dashboard::count_table(pool, "employees", tenant).await?,
        projects: db::projects::count(pool, visible).await?,
        screens: db::screens::count(pool, visible).await?,
        notes: db::notes::count(pool, visible).await?,
        recent_projects: db::projects::recent(pool, visible, RECENT_LIMIT).await?,
        recent_notes: db::notes::recent(pool, visible, RECENT_LIMIT).await?,
    };

    Ok(Json(dashboard))
}
