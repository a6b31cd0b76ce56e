use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{record_change, PageParams};
use crate::auth::extractor::AuthUser;
use crate::auth::role::Role;
use crate::auth::{password, tokens};
use crate::bulk::{self, BulkDelete, BulkResult, BulkUpdateItem};
use crate::csv_io::{self, ImportReport};
use crate::db::users::UserFields;
use crate::db::{self, Deleted, Paged};
use crate::error::AppError;
use crate::models::{CreateUser, UpdateUser, User, UserCsvRow, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "user";
const EMAIL_TAKEN: &str = "A user with this email already exists";

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// A created user. `setupToken` is present only when no password was given,
/// and is never shown again.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupTokenResponse {
    pub setup_token: String,
}

/// Replace any outstanding setup token for the user with a fresh one.
async fn issue_setup_token(state: &AppState, user_id: Uuid) -> Result<String, AppError> {
    let token = tokens::generate();
    let expires_at = Utc::now() + Duration::hours(state.config.setup_token_hours);
    db::password_setup_tokens::replace(&state.pool, user_id, &tokens::hash(&token), expires_at)
        .await?;
    Ok(token)
}

fn check_assignable(auth: &AuthUser, role: Role) -> Result<(), AppError> {
    if auth.role.can_assign(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("You cannot assign the {role} role")))
    }
}

/// Nobody may act on an account that outranks them.
fn check_outranks(auth: &AuthUser, target: &User) -> Result<(), AppError> {
    if target.role() > auth.role {
        return Err(AppError::Forbidden(
            "You cannot modify a user with a higher role".to_string(),
        ));
    }
    Ok(())
}

async fn resolve_company(
    state: &AppState,
    auth: &AuthUser,
    requested: Option<Uuid>,
    current: Uuid,
) -> Result<Uuid, AppError> {
    match requested {
        Some(id) if auth.is_global_admin() && id != current => {
            if !db::companies::exists_active(&state.pool, id).await? {
                return Err(AppError::BadRequest("Company not found".to_string()));
            }
            Ok(id)
        }
        _ => Ok(current),
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_role(Role::Manager)?;
    let users = db::users::list(&state.pool, auth.scope().tenant_only(), Deleted::Excluded).await?;
    Ok(Json(users))
}

pub async fn paged(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<User>>, AppError> {
    auth.require_role(Role::Manager)?;
    let req = params.request();
    let (items, total) = db::users::page(&state.pool, auth.scope().tenant_only(), &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_role(Role::Admin)?;
    let users = db::users::list(&state.pool, auth.scope().tenant_only(), Deleted::Only).await?;
    Ok(Json(users))
}

/// Managers and above read any user in their company; everyone may read themselves.
pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    if id != auth.user_id {
        auth.require_role(Role::Manager)?;
    }
    let user = db::users::find_by_id(&state.pool, auth.scope().tenant_only(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(user))
}

async fn create_user(
    state: &AppState,
    auth: &AuthUser,
    input: CreateUser,
) -> Result<CreatedUser, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let role: Role = input.role.parse().map_err(AppError::BadRequest)?;
    check_assignable(auth, role)?;
    let company_id = resolve_company(state, auth, input.company_id, auth.company_id).await?;

    let password_hash = input
        .password
        .as_deref()
        .map(password::hash)
        .transpose()
        .map_err(AppError::Internal)?;

    let fields = UserFields {
        company_id,
        email: &input.email,
        first_name: &input.first_name,
        last_name: &input.last_name,
        role: role.as_str(),
    };
    let user = db::users::create(
        &state.pool,
        &fields,
        password_hash.as_deref(),
        Some(auth.user_id),
    )
    .await
    .map_err(AppError::conflict_on_unique(EMAIL_TAKEN))?;

    let setup_token = if user.is_password_set {
        None
    } else {
        Some(issue_setup_token(state, user.id).await?)
    };

    record_change(state, auth, ENTITY, ChangeAction::Created, user.id, Some(company_id)).await;
    Ok(CreatedUser { user, setup_token })
}

async fn update_user(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: UpdateUser,
) -> Result<User, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let scope = auth.scope().tenant_only();
    let existing = db::users::find_by_id(&state.pool, scope, id)
        .await?
        .ok_or_else(not_found)?;

    let current_role = existing.role();
    let role = match input.role.as_deref() {
        Some(r) => r.parse().map_err(AppError::BadRequest)?,
        None => current_role,
    };
    let moves_company = input
        .company_id
        .is_some_and(|cid| cid != existing.company_id);

    if id == auth.user_id {
        if role != current_role || moves_company {
            return Err(AppError::Forbidden(
                "You cannot change your own role or company".to_string(),
            ));
        }
    } else {
        auth.require_role(Role::Admin)?;
        check_outranks(auth, &existing)?;
        if role != current_role {
            check_assignable(auth, role)?;
        }
    }

    let company_id = resolve_company(state, auth, input.company_id, existing.company_id).await?;

    let fields = UserFields {
        company_id,
        email: &input.email,
        first_name: &input.first_name,
        last_name: &input.last_name,
        role: role.as_str(),
    };
    let user = db::users::update(&state.pool, scope, id, &fields, auth.user_id)
        .await
        .map_err(AppError::conflict_on_unique(EMAIL_TAKEN))?
        .ok_or_else(not_found)?;

    record_change(state, auth, ENTITY, ChangeAction::Updated, id, Some(user.company_id)).await;
    Ok(user)
}

async fn delete_user(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    if id == auth.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let scope = auth.scope().tenant_only();
    let existing = db::users::find_by_id(&state.pool, scope, id)
        .await?
        .ok_or_else(not_found)?;
    check_outranks(auth, &existing)?;

    if !db::users::soft_delete(&state.pool, scope, id, auth.user_id).await? {
        return Err(not_found());
    }
    db::refresh_tokens::revoke_all(&state.pool, id).await?;

    record_change(state, auth, ENTITY, ChangeAction::Deleted, id, Some(existing.company_id)).await;
    Ok(id)
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<CreatedUser>), AppError> {
    auth.require_role(Role::Admin)?;
    let created = create_user(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> Result<StatusCode, AppError> {
    update_user(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;
    delete_user(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;

    let restored = db::users::restore(&state.pool, auth.scope().tenant_only(), id, auth.user_id)
        .await
        .map_err(AppError::conflict_on_unique(EMAIL_TAKEN))?;
    if !restored {
        return Err(not_found());
    }

    let company_id = db::users::find_by_id(&state.pool, auth.scope().tenant_only(), id)
        .await?
        .map(|u| u.company_id);
    record_change(&state, &auth, ENTITY, ChangeAction::Restored, id, company_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Clear the password and hand back a fresh setup token. Signs the user out everywhere.
pub async fn reset_password(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SetupTokenResponse>, AppError> {
    auth.require_role(Role::Admin)?;

    let scope = auth.scope().tenant_only();
    let existing = db::users::find_by_id(&state.pool, scope, id)
        .await?
        .ok_or_else(not_found)?;
    check_outranks(&auth, &existing)?;

    if !db::users::clear_password(&state.pool, scope, id, auth.user_id).await? {
        return Err(not_found());
    }
    db::refresh_tokens::revoke_all(&state.pool, id).await?;
    let setup_token = issue_setup_token(&state, id).await?;

    tracing::info!(user_id = %id, by = %auth.user_id, "Password reset issued");
    record_change(&state, &auth, ENTITY, ChangeAction::Updated, id, Some(existing.company_id))
        .await;

    Ok(Json(SetupTokenResponse { setup_token }))
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<CreateUser>>,
) -> Result<Json<BulkResult<CreatedUser>>, AppError> {
    auth.require_role(Role::Admin)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_user(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<UpdateUser>>>,
) -> Result<Json<BulkResult<User>>, AppError> {
    auth.require_role(Role::Admin)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| update_user(state, auth, item.id, item.data)).await;
    Ok(Json(result))
}

pub async fn bulk_delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<BulkDelete>,
) -> Result<Json<BulkResult<Uuid>>, AppError> {
    auth.require_role(Role::Admin)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run_deletes(req.ids, move |id| delete_user(state, auth, id)).await;
    Ok(Json(result))
}

/// Imported users have no password; an admin issues their setup tokens with reset-password.
pub async fn import(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    auth.require_role(Role::Admin)?;
    let data = csv_io::read_upload(&headers, body).await?;
    let parsed = csv_io::parse::<CreateUser>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_user(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    auth.require_role(Role::Admin)?;
    let users = db::users::list(&state.pool, auth.scope().tenant_only(), Deleted::Excluded).await?;
    let rows: Vec<UserCsvRow> = users.iter().map(UserCsvRow::from).collect();
    csv_io::attachment("users.csv", &rows)
}
