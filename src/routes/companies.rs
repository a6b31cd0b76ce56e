use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use super::{record_change, PageParams};
use crate::auth::extractor::AuthUser;
use crate::auth::role::Role;
use crate::bulk::{self, BulkDelete, BulkResult, BulkUpdateItem};
use crate::csv_io::{self, ImportReport};
use crate::db::{self, Deleted, Paged};
use crate::error::AppError;
use crate::models::{Company, CompanyCsvRow, CompanyInput, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "company";
const NAME_TAKEN: &str = "A company with this name already exists";

fn not_found() -> AppError {
    AppError::NotFound("Company not found".to_string())
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Company>>, AppError> {
    let companies =
        db::companies::list(&state.pool, auth.scope().tenant_only(), Deleted::Excluded).await?;
    Ok(Json(companies))
}

pub async fn paged(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<Company>>, AppError> {
    let req = params.request();
    let (items, total) = db::companies::page(&state.pool, auth.scope().tenant_only(), &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Company>>, AppError> {
    auth.require_global_admin()?;
    let companies =
        db::companies::list(&state.pool, auth.scope().tenant_only(), Deleted::Only).await?;
    Ok(Json(companies))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    let company = db::companies::find_by_id(&state.pool, auth.scope().tenant_only(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(company))
}

async fn create_company(
    state: &AppState,
    auth: &AuthUser,
    input: CompanyInput,
) -> Result<Company, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let company = db::companies::create(&state.pool, &input, Some(auth.user_id))
        .await
        .map_err(AppError::conflict_on_unique(NAME_TAKEN))?;

    record_change(state, auth, ENTITY, ChangeAction::Created, company.id, Some(company.id)).await;
    Ok(company)
}

async fn update_company(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: CompanyInput,
) -> Result<Company, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let company = db::companies::update(
        &state.pool,
        auth.scope().tenant_only(),
        id,
        &input,
        auth.user_id,
    )
    .await
    .map_err(AppError::conflict_on_unique(NAME_TAKEN))?
    .ok_or_else(not_found)?;

    record_change(state, auth, ENTITY, ChangeAction::Updated, id, Some(id)).await;
    Ok(company)
}

async fn delete_company(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    if db::companies::count_active_users(&state.pool, id).await? > 0 {
        return Err(AppError::BadRequest(
            "Cannot delete a company that still has active users".to_string(),
        ));
    }

    let deleted =
        db::companies::soft_delete(&state.pool, auth.scope().tenant_only(), id, auth.user_id)
            .await?;
    if !deleted {
        return Err(not_found());
    }

    record_change(state, auth, ENTITY, ChangeAction::Deleted, id, Some(id)).await;
    Ok(id)
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<CompanyInput>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    auth.require_global_admin()?;
    let company = create_company(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// Global admins edit any company; an admin may edit their own.
pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CompanyInput>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;
    update_company(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_global_admin()?;
    delete_company(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_global_admin()?;

    let restored = db::companies::restore(&state.pool, auth.scope().tenant_only(), id, auth.user_id)
        .await
        .map_err(AppError::conflict_on_unique(NAME_TAKEN))?;
    if !restored {
        return Err(not_found());
    }

    record_change(&state, &auth, ENTITY, ChangeAction::Restored, id, Some(id)).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<CompanyInput>>,
) -> Result<Json<BulkResult<Company>>, AppError> {
    auth.require_global_admin()?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_company(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<CompanyInput>>>,
) -> Result<Json<BulkResult<Company>>, AppError> {
    auth.require_global_admin()?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| {
        update_company(state, auth, item.id, item.data)
    })
    .await;
    Ok(Json(result))
}

pub async fn bulk_delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<BulkDelete>,
) -> Result<Json<BulkResult<Uuid>>, AppError> {
    auth.require_global_admin()?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run_deletes(req.ids, move |id| delete_company(state, auth, id)).await;
    Ok(Json(result))
}

pub async fn import(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    auth.require_global_admin()?;
    let data = csv_io::read_upload(&headers, body).await?;
    let parsed = csv_io::parse::<CompanyInput>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_company(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    let companies =
        db::companies::list(&state.pool, auth.scope().tenant_only(), Deleted::Excluded).await?;
    let rows: Vec<CompanyCsvRow> = companies.iter().map(CompanyCsvRow::from).collect();
    csv_io::attachment("companies.csv", &rows)
}
