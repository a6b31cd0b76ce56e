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
use crate::db::{self, Deleted, Paged, Scope};
use crate::error::AppError;
use crate::models::{Employee, EmployeeCsvRow, EmployeeInput, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "employee";

fn not_found() -> AppError {
    AppError::NotFound("Employee not found".to_string())
}

/// A linked user account must belong to the employee's company.
async fn check_linked_user(
    state: &AppState,
    company_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<(), AppError> {
    let Some(user_id) = user_id else {
        return Ok(());
    };
    db::users::find_by_id(&state.pool, Scope::company(company_id), user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Linked user not found in this company".to_string()))?;
    Ok(())
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Employee>>, AppError> {
    let employees =
        db::employees::list(&state.pool, auth.scope().tenant_only(), Deleted::Excluded).await?;
    Ok(Json(employees))
}

pub async fn paged(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<Employee>>, AppError> {
    let req = params.request();
    let (items, total) = db::employees::page(&state.pool, auth.scope().tenant_only(), &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Employee>>, AppError> {
    auth.require_role(Role::Admin)?;
    let employees =
        db::employees::list(&state.pool, auth.scope().tenant_only(), Deleted::Only).await?;
    Ok(Json(employees))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Employee>, AppError> {
    let employee = db::employees::find_by_id(&state.pool, auth.scope().tenant_only(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(employee))
}

async fn create_employee(
    state: &AppState,
    auth: &AuthUser,
    input: EmployeeInput,
) -> Result<Employee, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let company_id = auth.target_company(input.company_id);
    if company_id != auth.company_id && !db::companies::exists_active(&state.pool, company_id).await? {
        return Err(AppError::BadRequest("Company not found".to_string()));
    }
    check_linked_user(state, company_id, input.user_id).await?;

    let employee = db::employees::create(&state.pool, company_id, &input, auth.user_id).await?;

    record_change(state, auth, ENTITY, ChangeAction::Created, employee.id, Some(company_id)).await;
    Ok(employee)
}

/// The company of an existing employee never changes.
async fn update_employee(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: EmployeeInput,
) -> Result<Employee, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let scope = auth.scope().tenant_only();
    let existing = db::employees::find_by_id(&state.pool, scope, id)
        .await?
        .ok_or_else(not_found)?;
    check_linked_user(state, existing.company_id, input.user_id).await?;

    let employee = db::employees::update(&state.pool, scope, id, &input, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    record_change(state, auth, ENTITY, ChangeAction::Updated, id, Some(employee.company_id)).await;
    Ok(employee)
}

async fn delete_employee(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    let scope = auth.scope().tenant_only();
    let existing = db::employees::find_by_id(&state.pool, scope, id)
        .await?
        .ok_or_else(not_found)?;

    if !db::employees::soft_delete(&state.pool, scope, id, auth.user_id).await? {
        return Err(not_found());
    }

    record_change(state, auth, ENTITY, ChangeAction::Deleted, id, Some(existing.company_id)).await;
    Ok(id)
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<EmployeeInput>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    auth.require_role(Role::Manager)?;
    let employee = create_employee(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<EmployeeInput>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Manager)?;
    update_employee(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Manager)?;
    delete_employee(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;

    let scope = auth.scope().tenant_only();
    if !db::employees::restore(&state.pool, scope, id, auth.user_id).await? {
        return Err(not_found());
    }

    let company_id = db::employees::find_by_id(&state.pool, scope, id)
        .await?
        .map(|e| e.company_id);
    record_change(&state, &auth, ENTITY, ChangeAction::Restored, id, company_id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<EmployeeInput>>,
) -> Result<Json<BulkResult<Employee>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_employee(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<EmployeeInput>>>,
) -> Result<Json<BulkResult<Employee>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| {
        update_employee(state, auth, item.id, item.data)
    })
    .await;
    Ok(Json(result))
}

pub async fn bulk_delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<BulkDelete>,
) -> Result<Json<BulkResult<Uuid>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run_deletes(req.ids, move |id| delete_employee(state, auth, id)).await;
    Ok(Json(result))
}

pub async fn import(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    auth.require_role(Role::Manager)?;
    let data = csv_io::read_upload(&headers, body).await?;
    let parsed = csv_io::parse::<EmployeeInput>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_employee(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    let employees =
        db::employees::list(&state.pool, auth.scope().tenant_only(), Deleted::Excluded).await?;
    let rows: Vec<EmployeeCsvRow> = employees.iter().map(EmployeeCsvRow::from).collect();
    csv_io::attachment("employees.csv", &rows)
}
