use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use super::{record_owned_change, PageParams};
use crate::auth::extractor::AuthUser;
use crate::auth::role::Role;
use crate::bulk::{self, BulkDelete, BulkResult, BulkUpdateItem};
use crate::csv_io::{self, ImportReport};
use crate::db::{self, Deleted, Paged};
use crate::error::AppError;
use crate::models::{Project, ProjectCsvRow, ProjectInput, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "project";

fn not_found() -> AppError {
    AppError::NotFound("Project not found".to_string())
}

/// Load a project the caller can see and is allowed to change.
async fn find_modifiable(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Project, AppError> {
    let project = db::projects::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    if !auth.can_modify_owned(project.owner_id) {
        return Err(AppError::Forbidden(
            "Only the owner or a manager may modify this project".to_string(),
        ));
    }
    Ok(project)
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = db::projects::list(&state.pool, auth.scope(), Deleted::Excluded).await?;
    Ok(Json(projects))
}

pub async fn paged(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<Project>>, AppError> {
    let req = params.request();
    let (items, total) = db::projects::page(&state.pool, auth.scope(), &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Project>>, AppError> {
    auth.require_role(Role::Admin)?;
    let projects = db::projects::list(&state.pool, auth.scope(), Deleted::Only).await?;
    Ok(Json(projects))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = db::projects::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(project))
}

async fn create_project(
    state: &AppState,
    auth: &AuthUser,
    input: ProjectInput,
) -> Result<Project, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let company_id = auth.target_company(input.company_id);
    if company_id != auth.company_id && !db::companies::exists_active(&state.pool, company_id).await? {
        return Err(AppError::BadRequest("Company not found".to_string()));
    }

    let project = db::projects::create(&state.pool, company_id, auth.user_id, &input).await?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Created,
        project.id,
        Some(company_id),
        project.private_owner(),
    )
    .await;
    Ok(project)
}

async fn update_project(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: ProjectInput,
) -> Result<Project, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    find_modifiable(state, auth, id).await?;
    let project = db::projects::update(&state.pool, auth.scope(), id, &input, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Updated,
        id,
        Some(project.company_id),
        project.private_owner(),
    )
    .await;
    Ok(project)
}

async fn delete_project(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    let project = find_modifiable(state, auth, id).await?;

    if !db::projects::soft_delete(&state.pool, auth.scope(), id, auth.user_id).await? {
        return Err(not_found());
    }

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Deleted,
        id,
        Some(project.company_id),
        project.private_owner(),
    )
    .await;
    Ok(id)
}

/// Any role may create a project; the caller becomes its owner.
pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let project = create_project(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProjectInput>,
) -> Result<StatusCode, AppError> {
    update_project(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_project(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;

    if !db::projects::restore(&state.pool, auth.scope(), id, auth.user_id).await? {
        return Err(not_found());
    }

    let project = db::projects::find_by_id(&state.pool, auth.scope(), id).await?;
    record_owned_change(
        &state,
        &auth,
        ENTITY,
        ChangeAction::Restored,
        id,
        project.as_ref().map(|p| p.company_id),
        project.as_ref().and_then(Project::private_owner),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<ProjectInput>>,
) -> Result<Json<BulkResult<Project>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_project(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<ProjectInput>>>,
) -> Result<Json<BulkResult<Project>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| {
        update_project(state, auth, item.id, item.data)
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
    let result = bulk::run_deletes(req.ids, move |id| delete_project(state, auth, id)).await;
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
    let parsed = csv_io::parse::<ProjectInput>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_project(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    let projects = db::projects::list(&state.pool, auth.scope(), Deleted::Excluded).await?;
    let rows: Vec<ProjectCsvRow> = projects.iter().map(ProjectCsvRow::from).collect();
    csv_io::attachment("projects.csv", &rows)
}
