use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::{record_owned_change, PageParams};
use crate::auth::extractor::AuthUser;
use crate::auth::role::Role;
use crate::bulk::{self, BulkDelete, BulkResult, BulkUpdateItem};
use crate::csv_io::{self, ImportReport};
use crate::db::{self, Deleted, Paged};
use crate::error::AppError;
use crate::models::{Project, Screen, ScreenCsvRow, ScreenInput, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "screen";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenFilter {
    pub project_id: Option<Uuid>,
}

fn not_found() -> AppError {
    AppError::NotFound("Screen not found".to_string())
}

async fn visible_project(
    state: &AppState,
    auth: &AuthUser,
    project_id: Uuid,
) -> Result<Project, AppError> {
    db::projects::find_by_id(&state.pool, auth.scope(), project_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Project not found".to_string()))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenFilter>,
) -> Result<Json<Vec<Screen>>, AppError> {
    let screens =
        db::screens::list(&state.pool, auth.scope(), filter.project_id, Deleted::Excluded).await?;
    Ok(Json(screens))
}

pub async fn paged(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenFilter>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<Screen>>, AppError> {
    let req = params.request();
    let (items, total) =
        db::screens::page(&state.pool, auth.scope(), filter.project_id, &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenFilter>,
) -> Result<Json<Vec<Screen>>, AppError> {
    auth.require_role(Role::Admin)?;
    let screens =
        db::screens::list(&state.pool, auth.scope(), filter.project_id, Deleted::Only).await?;
    Ok(Json(screens))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Screen>, AppError> {
    let screen = db::screens::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(screen))
}

async fn create_screen(
    state: &AppState,
    auth: &AuthUser,
    input: ScreenInput,
) -> Result<Screen, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let project = visible_project(state, auth, input.project_id).await?;
    let screen = db::screens::create(&state.pool, project.company_id, &input, auth.user_id).await?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Created,
        screen.id,
        Some(screen.company_id),
        project.private_owner(),
    )
    .await;
    Ok(screen)
}

async fn update_screen(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: ScreenInput,
) -> Result<Screen, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let existing = db::screens::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    let project = visible_project(state, auth, input.project_id).await?;
    if project.company_id != existing.company_id {
        return Err(AppError::BadRequest(
            "A screen cannot move to another company's project".to_string(),
        ));
    }

    let screen = db::screens::update(&state.pool, auth.scope(), id, &input, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Updated,
        id,
        Some(screen.company_id),
        project.private_owner(),
    )
    .await;
    Ok(screen)
}

async fn delete_screen(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    let existing = db::screens::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;

    let owner = db::projects::private_owner(&state.pool, existing.project_id).await?;

    if !db::screens::soft_delete(&state.pool, auth.scope(), id, auth.user_id).await? {
        return Err(not_found());
    }

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Deleted,
        id,
        Some(existing.company_id),
        owner,
    )
    .await;
    Ok(id)
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<ScreenInput>,
) -> Result<(StatusCode, Json<Screen>), AppError> {
    auth.require_role(Role::Manager)?;
    let screen = create_screen(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(screen)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ScreenInput>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Manager)?;
    update_screen(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Manager)?;
    delete_screen(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;

    if !db::screens::restore(&state.pool, auth.scope(), id, auth.user_id).await? {
        return Err(not_found());
    }

    let company_id = db::screens::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .map(|s| s.company_id);
    let owner = db::screens::private_owner(&state.pool, id).await?;
    record_owned_change(&state, &auth, ENTITY, ChangeAction::Restored, id, company_id, owner)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<ScreenInput>>,
) -> Result<Json<BulkResult<Screen>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_screen(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<ScreenInput>>>,
) -> Result<Json<BulkResult<Screen>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| update_screen(state, auth, item.id, item.data)).await;
    Ok(Json(result))
}

pub async fn bulk_delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<BulkDelete>,
) -> Result<Json<BulkResult<Uuid>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run_deletes(req.ids, move |id| delete_screen(state, auth, id)).await;
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
    let parsed = csv_io::parse::<ScreenInput>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_screen(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenFilter>,
) -> Result<Response, AppError> {
    let screens =
        db::screens::list(&state.pool, auth.scope(), filter.project_id, Deleted::Excluded).await?;
    let rows: Vec<ScreenCsvRow> = screens.iter().map(ScreenCsvRow::from).collect();
    csv_io::attachment("screens.csv", &rows)
}
