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
use crate::models::{Screen, ScreenAction, ScreenActionCsvRow, ScreenActionInput, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "screen_action";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenActionFilter {
    pub screen_id: Option<Uuid>,
}

fn not_found() -> AppError {
    AppError::NotFound("Screen action not found".to_string())
}

/// The screen must be visible to the caller and the action type must be active.
async fn check_parents(
    state: &AppState,
    auth: &AuthUser,
    input: &ScreenActionInput,
) -> Result<Screen, AppError> {
    let screen = db::screens::find_by_id(&state.pool, auth.scope(), input.screen_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Screen not found".to_string()))?;
    db::screen_action_types::find_by_id(&state.pool, input.action_type_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Screen action type not found".to_string()))?;
    Ok(screen)
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenActionFilter>,
) -> Result<Json<Vec<ScreenAction>>, AppError> {
    let actions =
        db::screen_actions::list(&state.pool, auth.scope(), filter.screen_id, Deleted::Excluded).await?;
    Ok(Json(actions))
}

pub async fn paged(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenActionFilter>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<ScreenAction>>, AppError> {
    let req = params.request();
    let (items, total) =
        db::screen_actions::page(&state.pool, auth.scope(), filter.screen_id, &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenActionFilter>,
) -> Result<Json<Vec<ScreenAction>>, AppError> {
    auth.require_role(Role::Admin)?;
    let actions =
        db::screen_actions::list(&state.pool, auth.scope(), filter.screen_id, Deleted::Only).await?;
    Ok(Json(actions))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScreenAction>, AppError> {
    let action = db::screen_actions::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(action))
}

async fn create_action(
    state: &AppState,
    auth: &AuthUser,
    input: ScreenActionInput,
) -> Result<ScreenAction, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let screen = check_parents(state, auth, &input).await?;
    let action = db::screen_actions::create(&state.pool, screen.company_id, &input, auth.user_id)
        .await?;
    let owner = db::screens::private_owner(&state.pool, screen.id).await?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Created,
        action.id,
        Some(action.company_id),
        owner,
    )
    .await;
    Ok(action)
}

async fn update_action(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: ScreenActionInput,
) -> Result<ScreenAction, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let existing = db::screen_actions::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    let screen = check_parents(state, auth, &input).await?;
    if screen.company_id != existing.company_id {
        return Err(AppError::BadRequest(
            "An action cannot move to another company's screen".to_string(),
        ));
    }

    let owner = db::screens::private_owner(&state.pool, screen.id).await?;
    let action = db::screen_actions::update(&state.pool, auth.scope(), id, &input, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Updated,
        id,
        Some(action.company_id),
        owner,
    )
    .await;
    Ok(action)
}

async fn delete_action(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    let existing = db::screen_actions::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;

    let owner = db::screens::private_owner(&state.pool, existing.screen_id).await?;

    if !db::screen_actions::soft_delete(&state.pool, auth.scope(), id, auth.user_id).await? {
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
    Json(input): Json<ScreenActionInput>,
) -> Result<(StatusCode, Json<ScreenAction>), AppError> {
    auth.require_role(Role::Manager)?;
    let action = create_action(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ScreenActionInput>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Manager)?;
    update_action(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Manager)?;
    delete_action(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;

    if !db::screen_actions::restore(&state.pool, auth.scope(), id, auth.user_id).await? {
        return Err(not_found());
    }

    let action = db::screen_actions::find_by_id(&state.pool, auth.scope(), id).await?;
    let owner = match &action {
        Some(a) => db::screens::private_owner(&state.pool, a.screen_id).await?,
        None => None,
    };
    record_owned_change(
        &state,
        &auth,
        ENTITY,
        ChangeAction::Restored,
        id,
        action.as_ref().map(|a| a.company_id),
        owner,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<ScreenActionInput>>,
) -> Result<Json<BulkResult<ScreenAction>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_action(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<ScreenActionInput>>>,
) -> Result<Json<BulkResult<ScreenAction>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| update_action(state, auth, item.id, item.data)).await;
    Ok(Json(result))
}

pub async fn bulk_delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<BulkDelete>,
) -> Result<Json<BulkResult<Uuid>>, AppError> {
    auth.require_role(Role::Manager)?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run_deletes(req.ids, move |id| delete_action(state, auth, id)).await;
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
    let parsed = csv_io::parse::<ScreenActionInput>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_action(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<ScreenActionFilter>,
) -> Result<Response, AppError> {
    let actions =
        db::screen_actions::list(&state.pool, auth.scope(), filter.screen_id, Deleted::Excluded).await?;
    let rows: Vec<ScreenActionCsvRow> = actions.iter().map(ScreenActionCsvRow::from).collect();
    csv_io::attachment("screen-actions.csv", &rows)
}
