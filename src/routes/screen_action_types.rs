//! Global lookup of action kinds. Every role reads; only global admins write.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use super::{record_change, PageParams};
use crate::auth::extractor::AuthUser;
use crate::bulk::{self, BulkDelete, BulkResult, BulkUpdateItem};
use crate::csv_io::{self, ImportReport};
use crate::db::{self, Deleted, Paged};
use crate::error::AppError;
use crate::models::{ScreenActionType, ScreenActionTypeCsvRow, ScreenActionTypeInput, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "screen_action_type";
const NAME_TAKEN: &str = "A screen action type with this name already exists";

fn not_found() -> AppError {
    AppError::NotFound("Screen action type not found".to_string())
}

pub async fn list(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<ScreenActionType>>, AppError> {
    let types = db::screen_action_types::list(&state.pool, Deleted::Excluded).await?;
    Ok(Json(types))
}

pub async fn paged(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<ScreenActionType>>, AppError> {
    let req = params.request();
    let (items, total) = db::screen_action_types::page(&state.pool, &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<ScreenActionType>>, AppError> {
    auth.require_global_admin()?;
    let types = db::screen_action_types::list(&state.pool, Deleted::Only).await?;
    Ok(Json(types))
}

pub async fn get(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScreenActionType>, AppError> {
    let action_type = db::screen_action_types::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(action_type))
}

async fn create_type(
    state: &AppState,
    auth: &AuthUser,
    input: ScreenActionTypeInput,
) -> Result<ScreenActionType, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let action_type = db::screen_action_types::create(&state.pool, &input, auth.user_id)
        .await
        .map_err(AppError::conflict_on_unique(NAME_TAKEN))?;

    record_change(state, auth, ENTITY, ChangeAction::Created, action_type.id, None).await;
    Ok(action_type)
}

async fn update_type(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: ScreenActionTypeInput,
) -> Result<ScreenActionType, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let action_type = db::screen_action_types::update(&state.pool, id, &input, auth.user_id)
        .await
        .map_err(AppError::conflict_on_unique(NAME_TAKEN))?
        .ok_or_else(not_found)?;

    record_change(state, auth, ENTITY, ChangeAction::Updated, id, None).await;
    Ok(action_type)
}

async fn delete_type(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    if !db::screen_action_types::soft_delete(&state.pool, id, auth.user_id).await? {
        return Err(not_found());
    }

    record_change(state, auth, ENTITY, ChangeAction::Deleted, id, None).await;
    Ok(id)
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<ScreenActionTypeInput>,
) -> Result<(StatusCode, Json<ScreenActionType>), AppError> {
    auth.require_global_admin()?;
    let action_type = create_type(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(action_type)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ScreenActionTypeInput>,
) -> Result<StatusCode, AppError> {
    auth.require_global_admin()?;
    update_type(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_global_admin()?;
    delete_type(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_global_admin()?;

    let restored = db::screen_action_types::restore(&state.pool, id, auth.user_id)
        .await
        .map_err(AppError::conflict_on_unique(NAME_TAKEN))?;
    if !restored {
        return Err(not_found());
    }

    record_change(&state, &auth, ENTITY, ChangeAction::Restored, id, None).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<ScreenActionTypeInput>>,
) -> Result<Json<BulkResult<ScreenActionType>>, AppError> {
    auth.require_global_admin()?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_type(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<ScreenActionTypeInput>>>,
) -> Result<Json<BulkResult<ScreenActionType>>, AppError> {
    auth.require_global_admin()?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| update_type(state, auth, item.id, item.data)).await;
    Ok(Json(result))
}

pub async fn bulk_delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<BulkDelete>,
) -> Result<Json<BulkResult<Uuid>>, AppError> {
    auth.require_global_admin()?;
    let (state, auth) = (&state, &auth);
    let result = bulk::run_deletes(req.ids, move |id| delete_type(state, auth, id)).await;
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
    let parsed = csv_io::parse::<ScreenActionTypeInput>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_type(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Response, AppError> {
    let types = db::screen_action_types::list(&state.pool, Deleted::Excluded).await?;
    let rows: Vec<ScreenActionTypeCsvRow> = types.iter().map(ScreenActionTypeCsvRow::from).collect();
    csv_io::attachment("screen-action-types.csv", &rows)
}
