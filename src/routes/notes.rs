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
use crate::models::{Note, NoteCsvRow, NoteInput, Validate};
use crate::notify::ChangeAction;
use crate::state::{AppState, SharedState};

const ENTITY: &str = "note";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFilter {
    pub project_id: Option<Uuid>,
}

fn not_found() -> AppError {
    AppError::NotFound("Note not found".to_string())
}

/// Company of the linked project, if the note has one. The project must be visible.
async fn project_company(
    state: &AppState,
    auth: &AuthUser,
    project_id: Option<Uuid>,
) -> Result<Option<Uuid>, AppError> {
    let Some(project_id) = project_id else {
        return Ok(None);
    };
    let project = db::projects::find_by_id(&state.pool, auth.scope(), project_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Project not found".to_string()))?;
    Ok(Some(project.company_id))
}

async fn find_modifiable(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Note, AppError> {
    let note = db::notes::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    if !auth.can_modify_owned(note.author_id) {
        return Err(AppError::Forbidden(
            "Only the author or a manager may modify this note".to_string(),
        ));
    }
    Ok(note)
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<Note>>, AppError> {
    let notes =
        db::notes::list(&state.pool, auth.scope(), filter.project_id, Deleted::Excluded).await?;
    Ok(Json(notes))
}

pub async fn paged(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<NoteFilter>,
    Query(params): Query<PageParams>,
) -> Result<Json<Paged<Note>>, AppError> {
    let req = params.request();
    let (items, total) = db::notes::page(&state.pool, auth.scope(), filter.project_id, &req).await?;
    Ok(Json(Paged::new(items, total, &req)))
}

pub async fn deleted(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<Note>>, AppError> {
    auth.require_role(Role::Admin)?;
    let notes = db::notes::list(&state.pool, auth.scope(), filter.project_id, Deleted::Only).await?;
    Ok(Json(notes))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, AppError> {
    let note = db::notes::find_by_id(&state.pool, auth.scope(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(note))
}

async fn create_note(state: &AppState, auth: &AuthUser, input: NoteInput) -> Result<Note, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let company_id = project_company(state, auth, input.project_id)
        .await?
        .unwrap_or(auth.company_id);
    let note = db::notes::create(&state.pool, company_id, auth.user_id, &input).await?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Created,
        note.id,
        Some(company_id),
        Some(note.author_id),
    )
    .await;
    Ok(note)
}

async fn update_note(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    input: NoteInput,
) -> Result<Note, AppError> {
    let input = input.normalized();
    input.ensure_valid()?;

    let existing = find_modifiable(state, auth, id).await?;
    if let Some(company_id) = project_company(state, auth, input.project_id).await? {
        if company_id != existing.company_id {
            return Err(AppError::BadRequest(
                "A note cannot link to another company's project".to_string(),
            ));
        }
    }

    let note = db::notes::update(&state.pool, auth.scope(), id, &input, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Updated,
        id,
        Some(note.company_id),
        Some(note.author_id),
    )
    .await;
    Ok(note)
}

async fn delete_note(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<Uuid, AppError> {
    let note = find_modifiable(state, auth, id).await?;

    if !db::notes::soft_delete(&state.pool, auth.scope(), id, auth.user_id).await? {
        return Err(not_found());
    }

    record_owned_change(
        state,
        auth,
        ENTITY,
        ChangeAction::Deleted,
        id,
        Some(note.company_id),
        Some(note.author_id),
    )
    .await;
    Ok(id)
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(input): Json<NoteInput>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let note = create_note(&state, &auth, input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(input): Json<NoteInput>,
) -> Result<StatusCode, AppError> {
    update_note(&state, &auth, id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_note(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_role(Role::Admin)?;

    if !db::notes::restore(&state.pool, auth.scope(), id, auth.user_id).await? {
        return Err(not_found());
    }

    let note = db::notes::find_by_id(&state.pool, auth.scope(), id).await?;
    record_owned_change(
        &state,
        &auth,
        ENTITY,
        ChangeAction::Restored,
        id,
        note.as_ref().map(|n| n.company_id),
        note.as_ref().map(|n| n.author_id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(inputs): Json<Vec<NoteInput>>,
) -> Result<Json<BulkResult<Note>>, AppError> {
    let (state, auth) = (&state, &auth);
    let result = bulk::run(inputs, move |input| create_note(state, auth, input)).await;
    Ok(Json(result))
}

pub async fn bulk_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(items): Json<Vec<BulkUpdateItem<NoteInput>>>,
) -> Result<Json<BulkResult<Note>>, AppError> {
    let (state, auth) = (&state, &auth);
    let result = bulk::run(items, move |item| update_note(state, auth, item.id, item.data)).await;
    Ok(Json(result))
}

pub async fn bulk_delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<BulkDelete>,
) -> Result<Json<BulkResult<Uuid>>, AppError> {
    let (state, auth) = (&state, &auth);
    let result = bulk::run_deletes(req.ids, move |id| delete_note(state, auth, id)).await;
    Ok(Json(result))
}

pub async fn import(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    let data = csv_io::read_upload(&headers, body).await?;
    let parsed = csv_io::parse::<NoteInput>(&data).map_err(AppError::BadRequest)?;

    let (state, auth) = (&state, &auth);
    let report = csv_io::import(parsed, move |input| create_note(state, auth, input)).await;
    Ok(Json(report))
}

pub async fn export(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<NoteFilter>,
) -> Result<Response, AppError> {
    let notes =
        db::notes::list(&state.pool, auth.scope(), filter.project_id, Deleted::Excluded).await?;
    let rows: Vec<NoteCsvRow> = notes.iter().map(NoteCsvRow::from).collect();
    csv_io::attachment("notes.csv", &rows)
}
