pub mod auth;
pub mod companies;
pub mod dashboard;
pub mod employees;
pub mod notes;
pub mod notifications;
pub mod projects;
pub mod screen_action_types;
pub mod screen_actions;
pub mod screens;
pub mod users;

use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db::PageRequest;
use crate::db::audit::{self, AuditEvent};
use crate::notify::{ChangeAction, ChangeEvent};
use crate::state::{AppState, SharedState};

/// Query string of the `/paged` endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: Option<bool>,
}

impl PageParams {
    pub fn request(self) -> PageRequest {
        PageRequest::new(
            self.page,
            self.page_size,
            self.search,
            self.sort_by,
            self.sort_desc,
        )
    }
}

/// Log, audit and broadcast a successful mutation.
pub(crate) async fn record_change(
    state: &AppState,
    auth: &AuthUser,
    entity: &'static str,
    action: ChangeAction,
    id: Uuid,
    company_id: Option<Uuid>,
) {
    record_owned_change(state, auth, entity, action, id, company_id, None).await;
}

/// As [`record_change`] for rows a plain user only sees when they own them.
pub(crate) async fn record_owned_change(
    state: &AppState,
    auth: &AuthUser,
    entity: &'static str,
    action: ChangeAction,
    id: Uuid,
    company_id: Option<Uuid>,
    owner_id: Option<Uuid>,
) {
    tracing::info!(entity, %id, user_id = %auth.user_id, "{entity} {action}");

    audit::record(
        &state.pool,
        AuditEvent {
            company_id,
            user_id: Some(auth.user_id),
            action: &format!("{entity}.{action}"),
            entity,
            entity_id: Some(id),
        },
    )
    .await;

    state.notifier.publish(ChangeEvent {
        entity,
        action,
        id,
        company_id,
        owner_id,
    });
}

/// The routes every managed entity exposes, mounted under `$base`.
macro_rules! entity_routes {
    ($router:expr, $base:literal, $module:ident) => {
        $router
            .route($base, get($module::list).post($module::create))
            .route(concat!($base, "/paged"), get($module::paged))
            .route(concat!($base, "/deleted"), get($module::deleted))
            .route(concat!($base, "/export"), get($module::export))
            .route(concat!($base, "/import"), post($module::import))
            .route(concat!($base, "/bulk-create"), post($module::bulk_create))
            .route(concat!($base, "/bulk-update"), put($module::bulk_update))
            .route(concat!($base, "/bulk-delete"), post($module::bulk_delete))
            .route(
                concat!($base, "/{id}"),
                get($module::get)
                    .put($module::update)
                    .delete($module::delete),
            )
            .route(concat!($base, "/{id}/restore"), post($module::restore))
    };
}

pub fn api_routes() -> Router<SharedState> {
    let router = Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/setup-password", post(auth::setup_password))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/me", get(auth::me))
        // Users
        .route(
            "/api/users/{id}/reset-password",
            post(users::reset_password),
        )
        // Dashboard and notifications
        .route("/api/dashboard", get(dashboard::get))
        .route("/api/notifications/stream", get(notifications::stream));

    let router = entity_routes!(router, "/api/companies", companies);
    let router = entity_routes!(router, "/api/users", users);
    let router = entity_routes!(router, "/api/employees", employees);
    let router = entity_routes!(router, "/api/projects", projects);
    let router = entity_routes!(router, "/api/screens", screens);
    let router = entity_routes!(router, "/api/screen-action-types", screen_action_types);
    let router = entity_routes!(router, "/api/screen-actions", screen_actions);
    entity_routes!(router, "/api/notes", notes)
}
