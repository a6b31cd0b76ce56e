use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{encode_token, Claims};
use crate::auth::role::Role;
use crate::auth::{password, tokens};
use crate::db::users::UserFields;
use crate::db::audit::{self, AuditEvent};
use crate::db::{self, Scope};
use crate::error::AppError;
use crate::models::{CompanyInput, CreateUser, User, Validate};
use crate::state::{AppState, SharedState};

const REFRESH_COOKIE: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/api/auth";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub company_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SetupPasswordRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: User,
}

fn refresh_cookie(state: &AppState, refresh_token: &str) -> CookieJar {
    let cookie = Cookie::build((REFRESH_COOKIE, refresh_token.to_string()))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(state.config.refresh_token_days))
        .build();
    CookieJar::new().add(cookie)
}

fn clear_refresh_cookie() -> CookieJar {
    let cookie = Cookie::build((REFRESH_COOKIE, ""))
        .path(REFRESH_COOKIE_PATH)
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(cookie)
}

/// Mint an access token and a new refresh token for the user.
async fn issue_tokens(state: &AppState, user: User) -> Result<(CookieJar, AuthResponse), AppError> {
    let claims = Claims::new(
        user.id,
        user.company_id,
        user.email.clone(),
        user.role(),
        state.config.access_token_minutes,
    );
    let access_token =
        encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    let refresh = tokens::generate();
    db::refresh_tokens::insert(
        &state.pool,
        user.id,
        &tokens::hash(&refresh),
        Utc::now() + Duration::days(state.config.refresh_token_days),
    )
    .await?;

    let jar = refresh_cookie(state, &refresh);
    Ok((
        jar,
        AuthResponse {
            access_token,
            refresh_token: refresh,
            expires_in: state.config.access_token_minutes * 60,
            user,
        },
    ))
}

/// Refresh token from the JSON body, falling back to the cookie.
fn presented_refresh_token(jar: &CookieJar, body: &Bytes) -> Result<Option<String>, AppError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
            .refresh_token
            .filter(|t| !t.is_empty())
    };

    Ok(from_body.or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string())))
}

/// First-run bootstrap: creates the first company and its global admin.
/// Closed as soon as any user exists.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    let company_input = CompanyInput {
        name: req.company_name,
        address: None,
        phone: None,
        email: None,
    }
    .normalized();
    let user_input = CreateUser {
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        role: Role::GlobalAdmin.as_str().to_string(),
        company_id: None,
        password: Some(req.password),
    }
    .normalized();

    let mut errors: Vec<String> = company_input
        .validate()
        .into_iter()
        .map(|e| e.replacen("name", "companyName", 1))
        .collect();
    errors.extend(user_input.validate());
    if user_input.password.is_none() {
        errors.push("password is required".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let pw_hash = user_input
        .password
        .as_deref()
        .map(password::hash)
        .transpose()
        .map_err(AppError::Internal)?;

    // Advisory lock prevents concurrent bootstrap registrations
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let count = db::users::count_all(&mut *tx).await?;
    if count > 0 {
        return Err(AppError::Forbidden(
            "Registration is closed. Ask an administrator for an account.".to_string(),
        ));
    }

    let company = db::companies::create(&mut *tx, &company_input, None).await?;
    let fields = UserFields {
        company_id: company.id,
        email: &user_input.email,
        first_name: &user_input.first_name,
        last_name: &user_input.last_name,
        role: Role::GlobalAdmin.as_str(),
    };
    let user = db::users::create(&mut *tx, &fields, pw_hash.as_deref(), None).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, company_id = %company.id, "Bootstrap registration completed");
    audit::record(
        &state.pool,
        AuditEvent {
            company_id: Some(company.id),
            user_id: Some(user.id),
            action: "user.registered",
            entity: "user",
            entity_id: Some(user.id),
        },
    )
    .await;

    let (jar, response) = issue_tokens(&state, user).await?;
    Ok((StatusCode::CREATED, jar, Json(response)))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let email = req.email.trim().to_lowercase();
    if let Err(retry_after) = state.login_limiter.check(&email) {
        return Err(AppError::RateLimited(format!(
            "Too many login attempts. Try again in {retry_after} seconds."
        )));
    }

    let Some(user) = db::users::find_by_email(&state.pool, &email).await? else {
        state.login_limiter.record_failure(&email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    let Some(hash) = user.password_hash.as_deref().filter(|_| user.is_password_set) else {
        return Err(AppError::Forbidden(
            "Password has not been set for this account".to_string(),
        ));
    };

    let valid = password::verify(&req.password, hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    state.login_limiter.reset(&email);
    db::users::touch_last_login(&state.pool, user.id).await?;

    audit::record(
        &state.pool,
        AuditEvent {
            company_id: Some(user.company_id),
            user_id: Some(user.id),
            action: "user.login",
            entity: "user",
            entity_id: Some(user.id),
        },
    )
    .await;

    let (jar, response) = issue_tokens(&state, user).await?;
    Ok((jar, Json(response)))
}

/// Rotate a refresh token. Presenting a token that was already rotated means it
/// leaked, so every session of that user is revoked.
pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let presented = presented_refresh_token(&jar, &body)?
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = db::refresh_tokens::find_by_hash(&state.pool, &tokens::hash(&presented))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if stored.used || !db::refresh_tokens::claim(&state.pool, stored.id).await? {
        tracing::warn!(
            "Refresh token reuse detected for user {}. Revoking all sessions.",
            stored.user_id
        );
        db::refresh_tokens::revoke_all(&state.pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db::users::find_by_id(&state.pool, Scope::unrestricted(), stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let (jar, response) = issue_tokens(&state, user).await?;
    Ok((jar, Json(response)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, StatusCode), AppError> {
    if let Some(token) = presented_refresh_token(&jar, &body)? {
        db::refresh_tokens::revoke(&state.pool, &tokens::hash(&token)).await?;
    }
    Ok((clear_refresh_cookie(), StatusCode::NO_CONTENT))
}

/// Consume a one-time setup token and set the account's password.
pub async fn setup_password(
    State(state): State<SharedState>,
    Json(req): Json<SetupPasswordRequest>,
) -> Result<StatusCode, AppError> {
    password::check_strength(&req.password).map_err(AppError::BadRequest)?;

    let invalid = || AppError::BadRequest("Invalid or expired setup token".to_string());

    let token_hash = tokens::hash(&req.token);
    let token = db::password_setup_tokens::find_valid_by_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(invalid)?;

    let user = db::users::find_by_id(&state.pool, Scope::unrestricted(), token.user_id)
        .await?
        .filter(|u| u.email.eq_ignore_ascii_case(req.email.trim()))
        .ok_or_else(invalid)?;

    if !db::password_setup_tokens::claim(&state.pool, token.id).await? {
        return Err(invalid());
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;
    db::users::set_password(&state.pool, user.id, &pw_hash).await?;
    db::refresh_tokens::revoke_all(&state.pool, user.id).await?;

    tracing::info!(user_id = %user.id, "Password set from setup token");
    audit::record(
        &state.pool,
        AuditEvent {
            company_id: Some(user.company_id),
            user_id: Some(user.id),
            action: "user.password_set",
            entity: "user",
            entity_id: Some(user.id),
        },
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Change the caller's password. All other sessions are signed out.
pub async fn change_password(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    password::check_strength(&req.new_password).map_err(AppError::BadRequest)?;

    let user = db::users::find_by_id(&state.pool, Scope::unrestricted(), auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let valid = match user.password_hash.as_deref() {
        Some(hash) => password::verify(&req.current_password, hash).map_err(AppError::Internal)?,
        None => false,
    };
    if !valid {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::set_password(&state.pool, user.id, &pw_hash).await?;
    db::refresh_tokens::revoke_all(&state.pool, user.id).await?;

    audit::record(
        &state.pool,
        AuditEvent {
            company_id: Some(user.company_id),
            user_id: Some(user.id),
            action: "user.password_changed",
            entity: "user",
            entity_id: Some(user.id),
        },
    )
    .await;

    let (jar, response) = issue_tokens(&state, user).await?;
    Ok((jar, Json(response)))
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, Scope::unrestricted(), auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}
