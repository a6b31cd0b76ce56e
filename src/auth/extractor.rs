use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::jwt;
use crate::auth::role::Role;
use crate::db::Scope;
use crate::error::AppError;
use crate::state::SharedState;

/// The authenticated caller, decoded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, minimum: Role) -> Result<(), AppError> {
        if self.role >= minimum {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{minimum} access or higher required"
            )))
        }
    }

    pub fn require_global_admin(&self) -> Result<(), AppError> {
        self.require_role(Role::GlobalAdmin)
    }

    pub fn is_global_admin(&self) -> bool {
        self.role == Role::GlobalAdmin
    }

    /// Row filter for tenant-scoped queries.
    pub fn scope(&self) -> Scope {
        Scope {
            company_id: (!self.is_global_admin()).then_some(self.company_id),
            owner_id: (self.role == Role::User).then_some(self.user_id),
        }
    }

    /// Company a new row lands in. Only a global admin may target another tenant.
    pub fn target_company(&self, requested: Option<Uuid>) -> Uuid {
        match requested {
            Some(id) if self.is_global_admin() => id,
            _ => self.company_id,
        }
    }

    /// Owner or author checks: the row's creator, or Manager and above.
    pub fn can_modify_owned(&self, owner_id: Uuid) -> bool {
        owner_id == self.user_id || self.role >= Role::Manager
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".to_string()))?;

        let claims = jwt::decode_token(token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: claims.sub,
            company_id: claims.cid,
            email: claims.email,
            role: claims.role,
        })
    }
}
