use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{email_format, max_len, require, AuditFields, CsvRecord, Validate};
use crate::auth::role::Role;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_password_set: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl User {
    /// The CHECK constraint on `users.role` keeps this parse infallible in practice.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub company_id: Option<Uuid>,
    pub password: Option<String>,
}

impl CreateUser {
    pub fn normalized(&self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role.trim().to_string(),
            company_id: self.company_id,
            password: self.password.clone().filter(|p| !p.is_empty()),
        }
    }
}

impl Validate for CreateUser {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "email", &self.email);
        email_format(&mut errors, "email", Some(&self.email));
        require(&mut errors, "firstName", &self.first_name);
        require(&mut errors, "lastName", &self.last_name);
        max_len(&mut errors, "firstName", Some(&self.first_name), 100);
        max_len(&mut errors, "lastName", Some(&self.last_name), 100);
        if let Err(e) = self.role.parse::<Role>() {
            errors.push(e);
        }
        if let Some(password) = &self.password {
            if let Err(e) = crate::auth::password::check_strength(password) {
                errors.push(e);
            }
        }
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub company_id: Option<Uuid>,
}

impl UpdateUser {
    pub fn normalized(&self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role.as_deref().map(|r| r.trim().to_string()),
            company_id: self.company_id,
        }
    }
}

impl Validate for UpdateUser {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "email", &self.email);
        email_format(&mut errors, "email", Some(&self.email));
        require(&mut errors, "firstName", &self.first_name);
        require(&mut errors, "lastName", &self.last_name);
        if let Some(Err(e)) = self.role.as_deref().map(str::parse::<Role>) {
            errors.push(e);
        }
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCsvRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub company_id: Uuid,
    pub is_password_set: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserCsvRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            role: u.role.clone(),
            company_id: u.company_id,
            is_password_set: u.is_password_set,
            created_at: u.audit.created_at,
        }
    }
}

impl CsvRecord for UserCsvRow {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "email",
        "firstName",
        "lastName",
        "role",
        "companyId",
        "isPasswordSet",
        "createdAt",
    ];
}
