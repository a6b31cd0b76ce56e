pub mod company;
pub mod dashboard;
pub mod employee;
pub mod note;
pub mod password_setup_token;
pub mod project;
pub mod refresh_token;
pub mod screen;
pub mod screen_action;
pub mod screen_action_type;
pub mod user;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub use company::{Company, CompanyCsvRow, CompanyInput};
pub use dashboard::Dashboard;
pub use employee::{Employee, EmployeeCsvRow, EmployeeInput};
pub use note::{Note, NoteCsvRow, NoteInput};
pub use password_setup_token::PasswordSetupToken;
pub use project::{Project, ProjectCsvRow, ProjectInput};
pub use refresh_token::RefreshToken;
pub use screen::{Screen, ScreenCsvRow, ScreenInput};
pub use screen_action::{ScreenAction, ScreenActionCsvRow, ScreenActionInput};
pub use screen_action_type::{ScreenActionType, ScreenActionTypeCsvRow, ScreenActionTypeInput};
pub use user::{CreateUser, UpdateUser, User, UserCsvRow};

/// Creation, modification and soft-delete bookkeeping shared by every managed table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFields {
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

/// Field-level checks on an incoming record. An empty list means the record is valid.
pub trait Validate {
    fn validate(&self) -> Vec<String>;

    fn ensure_valid(&self) -> Result<(), AppError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// An export row with a fixed column list, so an empty export still carries its header.
pub trait CsvRecord: Serialize {
    const HEADERS: &'static [&'static str];
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

/// For defaulted scalar fields: an empty CSV cell or JSON `null` reads as the default.
pub(crate) fn blank_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn require(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

pub(crate) fn max_len(errors: &mut Vec<String>, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        if v.chars().count() > max {
            errors.push(format!("{field} must be at most {max} characters"));
        }
    }
}

pub(crate) fn email_format(errors: &mut Vec<String>, field: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        if !EMAIL_RE.is_match(v.trim()) {
            errors.push(format!("{field} is not a valid email address"));
        }
    }
}

/// Trim and drop blank optional strings so "" and "  " are stored as NULL.
pub(crate) fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
