use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean, max_len, require, AuditFields, CsvRecord, Validate};

/// Global lookup row. Not owned by any company.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenActionType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenActionTypeInput {
    pub name: String,
    pub description: Option<String>,
}

impl ScreenActionTypeInput {
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: clean(&self.description),
        }
    }
}

impl Validate for ScreenActionTypeInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        max_len(&mut errors, "name", Some(&self.name), 100);
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenActionTypeCsvRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ScreenActionType> for ScreenActionTypeCsvRow {
    fn from(t: &ScreenActionType) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            description: t.description.clone(),
            created_at: t.audit.created_at,
        }
    }
}

impl CsvRecord for ScreenActionTypeCsvRow {
    const HEADERS: &'static [&'static str] = &["id", "name", "description", "createdAt"];
}
