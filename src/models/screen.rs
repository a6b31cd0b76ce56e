use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean, max_len, require, AuditFields, CsvRecord, Validate};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: Uuid,
    pub company_id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    pub name: String,
    pub description: Option<String>,
    pub route: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInput {
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub route: Option<String>,
}

impl ScreenInput {
    pub fn normalized(&self) -> Self {
        Self {
            project_id: self.project_id,
            name: self.name.trim().to_string(),
            description: clean(&self.description),
            route: clean(&self.route),
        }
    }
}

impl Validate for ScreenInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        max_len(&mut errors, "name", Some(&self.name), 200);
        max_len(&mut errors, "route", self.route.as_deref(), 500);
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenCsvRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub route: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Screen> for ScreenCsvRow {
    fn from(s: &Screen) -> Self {
        Self {
            id: s.id,
            project_id: s.project_id,
            name: s.name.clone(),
            description: s.description.clone(),
            route: s.route.clone(),
            created_at: s.audit.created_at,
        }
    }
}

impl CsvRecord for ScreenCsvRow {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "projectId",
        "name",
        "description",
        "route",
        "createdAt",
    ];
}
