use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean, max_len, require, AuditFields, CsvRecord, Validate};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenAction {
    pub id: Uuid,
    pub company_id: Uuid,
    pub screen_id: Uuid,
    pub screen_name: String,
    pub action_type_id: Uuid,
    pub action_type_name: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenActionInput {
    pub screen_id: Uuid,
    pub action_type_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::blank_as_default")]
    pub sort_order: i32,
}

impl ScreenActionInput {
    pub fn normalized(&self) -> Self {
        Self {
            screen_id: self.screen_id,
            action_type_id: self.action_type_id,
            name: self.name.trim().to_string(),
            description: clean(&self.description),
            sort_order: self.sort_order,
        }
    }
}

impl Validate for ScreenActionInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        max_len(&mut errors, "name", Some(&self.name), 200);
        if self.sort_order < 0 {
            errors.push("sortOrder must not be negative".to_string());
        }
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenActionCsvRow {
    pub id: Uuid,
    pub screen_id: Uuid,
    pub action_type_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&ScreenAction> for ScreenActionCsvRow {
    fn from(a: &ScreenAction) -> Self {
        Self {
            id: a.id,
            screen_id: a.screen_id,
            action_type_id: a.action_type_id,
            name: a.name.clone(),
            description: a.description.clone(),
            sort_order: a.sort_order,
            created_at: a.audit.created_at,
        }
    }
}

impl CsvRecord for ScreenActionCsvRow {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "screenId",
        "actionTypeId",
        "name",
        "description",
        "sortOrder",
        "createdAt",
    ];
}
