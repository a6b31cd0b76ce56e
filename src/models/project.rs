use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean, max_len, require, AuditFields, CsvRecord, Validate};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub owner_id: Uuid,
    pub owner_email: String,
    pub name: String,
    pub description: Option<String>,
    pub is_shared: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Project {
    /// The one plain user who may see this project, or None when it is shared.
    pub fn private_owner(&self) -> Option<Uuid> {
        (!self.is_shared).then_some(self.owner_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::blank_as_default")]
    pub is_shared: bool,
    pub company_id: Option<Uuid>,
}

impl ProjectInput {
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: clean(&self.description),
            is_shared: self.is_shared,
            company_id: self.company_id,
        }
    }
}

impl Validate for ProjectInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        max_len(&mut errors, "name", Some(&self.name), 200);
        max_len(&mut errors, "description", self.description.as_deref(), 2000);
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCsvRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_shared: bool,
    pub company_id: Uuid,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Project> for ProjectCsvRow {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            is_shared: p.is_shared,
            company_id: p.company_id,
            owner_email: p.owner_email.clone(),
            created_at: p.audit.created_at,
        }
    }
}

impl CsvRecord for ProjectCsvRow {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "isShared",
        "companyId",
        "ownerEmail",
        "createdAt",
    ];
}
