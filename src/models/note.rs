use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{max_len, require, AuditFields, CsvRecord, Validate};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub company_id: Uuid,
    pub author_id: Uuid,
    pub author_email: String,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub project_id: Option<Uuid>,
}

impl NoteInput {
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            project_id: self.project_id,
        }
    }
}

impl Validate for NoteInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "title", &self.title);
        max_len(&mut errors, "title", Some(&self.title), 200);
        max_len(&mut errors, "content", Some(&self.content), 20_000);
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCsvRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub project_id: Option<Uuid>,
    pub author_email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Note> for NoteCsvRow {
    fn from(n: &Note) -> Self {
        Self {
            id: n.id,
            title: n.title.clone(),
            content: n.content.clone(),
            project_id: n.project_id,
            author_email: n.author_email.clone(),
            created_at: n.audit.created_at,
        }
    }
}

impl CsvRecord for NoteCsvRow {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "title",
        "content",
        "projectId",
        "authorEmail",
        "createdAt",
    ];
}
