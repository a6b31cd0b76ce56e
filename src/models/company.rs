use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean, email_format, max_len, require, AuditFields, CsvRecord, Validate};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

/// Body of create and update requests, and the shape of an imported CSV row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CompanyInput {
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            address: clean(&self.address),
            phone: clean(&self.phone),
            email: clean(&self.email),
        }
    }
}

impl Validate for CompanyInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        max_len(&mut errors, "name", Some(&self.name), 200);
        max_len(&mut errors, "address", self.address.as_deref(), 500);
        max_len(&mut errors, "phone", self.phone.as_deref(), 50);
        email_format(&mut errors, "email", self.email.as_deref());
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCsvRow {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Company> for CompanyCsvRow {
    fn from(c: &Company) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            address: c.address.clone(),
            phone: c.phone.clone(),
            email: c.email.clone(),
            created_at: c.audit.created_at,
        }
    }
}

impl CsvRecord for CompanyCsvRow {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "name",
        "address",
        "phone",
        "email",
        "createdAt",
    ];
}
