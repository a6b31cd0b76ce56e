use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean, email_format, max_len, require, AuditFields, CsvRecord, Validate};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub hired_on: Option<NaiveDate>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}

impl EmployeeInput {
    pub fn normalized(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: clean(&self.email),
            phone: clean(&self.phone),
            position: clean(&self.position),
            hired_on: self.hired_on,
            user_id: self.user_id,
            company_id: self.company_id,
        }
    }
}

impl Validate for EmployeeInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "firstName", &self.first_name);
        require(&mut errors, "lastName", &self.last_name);
        max_len(&mut errors, "firstName", Some(&self.first_name), 100);
        max_len(&mut errors, "lastName", Some(&self.last_name), 100);
        max_len(&mut errors, "position", self.position.as_deref(), 100);
        email_format(&mut errors, "email", self.email.as_deref());
        errors
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCsvRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub company_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&Employee> for EmployeeCsvRow {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id,
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            email: e.email.clone(),
            phone: e.phone.clone(),
            position: e.position.clone(),
            hired_on: e.hired_on,
            company_id: e.company_id,
            created_at: e.audit.created_at,
        }
    }
}

impl CsvRecord for EmployeeCsvRow {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "firstName",
        "lastName",
        "email",
        "phone",
        "position",
        "hiredOn",
        "companyId",
        "createdAt",
    ];
}
