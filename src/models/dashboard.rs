use serde::Serialize;

use super::{Note, Project};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub companies: i64,
    pub users: i64,
    pub employees: i64,
    pub projects: i64,
    pub screens: i64,
    pub notes: i64,
    pub recent_projects: Vec<Project>,
    pub recent_notes: Vec<Note>,
}
