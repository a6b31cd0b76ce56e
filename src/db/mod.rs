pub mod audit;
pub mod companies;
pub mod dashboard;
pub mod employees;
pub mod notes;
pub mod password_setup_tokens;
pub mod projects;
pub mod refresh_tokens;
pub mod screen_action_types;
pub mod screen_actions;
pub mod screens;
pub mod users;

use serde::Serialize;
use uuid::Uuid;

/// Tenant and soft-delete predicate shared by every company-owned table.
/// Binds `$1` to the scope's company and `$2` to the deleted flag.
pub(crate) const TENANT: &str = "($1::uuid IS NULL OR company_id = $1) AND is_deleted = $2";

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64` at the largest page size.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Row visibility for the caller. `None` means unrestricted on that axis.
///
/// `company_id` is bound as `$n::uuid IS NULL OR company_id = $n`; `owner_id`
/// narrows owned rows (projects, notes) for plain users.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope {
    pub company_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

impl Scope {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn company(company_id: Uuid) -> Self {
        Self {
            company_id: Some(company_id),
            owner_id: None,
        }
    }

    /// Same tenant restriction without the per-owner narrowing.
    pub fn tenant_only(self) -> Self {
        Self {
            company_id: self.company_id,
            owner_id: None,
        }
    }
}

/// Which side of the soft-delete flag a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    Excluded,
    Only,
}

impl Deleted {
    pub fn flag(self) -> bool {
        matches!(self, Deleted::Only)
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
}

impl PageRequest {
    pub fn new(
        page: Option<i64>,
        page_size: Option<i64>,
        search: Option<String>,
        sort_by: Option<String>,
        sort_desc: Option<bool>,
    ) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            search: search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            sort_by,
            sort_desc: sort_desc.unwrap_or(false),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    /// ILIKE pattern for the search term with LIKE metacharacters escaped.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }

    /// `ORDER BY` body from a whitelist of `(api name, column)` pairs. Unknown
    /// keys fall back to the first entry. `id` is appended as a tiebreaker so
    /// pages are stable.
    pub fn order_by(&self, columns: &[(&str, &'static str)]) -> String {
        let column = self
            .sort_by
            .as_deref()
            .and_then(|key| {
                columns
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(key))
                    .map(|(_, col)| *col)
            })
            .unwrap_or(columns[0].1);
        let direction = if self.sort_desc { "DESC" } else { "ASC" };
        format!("{column} {direction}, id {direction}")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total_count: i64, request: &PageRequest) -> Self {
        let total_pages = (total_count + request.page_size - 1) / request.page_size;
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
            total_pages,
        }
    }
}
