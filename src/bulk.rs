use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, PartialEq)]
pub struct RecordError {
    pub index: usize,
    pub errors: Vec<String>,
}

/// Outcome of a bulk request. `index` in each error is the record's position in the request array.
#[derive(Debug, Serialize)]
pub struct BulkResult<T> {
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<T>,
    pub errors: Vec<RecordError>,
}

/// One element of a bulk-update body: the row id next to the update fields.
#[derive(Debug, Deserialize)]
pub struct BulkUpdateItem<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct BulkDelete {
    pub ids: Vec<Uuid>,
}

/// Run `op` over each record in order. Records are independent: a failure is
/// recorded against its index and processing continues.
pub async fn run<I, T, F, Fut>(records: Vec<I>, mut op: F) -> BulkResult<T>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut items = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        match op(record).await {
            Ok(item) => items.push(item),
            Err(e) => errors.push(RecordError {
                index,
                errors: e.record_errors(),
            }),
        }
    }

    BulkResult {
        succeeded: items.len(),
        failed: errors.len(),
        items,
        errors,
    }
}

/// Bulk delete reports counts only.
pub async fn run_deletes<F, Fut>(ids: Vec<Uuid>, op: F) -> BulkResult<Uuid>
where
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = Result<Uuid, AppError>>,
{
    let mut result = run(ids, op).await;
    result.items.clear();
    result
}
