use std::future::Future;

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
use crate::models::CsvRecord;

/// Data rows are numbered the way a spreadsheet shows them: the header is row 1.
const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Serialize, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

/// Rows that deserialized cleanly, each with its row number, and the rows that did not.
#[derive(Debug)]
pub struct ParsedRows<T> {
    pub rows: Vec<(usize, T)>,
    pub errors: Vec<RowError>,
}

/// Read a CSV document into typed records. Columns are matched by header name;
/// a row that fails to parse is reported and the rest of the file is still read.
pub fn parse<T: DeserializeOwned>(data: &[u8]) -> Result<ParsedRows<T>, String> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| format!("Invalid CSV header: {e}"))?
        .clone();
    if headers.iter().all(str::is_empty) {
        return Err("CSV file has no header row".to_string());
    }

    let mut parsed = ParsedRows {
        rows: Vec::new(),
        errors: Vec::new(),
    };

    for (index, record) in reader.records().enumerate() {
        let row = index + FIRST_DATA_ROW;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                parsed.errors.push(RowError {
                    row,
                    errors: vec![describe(&e, &headers)],
                });
                continue;
            }
        };

        match record.deserialize::<T>(Some(&headers)) {
            Ok(value) => parsed.rows.push((row, value)),
            Err(e) => parsed.errors.push(RowError {
                row,
                errors: vec![describe(&e, &headers)],
            }),
        }
    }

    Ok(parsed)
}

/// Name the offending column by its header rather than its position.
fn describe(err: &csv::Error, headers: &csv::StringRecord) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => {
            let column = err
                .field()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| headers.get(i));
            match column {
                Some(column) => format!("{column}: {}", err.kind()),
                None => err.kind().to_string(),
            }
        }
        _ => err.to_string(),
    }
}

/// Feed every parsed row through `op` in file order. A failing row is recorded
/// and does not stop the rows after it.
pub async fn import<T, R, F, Fut>(parsed: ParsedRows<T>, mut op: F) -> ImportReport
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, AppError>>,
{
    let mut errors = parsed.errors;
    let mut imported = 0;

    for (row, input) in parsed.rows {
        match op(input).await {
            Ok(_) => imported += 1,
            Err(e) => errors.push(RowError {
                row,
                errors: e.record_errors(),
            }),
        }
    }

    errors.sort_by_key(|e| e.row);
    if !errors.is_empty() {
        tracing::warn!(imported, failed = errors.len(), "CSV import rejected rows");
    }

    ImportReport {
        imported,
        failed: errors.len(),
        errors,
    }
}

/// Write export rows under the record type's header line.
pub fn write<R: CsvRecord>(rows: &[R]) -> Result<Vec<u8>, String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(R::HEADERS)
        .map_err(|e| format!("CSV write error: {e}"))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| format!("CSV write error: {e}"))?;
    }

    writer
        .into_inner()
        .map_err(|e| format!("CSV write error: {e}"))
}

/// Build the export download response.
pub fn attachment<R: CsvRecord>(filename: &str, rows: &[R]) -> Result<Response, AppError> {
    let body = write(rows).map_err(AppError::Internal)?;
    let disposition = format!("attachment; filename=\"{filename}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Extract the CSV document from an import request. A multipart upload uses the
/// first field that carries a file name, or a field named `file`; any other body
/// is taken as the CSV text itself.
pub async fn read_upload(headers: &HeaderMap, body: Bytes) -> Result<Bytes, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let data = if content_type.is_some_and(|ct| ct.contains("multipart/form-data")) {
        read_multipart_file(content_type.unwrap_or_default(), body)
            .await
            .map_err(AppError::BadRequest)?
    } else {
        body
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("CSV file is empty".to_string()));
    }
    Ok(data)
}

async fn read_multipart_file(content_type: &str, body: Bytes) -> Result<Bytes, String> {
    let boundary =
        multer::parse_boundary(content_type).map_err(|_| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|e| format!("Field read error: {e}"));
        }
    }

    Err("Multipart body has no file field".to_string())
}
