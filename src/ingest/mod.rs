//! Bulk CSV ingestion with per-row success/failure accounting.
//!
//! A bad row never aborts the batch: it is counted as failed and described in
//! `errors`. Only file-level problems (wrong header, unreadable input) and an
//! unreachable store fail the whole upload.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::store::StoreError;

pub mod faculty;
pub mod salary;

pub use faculty::{FacultyUploadSummary, ingest_faculty_csv};
pub use salary::{SalaryUploadSummary, ingest_salary_csv};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("CSV header must be exactly: {expected}. Found: {found}")]
    HeaderMismatch { expected: String, found: String },
    #[error("CSV header is missing the required '{0}' column")]
    MissingColumn(&'static str),
    #[error("CSV file could not be read: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn reader(data: &[u8]) -> csv::Reader<&[u8]> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    ReaderBuilder::new()
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(data)
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Raw cell text. Only headers are trimmed by the reader, so callers trim the
/// fields where padding is not significant.
fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| record.get(i)).unwrap_or("")
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

/// Formats one row failure, e.g. `Line 4 (jdoe): password is required`.
fn row_error(line: u64, username: &str, message: impl std::fmt::Display) -> String {
    if username.is_empty() {
        format!("Line {line}: {message}")
    } else {
        format!("Line {line} ({username}): {message}")
    }
}
