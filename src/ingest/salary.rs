use std::collections::HashSet;

use csv::StringRecord;
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{IngestError, column, field, is_blank, line_of, reader, row_error};
use crate::model::{
    faculty::{Faculty, parse_amount},
    period::Period,
    salary::NewSalaryRecord,
};
use crate::store::{RecordStore, StoreError, WriteOutcome};

#[derive(Debug, Default, Serialize, ToSchema)]
#[schema(example = json!({
    "created": 41,
    "failed": 1,
    "errors": ["Line 7 (ghost): no faculty member with this username"]
}))]
pub struct SalaryUploadSummary {
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl SalaryUploadSummary {
    fn fail(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

struct Columns {
    username: usize,
    basic_pay: Option<usize>,
    allowances: Option<usize>,
    deductions: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, IngestError> {
        Ok(Columns {
            username: column(headers, "username").ok_or(IngestError::MissingColumn("username"))?,
            basic_pay: column(headers, "basicPay"),
            allowances: column(headers, "allowances"),
            deductions: column(headers, "deductions"),
        })
    }
}

/// Optional amount: empty means `default`, anything else must parse.
fn amount(raw: &str, label: &str, default: f64) -> Result<f64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    parse_amount(raw).ok_or_else(|| format!("{label} must be a non-negative number, got '{raw}'"))
}

fn build_record(
    columns: &Columns,
    record: &StringRecord,
    faculty: &Faculty,
    period: Period,
) -> Result<NewSalaryRecord, String> {
    let basic_pay = amount(field(record, columns.basic_pay), "basicPay", faculty.base_salary)?;
    let allowances = amount(field(record, columns.allowances), "allowances", 0.0)?;
    let deductions = amount(field(record, columns.deductions), "deductions", 0.0)?;

    Ok(NewSalaryRecord {
        faculty_username: faculty.username.clone(),
        faculty_name: faculty.name.clone(),
        department: faculty.department.clone(),
        designation: faculty.designation.clone(),
        period,
        basic_pay,
        allowances,
        deductions,
    })
}

/// Stores one salary record per CSV row for the uploader-supplied period.
/// Re-uploading a period replaces each faculty member's existing record.
#[instrument(name = "ingest_salary", skip(store, data), fields(period = %period, bytes = data.len()))]
pub async fn ingest_salary_csv(
    store: &dyn RecordStore,
    period: Period,
    data: &[u8],
) -> Result<SalaryUploadSummary, IngestError> {
    let mut reader = reader(data);
    let headers = reader.headers()?.clone();
    let columns = Columns::from_headers(&headers)?;

    let mut summary = SalaryUploadSummary::default();
    let mut seen = HashSet::new();
    let mut replaced = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                summary.fail(row_error(line, "", format!("unreadable row: {e}")));
                continue;
            }
        };
        if is_blank(&record) {
            continue;
        }
        let line = line_of(&record);
        let username = field(&record, Some(columns.username)).trim();

        if username.is_empty() {
            summary.fail(row_error(line, "", "username is required"));
            continue;
        }
        // only a stored row claims its username
        if seen.contains(username) {
            summary.fail(row_error(line, username, "duplicate row for this username in the upload"));
            continue;
        }

        let Some(faculty) = store.find_faculty_by_username(username).await? else {
            summary.fail(row_error(line, username, "no faculty member with this username"));
            continue;
        };

        let new_record = match build_record(&columns, &record, &faculty, period) {
            Ok(r) => r,
            Err(message) => {
                summary.fail(row_error(line, username, message));
                continue;
            }
        };

        match store.upsert_salary(&new_record).await {
            Ok(outcome) => {
                seen.insert(username.to_string());
                summary.created += 1;
                if outcome == WriteOutcome::Updated {
                    replaced += 1;
                }
            }
            Err(StoreError::Conflict(msg)) => {
                summary.fail(row_error(line, username, format!("could not be saved: {msg}")));
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        created = summary.created,
        replaced,
        failed = summary.failed,
        "Salary CSV processed"
    );

    Ok(summary)
}
