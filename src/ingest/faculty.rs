use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::{IngestError, column, field, is_blank, line_of, reader, row_error};
use crate::auth::password::hash_password_blocking;
use crate::model::faculty::{NewFaculty, non_empty, parse_amount};
use crate::store::{RecordStore, StoreError, WriteOutcome};

pub const FACULTY_HEADERS: [&str; 6] = [
    "name",
    "username",
    "password",
    "department",
    "designation",
    "baseSalary",
];

#[derive(Debug, Default, Serialize, ToSchema)]
#[schema(example = json!({
    "successful": 2,
    "failed": 1,
    "errors": ["Line 4: username is required"]
}))]
pub struct FacultyUploadSummary {
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl FacultyUploadSummary {
    fn fail(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

/// A faculty row that passed validation; the password is still plaintext.
#[derive(Debug, PartialEq)]
pub struct FacultyRow {
    pub name: String,
    pub username: String,
    pub password: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub base_salary: f64,
}

/// Validates the fields of a manual add or a CSV row.
pub fn validate_faculty(
    name: &str,
    username: &str,
    password: &str,
    department: &str,
    designation: &str,
    base_salary: &str,
) -> Result<FacultyRow, String> {
    let mut missing = Vec::new();
    for (label, value) in [("name", name), ("username", username), ("password", password)] {
        if value.trim().is_empty() {
            missing.push(label);
        }
    }
    if !missing.is_empty() {
        return Err(format!("missing required field(s): {}", missing.join(", ")));
    }

    let base_salary = parse_amount(base_salary).ok_or_else(|| {
        format!("baseSalary must be a non-negative number, got '{base_salary}'")
    })?;

    Ok(FacultyRow {
        name: name.trim().to_string(),
        username: username.trim().to_string(),
        password: password.to_string(),
        department: non_empty(department),
        designation: non_empty(designation),
        base_salary,
    })
}

struct Columns([usize; 6]);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, IngestError> {
        let mismatch = || IngestError::HeaderMismatch {
            expected: FACULTY_HEADERS.join(","),
            found: headers.iter().collect::<Vec<_>>().join(","),
        };
        if headers.len() != FACULTY_HEADERS.len() {
            return Err(mismatch());
        }
        let mut indexes = [0; 6];
        for (slot, name) in indexes.iter_mut().zip(FACULTY_HEADERS) {
            *slot = column(headers, name).ok_or_else(|| mismatch())?;
        }
        Ok(Columns(indexes))
    }

    fn validate(&self, record: &StringRecord) -> Result<FacultyRow, String> {
        let [name, username, password, department, designation, base_salary] =
            self.0.map(|i| field(record, Some(i)));
        validate_faculty(name, username, password, department, designation, base_salary)
    }
}

/// Creates or updates (by username) one faculty member per CSV row.
#[instrument(name = "ingest_faculty", skip(store, data), fields(bytes = data.len()))]
pub async fn ingest_faculty_csv(
    store: &dyn RecordStore,
    data: &[u8],
) -> Result<FacultyUploadSummary, IngestError> {
    let mut reader = reader(data);
    let headers = reader.headers()?.clone();
    let columns = Columns::from_headers(&headers)?;

    let mut summary = FacultyUploadSummary::default();
    let mut updated = 0usize;

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
        let username = field(&record, column(&headers, "username")).trim();

        let row = match columns.validate(&record) {
            Ok(row) => row,
            Err(message) => {
                debug!(line, "Faculty row rejected");
                summary.fail(row_error(line, username, message));
                continue;
            }
        };

        let password_hash = match hash_password_blocking(row.password).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(line, error = %e, "Password hashing failed");
                summary.fail(row_error(line, &row.username, "password could not be hashed"));
                continue;
            }
        };

        let faculty = NewFaculty {
            name: row.name,
            username: row.username,
            password_hash,
            department: row.department,
            designation: row.designation,
            base_salary: row.base_salary,
        };

        match store.upsert_faculty(&faculty).await {
            Ok(outcome) => {
                summary.successful += 1;
                if outcome == WriteOutcome::Updated {
                    updated += 1;
                }
            }
            Err(StoreError::Conflict(msg)) => {
                summary.fail(row_error(line, &faculty.username, format!("could not be saved: {msg}")));
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        successful = summary.successful,
        updated,
        failed = summary.failed,
        "Faculty CSV processed"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::store::MemoryStore;

    const HEADER: &str = "name,username,password,department,designation,baseSalary\n";

    #[actix_web::test]
    async fn valid_rows_are_created_with_hashed_passwords() {
        let store = MemoryStore::new();
        let csv = format!(
            "{HEADER}Jane Doe,jdoe,pw1,Physics,Professor,52000\nJohn Roe,jroe,pw2,,,0\n"
        );
        let summary = ingest_faculty_csv(&store, csv.as_bytes()).await.unwrap();
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.errors.is_empty());

        let jane = store.find_faculty_by_username("jdoe").await.unwrap().unwrap();
        assert_ne!(jane.password_hash, "pw1");
        assert!(verify_password("pw1", &jane.password_hash).is_ok());
        let john = store.find_faculty_by_username("jroe").await.unwrap().unwrap();
        assert_eq!(john.department, None);
    }

    #[actix_web::test]
    async fn reingesting_same_username_upserts() {
        let store = MemoryStore::new();
        let first = format!("{HEADER}Jane Doe,jdoe,pw,Physics,Lecturer,40000\n");
        let second = format!("{HEADER}Jane Doe,jdoe,pw,Physics,Professor,52000\n");

        ingest_faculty_csv(&store, first.as_bytes()).await.unwrap();
        let summary = ingest_faculty_csv(&store, second.as_bytes()).await.unwrap();

        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 0);
        let all = store.list_faculty().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].designation.as_deref(), Some("Professor"));
        assert_eq!(all[0].base_salary, 52000.0);
    }

    #[actix_web::test]
    async fn bad_rows_are_tallied_without_aborting() {
        let store = MemoryStore::new();
        let csv = format!(
            "{HEADER}\
             Jane Doe,jdoe,pw,Physics,Professor,52000\n\
             No User,,pw,Physics,Professor,1000\n\
             Bad Salary,bsal,pw,Physics,Professor,-5\n\
             Text Salary,tsal,pw,Physics,Professor,lots\n\
             No Password,npw,,Physics,Professor,1000\n\
             John Roe,jroe,pw,,,100.5\n"
        );
        let summary = ingest_faculty_csv(&store, csv.as_bytes()).await.unwrap();

        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.successful + summary.failed, 6);
        assert_eq!(summary.errors.len(), 4);
        assert!(summary.errors[0].starts_with("Line 3:"));
        assert!(summary.errors[0].contains("username"));
        assert!(summary.errors[1].contains("(bsal)"));
        assert!(summary.errors[2].contains("'lots'"));
        assert!(summary.errors[3].contains("password"));
        assert_eq!(store.list_faculty().await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn password_padding_is_kept_like_a_manual_add() {
        let store = MemoryStore::new();
        let csv = format!("{HEADER} Amy , amy , pw ,Maths,, 10 \n");
        let summary = ingest_faculty_csv(&store, csv.as_bytes()).await.unwrap();
        assert_eq!(summary.successful, 1);

        let amy = store.find_faculty_by_username("amy").await.unwrap().unwrap();
        assert_eq!(amy.name, "Amy");
        assert_eq!(amy.designation, None);
        assert_eq!(amy.base_salary, 10.0);
        assert!(verify_password(" pw ", &amy.password_hash).is_ok());
        assert!(verify_password("pw", &amy.password_hash).is_err());
    }

    #[actix_web::test]
    async fn header_order_does_not_matter() {
        let store = MemoryStore::new();
        let csv = "baseSalary,designation,department,password,username,name\n\
                   1000,Lecturer,Maths,pw,amy,Amy\n";
        let summary = ingest_faculty_csv(&store, csv.as_bytes()).await.unwrap();
        assert_eq!(summary.successful, 1);
        let amy = store.find_faculty_by_username("amy").await.unwrap().unwrap();
        assert_eq!(amy.name, "Amy");
        assert_eq!(amy.base_salary, 1000.0);
    }

    #[actix_web::test]
    async fn header_must_match_exactly() {
        let store = MemoryStore::new();
        for header in [
            "name,username,password,department,designation\n",
            "Name,username,password,department,designation,baseSalary\n",
            "name,username,password,department,designation,baseSalary,extra\n",
        ] {
            let csv = format!("{header}a,b,c,d,e,1\n");
            let err = ingest_faculty_csv(&store, csv.as_bytes()).await.unwrap_err();
            assert!(matches!(err, IngestError::HeaderMismatch { .. }), "{header}");
        }
        assert!(store.list_faculty().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn bom_and_blank_lines_are_ignored() {
        let store = MemoryStore::new();
        let csv = format!("\u{feff}{HEADER}\nAmy,amy,pw,,,10\n,,,,,\n");
        let summary = ingest_faculty_csv(&store, csv.as_bytes()).await.unwrap();
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn validate_reports_all_missing_required_fields() {
        let err = validate_faculty("", "", "", "", "", "10").unwrap_err();
        assert_eq!(err, "missing required field(s): name, username, password");
    }
}
