use crate::model::{
    account::Account,
    faculty::{Faculty, FacultyChanges, NewFaculty},
    period::{Month, Period},
    salary::{NewSalaryRecord, PeriodCount, SalaryRecord},
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (faculty username, salary period) is already taken.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

/// Which periods a salary read covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodFilter {
    Month(Period),
    Year(i32),
    Periods(Vec<Period>),
}

impl PeriodFilter {
    pub fn matches(&self, period: Period) -> bool {
        match self {
            PeriodFilter::Month(p) => *p == period,
            PeriodFilter::Year(year) => period.year == *year,
            PeriodFilter::Periods(periods) => periods.contains(&period),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryQuery {
    pub periods: PeriodFilter,
    /// Restrict to one faculty member's records.
    pub faculty_username: Option<String>,
}

impl SalaryQuery {
    pub fn matches(&self, record: &SalaryRecord) -> bool {
        self.periods.matches(record.period())
            && self
                .faculty_username
                .as_deref()
                .is_none_or(|u| u == record.faculty_username)
    }
}

/// Persistence port for faculty, salary and account data.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Looks up an admin or faculty login by username.
    async fn find_account(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Creates the admin account unless it exists. Returns true when created.
    async fn ensure_admin(&self, username: &str, password_hash: &str) -> Result<bool, StoreError>;

    async fn list_faculty(&self) -> Result<Vec<Faculty>, StoreError>;

    async fn get_faculty(&self, id: u64) -> Result<Option<Faculty>, StoreError>;

    async fn find_faculty_by_username(&self, username: &str)
    -> Result<Option<Faculty>, StoreError>;

    /// Inserts a new faculty member, failing with `Conflict` on a taken username.
    async fn insert_faculty(&self, faculty: &NewFaculty) -> Result<u64, StoreError>;

    /// Creates the faculty member or overwrites the one with the same username.
    async fn upsert_faculty(&self, faculty: &NewFaculty) -> Result<WriteOutcome, StoreError>;

    /// Returns false when no faculty has this id.
    async fn update_faculty(&self, id: u64, changes: &FacultyChanges) -> Result<bool, StoreError>;

    /// Returns false when no faculty has this id. Salary records are kept.
    async fn delete_faculty(&self, id: u64) -> Result<bool, StoreError>;

    /// Stores the record, replacing an existing one for the same faculty and period.
    async fn upsert_salary(&self, record: &NewSalaryRecord) -> Result<WriteOutcome, StoreError>;

    async fn salary_records(&self, query: &SalaryQuery) -> Result<Vec<SalaryRecord>, StoreError>;

    async fn salary_period_counts(
        &self,
        faculty_username: Option<&str>,
    ) -> Result<Vec<PeriodCount>, StoreError>;

    /// Removes every salary record of the period, returning how many went.
    async fn delete_salary_period(&self, year: i32, month: Month) -> Result<u64, StoreError>;
}
