use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{PeriodFilter, RecordStore, SalaryQuery, StoreError, WriteOutcome};
use crate::aggregate::count_by_period;
use crate::model::{
    account::Account,
    faculty::{Faculty, FacultyChanges, NewFaculty},
    period::{Month, Period},
    role::Role,
    salary::{NewSalaryRecord, PeriodCount, SalaryRecord},
};

#[derive(Default)]
struct State {
    admins: Vec<Account>,
    faculty: BTreeMap<u64, Faculty>,
    salaries: BTreeMap<u64, SalaryRecord>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn faculty_by_username(&self, username: &str) -> Option<&Faculty> {
        self.faculty.values().find(|f| f.username == username)
    }
}

/// In-process store backing the `memory` backend and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

fn build_faculty(id: u64, new: &NewFaculty) -> Faculty {
    Faculty {
        id,
        name: new.name.clone(),
        username: new.username.clone(),
        password_hash: new.password_hash.clone(),
        department: new.department.clone(),
        designation: new.designation.clone(),
        base_salary: new.base_salary,
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn find_account(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let state = self.read()?;
        if let Some(admin) = state.admins.iter().find(|a| a.username == username) {
            return Ok(Some(admin.clone()));
        }
        Ok(state.faculty_by_username(username).map(|f| Account {
            id: f.id,
            username: f.username.clone(),
            name: f.name.clone(),
            password_hash: f.password_hash.clone(),
            role: Role::Faculty,
        }))
    }

    async fn ensure_admin(&self, username: &str, password_hash: &str) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.admins.iter().any(|a| a.username == username) {
            return Ok(false);
        }
        let id = state.next_id();
        state.admins.push(Account {
            id,
            username: username.to_string(),
            name: username.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::Admin,
        });
        Ok(true)
    }

    async fn list_faculty(&self) -> Result<Vec<Faculty>, StoreError> {
        let mut all: Vec<Faculty> = self.read()?.faculty.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get_faculty(&self, id: u64) -> Result<Option<Faculty>, StoreError> {
        Ok(self.read()?.faculty.get(&id).cloned())
    }

    async fn find_faculty_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Faculty>, StoreError> {
        Ok(self.read()?.faculty_by_username(username).cloned())
    }

    async fn insert_faculty(&self, faculty: &NewFaculty) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        if state.faculty_by_username(&faculty.username).is_some() {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                faculty.username
            )));
        }
        let id = state.next_id();
        state.faculty.insert(id, build_faculty(id, faculty));
        Ok(id)
    }

    async fn upsert_faculty(&self, faculty: &NewFaculty) -> Result<WriteOutcome, StoreError> {
        let mut state = self.write()?;
        let existing = state.faculty_by_username(&faculty.username).map(|f| f.id);
        match existing {
            Some(id) => {
                state.faculty.insert(id, build_faculty(id, faculty));
                Ok(WriteOutcome::Updated)
            }
            None => {
                let id = state.next_id();
                state.faculty.insert(id, build_faculty(id, faculty));
                Ok(WriteOutcome::Created)
            }
        }
    }

    async fn update_faculty(&self, id: u64, changes: &FacultyChanges) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if let Some(username) = &changes.username {
            if state
                .faculty
                .values()
                .any(|f| f.id != id && &f.username == username)
            {
                return Err(StoreError::Conflict(format!(
                    "username '{username}' already exists"
                )));
            }
        }
        match state.faculty.get_mut(&id) {
            Some(faculty) => {
                changes.apply(faculty);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_faculty(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.write()?.faculty.remove(&id).is_some())
    }

    async fn upsert_salary(&self, record: &NewSalaryRecord) -> Result<WriteOutcome, StoreError> {
        let mut state = self.write()?;
        let existing = state
            .salaries
            .values()
            .find(|r| r.faculty_username == record.faculty_username && r.period() == record.period)
            .map(|r| r.id);
        let (id, outcome) = match existing {
            Some(id) => (id, WriteOutcome::Updated),
            None => (state.next_id(), WriteOutcome::Created),
        };
        state.salaries.insert(
            id,
            SalaryRecord {
                id,
                faculty_username: record.faculty_username.clone(),
                faculty_name: record.faculty_name.clone(),
                department: record.department.clone(),
                designation: record.designation.clone(),
                year: record.period.year,
                month: record.period.month,
                basic_pay: record.basic_pay,
                allowances: record.allowances,
                deductions: record.deductions,
                net_pay: record.net_pay(),
            },
        );
        Ok(outcome)
    }

    async fn salary_records(&self, query: &SalaryQuery) -> Result<Vec<SalaryRecord>, StoreError> {
        Ok(self
            .read()?
            .salaries
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn salary_period_counts(
        &self,
        faculty_username: Option<&str>,
    ) -> Result<Vec<PeriodCount>, StoreError> {
        let state = self.read()?;
        let records = state
            .salaries
            .values()
            .filter(|r| faculty_username.is_none_or(|u| u == r.faculty_username));
        Ok(count_by_period(records))
    }

    async fn delete_salary_period(&self, year: i32, month: Month) -> Result<u64, StoreError> {
        let filter = PeriodFilter::Month(Period::new(year, month));
        let mut state = self.write()?;
        let before = state.salaries.len();
        state.salaries.retain(|_, r| !filter.matches(r.period()));
        Ok((before - state.salaries.len()) as u64)
    }
}
