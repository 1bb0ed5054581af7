use sqlx::MySqlPool;
use tracing::{debug, error};

use super::{PeriodFilter, RecordStore, SalaryQuery, StoreError, WriteOutcome};
use crate::model::{
    account::Account,
    faculty::{Faculty, FacultyChanges, NewFaculty},
    period::Month,
    role::Role,
    salary::{NewSalaryRecord, PeriodCount, SalaryRecord},
};

const FACULTY_COLUMNS: &str =
    "id, name, username, password AS password_hash, department, designation, base_salary";

const SALARY_COLUMNS: &str = "id, faculty_username, faculty_name, department, designation, \
     `year`, `month`, basic_pay, allowances, deductions, net_pay";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// SQL bindable value for dynamically built statements.
#[derive(Debug)]
enum SqlValue {
    String(String),
    NullableString(Option<String>),
    I32(i32),
    F64(f64),
}

#[derive(sqlx::FromRow)]
struct SalaryRow {
    id: u64,
    faculty_username: String,
    faculty_name: String,
    department: Option<String>,
    designation: Option<String>,
    year: i32,
    month: String,
    basic_pay: f64,
    allowances: f64,
    deductions: f64,
    net_pay: f64,
}

impl TryFrom<SalaryRow> for SalaryRecord {
    type Error = StoreError;

    fn try_from(row: SalaryRow) -> Result<Self, Self::Error> {
        let month = Month::try_from(row.month).map_err(|e| {
            StoreError::Unavailable(format!("salary record {} has a bad month: {e}", row.id))
        })?;
        Ok(SalaryRecord {
            id: row.id,
            faculty_username: row.faculty_username,
            faculty_name: row.faculty_name,
            department: row.department,
            designation: row.designation,
            year: row.year,
            month,
            basic_pay: row.basic_pay,
            allowances: row.allowances,
            deductions: row.deductions,
            net_pay: row.net_pay,
        })
    }
}

fn is_dup_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

fn store_err(context: &str, e: sqlx::Error) -> StoreError {
    if is_dup_key(&e) {
        return StoreError::Conflict(format!("{context}: {e}"));
    }
    error!(error = %e, context, "Database error");
    StoreError::Unavailable(format!("{context}: {e}"))
}

/// Builds the WHERE fragment selecting the filtered periods.
fn period_clause(filter: &PeriodFilter) -> (String, Vec<SqlValue>) {
    match filter {
        PeriodFilter::Month(p) => (
            "(`year` = ? AND `month` = ?)".to_string(),
            vec![SqlValue::I32(p.year), SqlValue::String(p.month.to_string())],
        ),
        PeriodFilter::Year(year) => ("`year` = ?".to_string(), vec![SqlValue::I32(*year)]),
        PeriodFilter::Periods(periods) if periods.is_empty() => ("1 = 0".to_string(), vec![]),
        PeriodFilter::Periods(periods) => {
            let conditions = vec!["(`year` = ? AND `month` = ?)"; periods.len()];
            let values = periods
                .iter()
                .flat_map(|p| [SqlValue::I32(p.year), SqlValue::String(p.month.to_string())])
                .collect();
            (format!("({})", conditions.join(" OR ")), values)
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for MySqlStore {
    async fn find_account(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let admin = sqlx::query_as::<_, (u64, String, String)>(
            "SELECT id, username, password FROM admins WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_err("find admin", e))?;

        if let Some((id, username, password_hash)) = admin {
            return Ok(Some(Account {
                id,
                name: username.clone(),
                username,
                password_hash,
                role: Role::Admin,
            }));
        }

        let faculty = sqlx::query_as::<_, (u64, String, String, String)>(
            "SELECT id, username, name, password FROM faculty WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_err("find faculty account", e))?;

        Ok(faculty.map(|(id, username, name, password_hash)| Account {
            id,
            username,
            name,
            password_hash,
            role: Role::Faculty,
        }))
    }

    async fn ensure_admin(&self, username: &str, password_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT IGNORE INTO admins (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("seed admin", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_faculty(&self) -> Result<Vec<Faculty>, StoreError> {
        let sql = format!("SELECT {FACULTY_COLUMNS} FROM faculty ORDER BY name, id");
        sqlx::query_as::<_, Faculty>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_err("list faculty", e))
    }

    async fn get_faculty(&self, id: u64) -> Result<Option<Faculty>, StoreError> {
        let sql = format!("SELECT {FACULTY_COLUMNS} FROM faculty WHERE id = ?");
        sqlx::query_as::<_, Faculty>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("get faculty", e))
    }

    async fn find_faculty_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Faculty>, StoreError> {
        let sql = format!("SELECT {FACULTY_COLUMNS} FROM faculty WHERE username = ?");
        sqlx::query_as::<_, Faculty>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("find faculty", e))
    }

    async fn insert_faculty(&self, faculty: &NewFaculty) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO faculty
            (name, username, password, department, designation, base_salary)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&faculty.name)
        .bind(&faculty.username)
        .bind(&faculty.password_hash)
        .bind(&faculty.department)
        .bind(&faculty.designation)
        .bind(faculty.base_salary)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err("insert faculty", e))?;

        Ok(result.last_insert_id())
    }

    async fn upsert_faculty(&self, faculty: &NewFaculty) -> Result<WriteOutcome, StoreError> {
        let existing = sqlx::query_scalar::<_, u64>("SELECT id FROM faculty WHERE username = ?")
            .bind(&faculty.username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_err("find faculty", e))?;

        let Some(id) = existing else {
            // a concurrent upload may win the insert; that row reports Conflict
            self.insert_faculty(faculty).await?;
            return Ok(WriteOutcome::Created);
        };

        sqlx::query(
            r#"
            UPDATE faculty
            SET name = ?, password = ?, department = ?, designation = ?, base_salary = ?
            WHERE id = ?
            "#,
        )
        .bind(&faculty.name)
        .bind(&faculty.password_hash)
        .bind(&faculty.department)
        .bind(&faculty.designation)
        .bind(faculty.base_salary)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err("update faculty", e))?;

        Ok(WriteOutcome::Updated)
    }

    async fn update_faculty(&self, id: u64, changes: &FacultyChanges) -> Result<bool, StoreError> {
        let mut sets = Vec::new();
        let mut values = Vec::new();
        let text_fields = [
            ("name", &changes.name),
            ("username", &changes.username),
            ("password", &changes.password_hash),
        ];
        for (column, value) in text_fields {
            if let Some(v) = value {
                sets.push(format!("{column} = ?"));
                values.push(SqlValue::String(v.clone()));
            }
        }
        // Some(None) clears the column
        let nullable_fields = [
            ("department", &changes.department),
            ("designation", &changes.designation),
        ];
        for (column, value) in nullable_fields {
            if let Some(v) = value {
                sets.push(format!("{column} = ?"));
                values.push(SqlValue::NullableString(v.clone()));
            }
        }
        if let Some(base_salary) = changes.base_salary {
            sets.push("base_salary = ?".to_string());
            values.push(SqlValue::F64(base_salary));
        }

        if !sets.is_empty() {
            let sql = format!("UPDATE faculty SET {} WHERE id = ?", sets.join(", "));
            debug!(sql = %sql, "Updating faculty");

            let mut query = sqlx::query(&sql);
            for value in values {
                query = match value {
                    SqlValue::String(v) => query.bind(v),
                    SqlValue::NullableString(v) => query.bind(v),
                    SqlValue::I32(v) => query.bind(v),
                    SqlValue::F64(v) => query.bind(v),
                };
            }
            let result = query
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| store_err("update faculty", e))?;
            if result.rows_affected() > 0 {
                return Ok(true);
            }
        }

        // MySQL reports zero affected rows when nothing changed
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM faculty WHERE id = ?)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| store_err("check faculty", e))?;
        Ok(exists > 0)
    }

    async fn delete_faculty(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM faculty WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("delete faculty", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_salary(&self, record: &NewSalaryRecord) -> Result<WriteOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO salary_records
            (faculty_username, faculty_name, department, designation, `year`, `month`,
             basic_pay, allowances, deductions, net_pay)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                faculty_name = VALUES(faculty_name),
                department = VALUES(department),
                designation = VALUES(designation),
                basic_pay = VALUES(basic_pay),
                allowances = VALUES(allowances),
                deductions = VALUES(deductions),
                net_pay = VALUES(net_pay)
            "#,
        )
        .bind(&record.faculty_username)
        .bind(&record.faculty_name)
        .bind(&record.department)
        .bind(&record.designation)
        .bind(record.period.year)
        .bind(record.period.month.as_str())
        .bind(record.basic_pay)
        .bind(record.allowances)
        .bind(record.deductions)
        .bind(record.net_pay())
        .execute(&self.pool)
        .await
        .map_err(|e| store_err("upsert salary", e))?;

        // 1 = inserted, 2 = replaced, 0 = replaced with identical values
        if result.rows_affected() == 1 {
            Ok(WriteOutcome::Created)
        } else {
            Ok(WriteOutcome::Updated)
        }
    }

    async fn salary_records(&self, query: &SalaryQuery) -> Result<Vec<SalaryRecord>, StoreError> {
        let (mut clause, mut values) = period_clause(&query.periods);
        if let Some(username) = &query.faculty_username {
            clause.push_str(" AND faculty_username = ?");
            values.push(SqlValue::String(username.clone()));
        }
        let sql = format!("SELECT {SALARY_COLUMNS} FROM salary_records WHERE {clause}");
        debug!(sql = %sql, binds = values.len(), "Fetching salary records");

        let mut q = sqlx::query_as::<_, SalaryRow>(&sql);
        for value in values {
            q = match value {
                SqlValue::String(v) => q.bind(v),
                SqlValue::NullableString(v) => q.bind(v),
                SqlValue::I32(v) => q.bind(v),
                SqlValue::F64(v) => q.bind(v),
            };
        }

        q.fetch_all(&self.pool)
            .await
            .map_err(|e| store_err("fetch salary records", e))?
            .into_iter()
            .map(SalaryRecord::try_from)
            .collect()
    }

    async fn salary_period_counts(
        &self,
        faculty_username: Option<&str>,
    ) -> Result<Vec<PeriodCount>, StoreError> {
        let rows = match faculty_username {
            Some(username) => sqlx::query_as::<_, (i32, String, i64)>(
                r#"
                SELECT `year`, `month`, COUNT(*)
                FROM salary_records
                WHERE faculty_username = ?
                GROUP BY `year`, `month`
                "#,
            )
            .bind(username)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as::<_, (i32, String, i64)>(
                "SELECT `year`, `month`, COUNT(*) FROM salary_records GROUP BY `year`, `month`",
            )
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| store_err("count salary periods", e))?;

        rows.into_iter()
            .map(|(year, month, count)| {
                let month = Month::try_from(month)
                    .map_err(|e| StoreError::Unavailable(format!("bad month in history: {e}")))?;
                Ok(PeriodCount {
                    year,
                    month,
                    count: count.max(0) as u64,
                })
            })
            .collect()
    }

    async fn delete_salary_period(&self, year: i32, month: Month) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM salary_records WHERE `year` = ? AND `month` = ?")
            .bind(year)
            .bind(month.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| store_err("delete salary period", e))?;
        Ok(result.rows_affected())
    }
}
