use serde::Serialize;
use utoipa::ToSchema;

use crate::model::period::{Month, Period};

/// One faculty member's pay for one period. Faculty identity fields are
/// copied at upload time, so records outlive the faculty row.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecord {
    pub id: u64,
    pub faculty_username: String,
    pub faculty_name: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub year: i32,
    pub month: Month,
    pub basic_pay: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub net_pay: f64,
}

impl SalaryRecord {
    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSalaryRecord {
    pub faculty_username: String,
    pub faculty_name: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub period: Period,
    pub basic_pay: f64,
    pub allowances: f64,
    pub deductions: f64,
}

impl NewSalaryRecord {
    pub fn net_pay(&self) -> f64 {
        self.basic_pay + self.allowances - self.deductions
    }
}

/// Number of salary records uploaded for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PeriodCount {
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = "March")]
    pub month: Month,
    #[schema(example = 42)]
    pub count: u64,
}

impl PeriodCount {
    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }
}
