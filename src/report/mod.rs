//! Salary report generation: picks the records a scope covers and renders
//! them as a PDF of payslips.

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::model::{period::Period, salary::SalaryRecord};
use crate::store::{PeriodFilter, RecordStore, SalaryQuery, StoreError};

pub mod pdf;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("months must be one of 3, 6, 9 or 12, got {0}")]
    InvalidWindow(u32),
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Length of a rolling report, in calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow(u32);

impl RollingWindow {
    pub const ALLOWED: [u32; 4] = [3, 6, 9, 12];

    pub fn new(months: u32) -> Result<Self, ReportError> {
        if Self::ALLOWED.contains(&months) {
            Ok(Self(months))
        } else {
            Err(ReportError::InvalidWindow(months))
        }
    }

    pub fn months(self) -> u32 {
        self.0
    }

    /// The window's periods, ending at the month containing `today`.
    pub fn periods(self, today: NaiveDate) -> Vec<Period> {
        Period::containing(today).trailing(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Month(Period),
    Year(i32),
    Rolling(RollingWindow),
}

impl ReportScope {
    pub fn period_filter(&self, today: NaiveDate) -> PeriodFilter {
        match *self {
            ReportScope::Month(period) => PeriodFilter::Month(period),
            ReportScope::Year(year) => PeriodFilter::Year(year),
            ReportScope::Rolling(window) => PeriodFilter::Periods(window.periods(today)),
        }
    }

    /// Attachment filename. `faculty` is the requesting faculty member's
    /// username, `None` for an admin.
    pub fn filename(&self, faculty: Option<&str>) -> String {
        match (self, faculty) {
            (ReportScope::Rolling(w), None) => {
                format!("Admin_Bulk_Payslips_Last_{}_Months.pdf", w.months())
            }
            (ReportScope::Rolling(w), Some(username)) => {
                format!("{username}_Payslips_Last_{}_Months.pdf", w.months())
            }
            (ReportScope::Year(year), _) => format!("{year}_Report.pdf"),
            (ReportScope::Month(period), _) => {
                format!("{}_{}_Report.pdf", period.year, period.month)
            }
        }
    }

    /// Human-readable scope, used in headings and the empty-report notice.
    pub fn describe(&self, today: NaiveDate) -> String {
        match *self {
            ReportScope::Month(period) => period.to_string(),
            ReportScope::Year(year) => year.to_string(),
            ReportScope::Rolling(window) => {
                let periods = window.periods(today);
                match (periods.first(), periods.last()) {
                    (Some(first), Some(last)) => format!(
                        "the last {} months ({first} to {last})",
                        window.months()
                    ),
                    _ => format!("the last {} months", window.months()),
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub filename: String,
    pub bytes: Vec<u8>,
}

fn report_order(records: &mut [SalaryRecord]) {
    records.sort_by(|a, b| {
        (a.period(), &a.faculty_name, &a.faculty_username).cmp(&(
            b.period(),
            &b.faculty_name,
            &b.faculty_username,
        ))
    });
}

/// Splits ordered records into one section per period.
fn sections_by_period(records: &[SalaryRecord]) -> Vec<pdf::Section<'_>> {
    records
        .chunk_by(|a, b| a.period() == b.period())
        .map(|chunk| pdf::Section {
            heading: chunk.first().map(|r| r.period().to_string()),
            records: chunk,
        })
        .collect()
}

/// Builds the report for `scope`. With `faculty` set, only that faculty
/// member's records are included.
#[instrument(skip(store))]
pub async fn generate(
    store: &dyn RecordStore,
    scope: ReportScope,
    faculty: Option<&str>,
    today: NaiveDate,
) -> Result<Report, ReportError> {
    let query = SalaryQuery {
        periods: scope.period_filter(today),
        faculty_username: faculty.map(str::to_string),
    };
    let mut records = store.salary_records(&query).await?;
    report_order(&mut records);

    let description = scope.describe(today);
    let sections = match scope {
        ReportScope::Year(_) => sections_by_period(&records),
        _ => vec![pdf::Section {
            heading: None,
            records: &records,
        }],
    };

    let bytes = pdf::render(&description, &sections, today)?;
    let filename = scope.filename(faculty);

    info!(
        filename = %filename,
        records = records.len(),
        bytes = bytes.len(),
        "Salary report generated"
    );

    Ok(Report { filename, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{period::Month, salary::NewSalaryRecord};
    use crate::store::MemoryStore;

    fn june_2025() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    fn mentions(bytes: &[u8], text: &str) -> bool {
        bytes.windows(text.len()).any(|w| w == text.as_bytes())
    }

    async fn seed(store: &MemoryStore, username: &str, name: &str, period: Period) {
        store
            .upsert_salary(&NewSalaryRecord {
                faculty_username: username.into(),
                faculty_name: name.into(),
                department: Some("Physics".into()),
                designation: None,
                period,
                basic_pay: 1000.0,
                allowances: 100.0,
                deductions: 50.0,
            })
            .await
            .unwrap();
    }

    #[test]
    fn only_quarter_multiples_are_valid_windows() {
        for months in RollingWindow::ALLOWED {
            assert!(RollingWindow::new(months).is_ok());
        }
        for months in [0, 1, 4, 13, 24] {
            assert!(matches!(
                RollingWindow::new(months),
                Err(ReportError::InvalidWindow(m)) if m == months
            ));
        }
    }

    #[test]
    fn three_month_window_in_june_excludes_march() {
        let window = RollingWindow::new(3).unwrap();
        let filter = ReportScope::Rolling(window).period_filter(june_2025());
        assert!(filter.matches(Period::new(2025, Month::April)));
        assert!(filter.matches(Period::new(2025, Month::May)));
        assert!(filter.matches(Period::new(2025, Month::June)));
        assert!(!filter.matches(Period::new(2025, Month::March)));
        assert!(!filter.matches(Period::new(2025, Month::July)));
    }

    #[test]
    fn filenames_follow_scope_and_viewer() {
        let window = ReportScope::Rolling(RollingWindow::new(6).unwrap());
        assert_eq!(window.filename(None), "Admin_Bulk_Payslips_Last_6_Months.pdf");
        assert_eq!(window.filename(Some("jdoe")), "jdoe_Payslips_Last_6_Months.pdf");
        assert_eq!(ReportScope::Year(2025).filename(None), "2025_Report.pdf");
        assert_eq!(
            ReportScope::Month(Period::new(2025, Month::March)).filename(Some("jdoe")),
            "2025_March_Report.pdf"
        );
    }

    #[test]
    fn rolling_description_names_window_bounds() {
        let scope = ReportScope::Rolling(RollingWindow::new(3).unwrap());
        assert_eq!(
            scope.describe(june_2025()),
            "the last 3 months (April 2025 to June 2025)"
        );
    }

    #[actix_web::test]
    async fn rolling_report_covers_window_records_only() {
        let store = MemoryStore::new();
        seed(&store, "jdoe", "Jane Doe", Period::new(2025, Month::March)).await;
        seed(&store, "jdoe", "Jane Doe", Period::new(2025, Month::May)).await;
        seed(&store, "arun", "Arun Rao", Period::new(2025, Month::June)).await;

        let scope = ReportScope::Rolling(RollingWindow::new(3).unwrap());
        let report = generate(&store, scope, None, june_2025()).await.unwrap();
        assert_eq!(page_count(&report.bytes), 2);
        assert!(!mentions(&report.bytes, "March 2025"));
        assert_eq!(report.filename, "Admin_Bulk_Payslips_Last_3_Months.pdf");
        assert!(report.bytes.starts_with(b"%PDF"));
    }

    #[actix_web::test]
    async fn faculty_viewer_sees_only_own_records() {
        let store = MemoryStore::new();
        let may = Period::new(2025, Month::May);
        seed(&store, "jdoe", "Jane Doe", may).await;
        seed(&store, "arun", "Arun Rao", may).await;

        let report = generate(&store, ReportScope::Month(may), Some("jdoe"), june_2025())
            .await
            .unwrap();
        assert_eq!(page_count(&report.bytes), 1);
        assert!(mentions(&report.bytes, "Jane Doe"));
        assert!(!mentions(&report.bytes, "Arun Rao"));
    }

    #[actix_web::test]
    async fn empty_scope_still_produces_a_pdf() {
        let store = MemoryStore::new();
        let report = generate(&store, ReportScope::Year(1999), None, june_2025())
            .await
            .unwrap();
        assert_eq!(page_count(&report.bytes), 1);
        assert!(mentions(&report.bytes, "No salary records found"));
        assert_eq!(report.filename, "1999_Report.pdf");
        assert!(report.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn records_sort_by_period_then_name() {
        let record = |username: &str, name: &str, month: Month| SalaryRecord {
            id: 0,
            faculty_username: username.into(),
            faculty_name: name.into(),
            department: None,
            designation: None,
            year: 2025,
            month,
            basic_pay: 0.0,
            allowances: 0.0,
            deductions: 0.0,
            net_pay: 0.0,
        };
        let mut records = vec![
            record("zed", "Zed", Month::February),
            record("bob", "Bob", Month::March),
            record("amy", "Amy", Month::March),
            record("amy2", "Amy", Month::February),
        ];
        report_order(&mut records);
        let order: Vec<_> = records.iter().map(|r| r.faculty_username.as_str()).collect();
        assert_eq!(order, ["amy2", "zed", "amy", "bob"]);

        let sections = sections_by_period(&records);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading.as_deref(), Some("February 2025"));
        assert_eq!(sections[1].records.len(), 2);
    }
}
