use actix_multipart::form::{MultipartForm, bytes::Bytes, text::Text};
use actix_web::{
    HttpResponse,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::aggregate::sort_latest_first;
use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::ingest::ingest_salary_csv;
use crate::model::period::{Month, Period};
use crate::report::{self, ReportScope, RollingWindow};
use crate::store::RecordStore;

#[derive(MultipartForm)]
pub struct SalaryUpload {
    pub file: Bytes,
    pub month: Text<String>,
    pub year: Text<i32>,
}

/// Multipart body of `POST /salary/upload-monthly`, for the API docs.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct SalaryUploadForm {
    /// CSV with a `username` column and optional `basicPay`, `allowances`, `deductions`.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    #[schema(example = "March")]
    pub month: String,
    #[schema(example = 2025)]
    pub year: i32,
}

#[derive(Serialize, ToSchema)]
pub struct DeletePeriodResponse {
    #[schema(example = "Deleted 42 salary record(s) for March 2025")]
    pub message: String,
    #[schema(example = 42)]
    pub deleted: u64,
}

fn parse_year(year: i32) -> Result<i32, AppError> {
    if (1000..=9999).contains(&year) {
        Ok(year)
    } else {
        Err(AppError::Validation(format!(
            "year must be a four-digit number, got {year}"
        )))
    }
}

fn parse_period(year: i32, month: &str) -> Result<Period, AppError> {
    let year = parse_year(year)?;
    let month: Month = month
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("'{month}' is not a month name")))?;
    Ok(Period::new(year, month))
}

async fn report_response(
    store: &dyn RecordStore,
    auth: &AuthUser,
    scope: ReportScope,
) -> Result<HttpResponse, AppError> {
    let faculty = auth.salary_scope();
    let today = Utc::now().date_naive();
    let report = report::generate(store, scope, faculty.as_deref(), today).await?;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(report.filename)],
        })
        .body(report.bytes))
}

/// Upload one month of salaries
///
/// Re-uploading a period replaces each listed faculty member's record.
#[utoipa::path(
    post,
    path = "/api/salary/upload-monthly",
    request_body(content = SalaryUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-row outcome of the upload", body = SalaryUploadSummary),
        (status = 400, description = "Missing file, bad month/year or no username column"),
        (status = 403, description = "Admin only")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
#[instrument(name = "salary_upload", skip_all)]
pub async fn upload_monthly(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    MultipartForm(form): MultipartForm<SalaryUpload>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let period = parse_period(form.year.0, &form.month)?;

    if let Some(file_name) = form.file.file_name.as_deref() {
        let expected = period.upload_filename();
        if file_name != expected {
            warn!(file_name, expected = %expected, "Upload filename does not match period");
        }
    }

    let summary = ingest_salary_csv(store.get_ref(), period, &form.file.data).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Salary upload history
///
/// One entry per period with records, newest first. Faculty users only see
/// their own records counted.
#[utoipa::path(
    get,
    path = "/api/salary/history",
    responses(
        (status = 200, description = "Record counts per period", body = [PeriodCount]),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn history(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    let mut counts = store
        .salary_period_counts(auth.salary_scope().as_deref())
        .await?;
    sort_latest_first(&mut counts);
    Ok(HttpResponse::Ok().json(counts))
}

/// Delete every salary record of one period
#[utoipa::path(
    delete,
    path = "/api/salary/history/{year}/{month}",
    params(
        ("year" = i32, Path, description = "Four-digit year", example = 2025),
        ("month" = String, Path, description = "Month name", example = "March")
    ),
    responses(
        (status = 200, description = "Period removed", body = DeletePeriodResponse),
        (status = 400, description = "Bad year or month"),
        (status = 403, description = "Admin only")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
#[instrument(name = "salary_delete_period", skip(auth, store))]
pub async fn delete_period(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    path: web::Path<(i32, String)>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let (year, month) = path.into_inner();
    let period = parse_period(year, &month)?;

    let deleted = store.delete_salary_period(period.year, period.month).await?;
    info!(deleted, "Salary period deleted");

    Ok(HttpResponse::Ok().json(DeletePeriodResponse {
        message: format!("Deleted {deleted} salary record(s) for {period}"),
        deleted,
    }))
}

/// Annual salary report (PDF)
#[utoipa::path(
    get,
    path = "/api/salary/download/{year}",
    params(("year" = i32, Path, description = "Four-digit year", example = 2025)),
    responses(
        (status = 200, description = "PDF with one section per month", content_type = "application/pdf"),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn download_year(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let year = parse_year(path.into_inner())?;
    report_response(store.get_ref(), &auth, ReportScope::Year(year)).await
}

/// Monthly salary report (PDF)
#[utoipa::path(
    get,
    path = "/api/salary/download/{year}/{month}",
    params(
        ("year" = i32, Path, description = "Four-digit year", example = 2025),
        ("month" = String, Path, description = "Month name", example = "March")
    ),
    responses(
        (status = 200, description = "PDF with one payslip per record", content_type = "application/pdf"),
        (status = 400, description = "Bad year or month"),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn download_month(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    path: web::Path<(i32, String)>,
) -> Result<HttpResponse, AppError> {
    let (year, month) = path.into_inner();
    let period = parse_period(year, &month)?;
    report_response(store.get_ref(), &auth, ReportScope::Month(period)).await
}

/// Rolling N-month bulk payslips (PDF)
#[utoipa::path(
    get,
    path = "/api/salary/report/{months}",
    params(("months" = u32, Path, description = "Window length: 3, 6, 9 or 12", example = 3)),
    responses(
        (status = 200, description = "PDF with one payslip per record in the window", content_type = "application/pdf"),
        (status = 400, description = "Unsupported window length"),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn rolling_report(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    path: web::Path<u32>,
) -> Result<HttpResponse, AppError> {
    let window = RollingWindow::new(path.into_inner())?;
    report_response(store.get_ref(), &auth, ReportScope::Rolling(window)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{TestPortal, bearer, from_peer, multipart};
    use crate::model::salary::NewSalaryRecord;
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    async fn seed_salary(portal: &TestPortal, username: &str, period: Period) {
        portal
            .store
            .upsert_salary(&NewSalaryRecord {
                faculty_username: username.into(),
                faculty_name: username.to_uppercase(),
                department: None,
                designation: None,
                period,
                basic_pay: 1000.0,
                allowances: 0.0,
                deductions: 0.0,
            })
            .await
            .unwrap();
    }

    fn current_period() -> Period {
        Period::containing(Utc::now().date_naive())
    }

    fn upload_request(token: &str, file_name: &str, csv: &str, month: &str, year: &str) -> test::TestRequest {
        let (content_type, body) = multipart(file_name, csv, &[("month", month), ("year", year)]);
        bearer(test::TestRequest::post().uri("/api/salary/upload-monthly"), token)
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
    }

    #[::core::prelude::v1::test]
    fn period_parsing_validates_year_and_month() {
        assert_eq!(
            parse_period(2025, "march").unwrap(),
            Period::new(2025, Month::March)
        );
        assert!(parse_period(25, "March").is_err());
        assert!(parse_period(2025, "Smarch").is_err());
    }

    #[actix_web::test]
    async fn monthly_upload_creates_records_for_known_faculty() {
        let portal = TestPortal::new();
        portal.seed_faculty("jdoe", "Jane Doe", "pw").await;
        let app = test::init_service(portal.app()).await;

        let csv = "username,basicPay,allowances,deductions\njdoe,50000,1000,200\nghost,1,1,1\n";
        let req = upload_request(&portal.admin_token(), "March2025.csv", csv, "March", "2025");
        let summary: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        assert_eq!(summary["created"], 1);
        assert_eq!(summary["failed"], 1);

        let req = bearer(test::TestRequest::get().uri("/api/salary/history"), &portal.admin_token());
        let history: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        assert_eq!(history[0]["year"], 2025);
        assert_eq!(history[0]["month"], "March");
        assert_eq!(history[0]["count"], 1);
    }

    #[actix_web::test]
    async fn mismatched_filename_is_accepted() {
        let portal = TestPortal::new();
        portal.seed_faculty("jdoe", "Jane Doe", "pw").await;
        let app = test::init_service(portal.app()).await;

        let req = upload_request(&portal.admin_token(), "salaries.csv", "username\njdoe\n", "april", "2025");
        let summary: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        assert_eq!(summary["created"], 1);
    }

    #[actix_web::test]
    async fn invalid_month_or_year_rejects_upload() {
        let portal = TestPortal::new();
        let app = test::init_service(portal.app()).await;
        for (month, year) in [("Marchuary", "2025"), ("March", "99")] {
            let req = upload_request(&portal.admin_token(), "x.csv", "username\n", month, year);
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{month} {year}");
        }
    }

    #[actix_web::test]
    async fn deleting_a_period_leaves_others_intact() {
        let portal = TestPortal::new();
        seed_salary(&portal, "jdoe", Period::new(2025, Month::March)).await;
        seed_salary(&portal, "arun", Period::new(2025, Month::March)).await;
        seed_salary(&portal, "jdoe", Period::new(2025, Month::April)).await;
        let app = test::init_service(portal.app()).await;

        let req = bearer(
            test::TestRequest::delete().uri("/api/salary/history/2025/March"),
            &portal.admin_token(),
        );
        let body: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        assert_eq!(body["deleted"], 2);

        let req = bearer(test::TestRequest::get().uri("/api/salary/history"), &portal.admin_token());
        let history: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["month"], "April");
        assert_eq!(history[0]["count"], 1);
    }

    #[actix_web::test]
    async fn faculty_history_counts_only_own_records() {
        let portal = TestPortal::new();
        seed_salary(&portal, "jdoe", Period::new(2025, Month::March)).await;
        seed_salary(&portal, "arun", Period::new(2025, Month::March)).await;
        seed_salary(&portal, "arun", Period::new(2025, Month::April)).await;
        let app = test::init_service(portal.app()).await;

        let req = bearer(test::TestRequest::get().uri("/api/salary/history"), &portal.faculty_token("jdoe"));
        let history: Value = test::call_and_read_body_json(&app, req.to_request()).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["count"], 1);
    }

    #[actix_web::test]
    async fn faculty_cannot_upload_or_delete() {
        let portal = TestPortal::new();
        seed_salary(&portal, "jdoe", Period::new(2025, Month::March)).await;
        let app = test::init_service(portal.app()).await;
        let token = portal.faculty_token("jdoe");

        let req = upload_request(&token, "March2025.csv", "username\njdoe\n", "March", "2025");
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::FORBIDDEN);

        let req = bearer(test::TestRequest::delete().uri("/api/salary/history/2025/March"), &token);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::FORBIDDEN);
        assert_eq!(portal.store.salary_period_counts(None).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn unauthenticated_report_gets_401_and_no_pdf() {
        let portal = TestPortal::new();
        seed_salary(&portal, "jdoe", current_period()).await;
        let app = test::init_service(portal.app()).await;

        for uri in ["/api/salary/report/3", "/api/salary/download/2025", "/api/salary/download/2025/March"] {
            let req = from_peer(test::TestRequest::get().uri(uri)).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
            let body = test::read_body(resp).await;
            assert!(!body.starts_with(b"%PDF"), "{uri}");
        }

        let req = bearer(test::TestRequest::get().uri("/api/salary/report/3"), "not-a-token");
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn rolling_report_is_a_named_pdf_attachment() {
        let portal = TestPortal::new();
        seed_salary(&portal, "jdoe", current_period()).await;
        let app = test::init_service(portal.app()).await;

        let req = bearer(test::TestRequest::get().uri("/api/salary/report/3"), &portal.admin_token());
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "application/pdf");
        let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap();
        assert!(disposition.contains("attachment"));
        assert!(disposition.contains("Admin_Bulk_Payslips_Last_3_Months.pdf"));
        assert!(test::read_body(resp).await.starts_with(b"%PDF"));

        let req = bearer(test::TestRequest::get().uri("/api/salary/report/3"), &portal.faculty_token("jdoe"));
        let resp = test::call_service(&app, req.to_request()).await;
        let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap();
        assert!(disposition.contains("jdoe_Payslips_Last_3_Months.pdf"));
    }

    #[actix_web::test]
    async fn unsupported_window_is_a_bad_request() {
        let portal = TestPortal::new();
        let app = test::init_service(portal.app()).await;
        let req = bearer(test::TestRequest::get().uri("/api/salary/report/4"), &portal.admin_token());
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn empty_period_downloads_still_succeed() {
        let portal = TestPortal::new();
        let app = test::init_service(portal.app()).await;
        for (uri, filename) in [
            ("/api/salary/download/2031", "2031_Report.pdf"),
            ("/api/salary/download/2031/july", "2031_July_Report.pdf"),
        ] {
            let req = bearer(test::TestRequest::get().uri(uri), &portal.admin_token());
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap();
            assert!(disposition.contains(filename), "{disposition}");
        }
    }
}
