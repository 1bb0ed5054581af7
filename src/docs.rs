use crate::api::ClientConfig;
use crate::api::faculty::{CreateFaculty, FacultyUploadForm, UpdateFaculty};
use crate::api::salary::{DeletePeriodResponse, SalaryUploadForm};
use crate::ingest::{FacultyUploadSummary, SalaryUploadSummary};
use crate::model::faculty::FacultyResponse;
use crate::model::period::{Month, Period};
use crate::model::role::Role;
use crate::model::salary::PeriodCount;
use crate::models::{LoginReqDto, LoginResponse, LoginUser};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "College Portal API",
        version = "1.0.0",
        description = r#"
## College Administration Portal

Backend for the college admin and faculty dashboards.

### 🔹 Key Features
- **Faculty Management**
  - Add, edit, list and delete faculty, or bulk-load them from CSV
- **Monthly Salaries**
  - Upload one CSV per month; re-uploading a month replaces its records
  - Per-month history with record counts, and per-month deletion
- **Payslip Reports**
  - Monthly, annual and rolling 3/6/9/12-month PDF downloads

### 🔐 Security
Every `/api` endpoint except login requires a **JWT Bearer** token from
`/auth/login` (also served as `/api/auth/login`).
Admins can use every operation; faculty users see only their own history and payslips.

### 📦 CSV Uploads
- Each row is validated on its own; bad rows are reported as `Line N: reason`
  and never abort the rest of the file.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::api::client_config,

        crate::api::faculty::list_faculty,
        crate::api::faculty::get_faculty,
        crate::api::faculty::create_faculty,
        crate::api::faculty::update_faculty,
        crate::api::faculty::delete_faculty,
        crate::api::faculty::upload_faculty,

        crate::api::salary::upload_monthly,
        crate::api::salary::history,
        crate::api::salary::delete_period,

        crate::api::salary::download_year,
        crate::api::salary::download_month,
        crate::api::salary::rolling_report
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            LoginUser,
            Role,
            ClientConfig,
            CreateFaculty,
            UpdateFaculty,
            FacultyResponse,
            FacultyUploadForm,
            FacultyUploadSummary,
            SalaryUploadForm,
            SalaryUploadSummary,
            PeriodCount,
            Month,
            Period,
            DeletePeriodResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Role-gated login"),
        (name = "Portal", description = "Public dashboard configuration"),
        (name = "Faculty", description = "Faculty management APIs"),
        (name = "Salary", description = "Monthly salary uploads and history"),
        (name = "Reports", description = "PDF payslip downloads"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
