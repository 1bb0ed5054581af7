use actix_multipart::form::{MultipartForm, bytes::Bytes};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::{auth::AuthUser, password::hash_password_blocking};
use crate::error::AppError;
use crate::ingest::{faculty::validate_faculty, ingest_faculty_csv};
use crate::model::faculty::{FacultyChanges, FacultyResponse, NewFaculty, non_empty};
use crate::store::RecordStore;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFaculty {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret")]
    pub password: String,
    #[serde(default)]
    #[schema(example = "Physics")]
    pub department: Option<String>,
    #[serde(default)]
    #[schema(example = "Assistant Professor")]
    pub designation: Option<String>,
    #[schema(example = 52000.0)]
    pub base_salary: f64,
}

/// Partial edit; absent fields are left unchanged.
#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFaculty {
    pub name: Option<String>,
    pub username: Option<String>,
    /// Re-hashed before it is stored.
    pub password: Option<String>,
    /// An empty string clears the department.
    pub department: Option<String>,
    /// An empty string clears the designation.
    pub designation: Option<String>,
    pub base_salary: Option<f64>,
}

impl UpdateFaculty {
    fn validate(&self) -> Result<(), AppError> {
        for (label, value) in [
            ("name", &self.name),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(AppError::Validation(format!("{label} cannot be empty")));
            }
        }
        if self
            .base_salary
            .is_some_and(|v| !v.is_finite() || v < 0.0)
        {
            return Err(AppError::Validation(
                "baseSalary must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[derive(MultipartForm)]
pub struct FacultyUpload {
    pub file: Bytes,
}

/// Multipart body of `POST /faculty/upload`, for the API docs.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct FacultyUploadForm {
    /// CSV with header `name,username,password,department,designation,baseSalary`.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

async fn hash(password: String) -> Result<String, AppError> {
    hash_password_blocking(password).await.map_err(|e| {
        warn!(error = %e, "Password hashing failed");
        AppError::Internal(e)
    })
}

/// List faculty
#[utoipa::path(
    get,
    path = "/api/faculty",
    responses(
        (status = 200, description = "All faculty, ordered by name", body = [FacultyResponse]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Admin only")
    ),
    tag = "Faculty",
    security(("bearer_auth" = []))
)]
pub async fn list_faculty(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let faculty: Vec<FacultyResponse> = store
        .list_faculty()
        .await?
        .into_iter()
        .map(FacultyResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(faculty))
}

/// Get one faculty member
#[utoipa::path(
    get,
    path = "/api/faculty/{id}",
    params(("id" = u64, Path, description = "Faculty id")),
    responses(
        (status = 200, description = "Faculty found", body = FacultyResponse),
        (status = 404, description = "No faculty with this id")
    ),
    tag = "Faculty",
    security(("bearer_auth" = []))
)]
pub async fn get_faculty(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    match store.get_faculty(id).await? {
        Some(faculty) => Ok(HttpResponse::Ok().json(FacultyResponse::from(faculty))),
        None => Err(AppError::NotFound(format!("Faculty {id} not found"))),
    }
}

/// Add a faculty member
#[utoipa::path(
    post,
    path = "/api/faculty",
    request_body = CreateFaculty,
    responses(
        (status = 201, description = "Faculty created", body = FacultyResponse),
        (status = 400, description = "Missing field or invalid salary"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Faculty",
    security(("bearer_auth" = []))
)]
#[instrument(name = "faculty_create", skip_all, fields(username = %payload.username))]
pub async fn create_faculty(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    payload: web::Json<CreateFaculty>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let payload = payload.into_inner();

    let row = validate_faculty(
        &payload.name,
        &payload.username,
        &payload.password,
        payload.department.as_deref().unwrap_or_default(),
        payload.designation.as_deref().unwrap_or_default(),
        &payload.base_salary.to_string(),
    )
    .map_err(AppError::Validation)?;

    let faculty = NewFaculty {
        password_hash: hash(row.password).await?,
        name: row.name,
        username: row.username,
        department: row.department,
        designation: row.designation,
        base_salary: row.base_salary,
    };
    let id = store.insert_faculty(&faculty).await?;

    info!(id, "Faculty created");

    Ok(HttpResponse::Created().json(FacultyResponse {
        id,
        name: faculty.name,
        username: faculty.username,
        department: faculty.department,
        designation: faculty.designation,
        base_salary: faculty.base_salary,
    }))
}

/// Edit a faculty member
#[utoipa::path(
    put,
    path = "/api/faculty/{id}",
    params(("id" = u64, Path, description = "Faculty id")),
    request_body = UpdateFaculty,
    responses(
        (status = 200, description = "Faculty updated", body = FacultyResponse),
        (status = 400, description = "Empty field or nothing to update"),
        (status = 404, description = "No faculty with this id"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Faculty",
    security(("bearer_auth" = []))
)]
#[instrument(name = "faculty_update", skip(auth, store, payload))]
pub async fn update_faculty(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    path: web::Path<u64>,
    payload: web::Json<UpdateFaculty>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    let payload = payload.into_inner();
    payload.validate()?;

    let password_hash = match payload.password {
        Some(password) => Some(hash(password).await?),
        None => None,
    };
    let changes = FacultyChanges {
        name: payload.name.as_deref().and_then(non_empty),
        username: payload.username.as_deref().and_then(non_empty),
        password_hash,
        department: payload.department.as_deref().map(non_empty),
        designation: payload.designation.as_deref().map(non_empty),
        base_salary: payload.base_salary,
    };
    if changes.is_empty() {
        return Err(AppError::Validation("No fields to update".into()));
    }

    if !store.update_faculty(id, &changes).await? {
        return Err(AppError::NotFound(format!("Faculty {id} not found")));
    }
    let faculty = store
        .get_faculty(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Faculty {id} not found")))?;

    info!("Faculty updated");
    Ok(HttpResponse::Ok().json(FacultyResponse::from(faculty)))
}

/// Delete a faculty member
///
/// Their salary records are kept.
#[utoipa::path(
    delete,
    path = "/api/faculty/{id}",
    params(("id" = u64, Path, description = "Faculty id")),
    responses(
        (status = 200, description = "Faculty deleted", body = Object, example = json!({
            "message": "Faculty deleted"
        })),
        (status = 404, description = "No faculty with this id")
    ),
    tag = "Faculty",
    security(("bearer_auth" = []))
)]
#[instrument(name = "faculty_delete", skip(auth, store))]
pub async fn delete_faculty(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    if !store.delete_faculty(id).await? {
        return Err(AppError::NotFound(format!("Faculty {id} not found")));
    }
    info!("Faculty deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Faculty deleted" })))
}

/// Bulk faculty upload
#[utoipa::path(
    post,
    path = "/api/faculty/upload",
    request_body(content = FacultyUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-row outcome of the upload", body = FacultyUploadSummary),
        (status = 400, description = "Missing file or wrong CSV header")
    ),
    tag = "Faculty",
    security(("bearer_auth" = []))
)]
#[instrument(name = "faculty_upload", skip_all)]
pub async fn upload_faculty(
    auth: AuthUser,
    store: web::Data<dyn RecordStore>,
    MultipartForm(form): MultipartForm<FacultyUpload>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let summary = ingest_faculty_csv(store.get_ref(), &form.file.data).await?;
    Ok(HttpResponse::Ok().json(summary))
}
