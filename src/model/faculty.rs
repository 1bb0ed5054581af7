use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Faculty {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub base_salary: f64,
}

/// Faculty as exposed over the API. Never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "name": "Jane Doe",
        "username": "jdoe",
        "department": "Physics",
        "designation": "Assistant Professor",
        "baseSalary": 52000.0
    })
)]
pub struct FacultyResponse {
    pub id: u64,
    pub name: String,
    pub username: String,
    #[schema(nullable = true)]
    pub department: Option<String>,
    #[schema(nullable = true)]
    pub designation: Option<String>,
    pub base_salary: f64,
}

impl From<Faculty> for FacultyResponse {
    fn from(f: Faculty) -> Self {
        Self {
            id: f.id,
            name: f.name,
            username: f.username,
            department: f.department,
            designation: f.designation,
            base_salary: f.base_salary,
        }
    }
}

/// A validated faculty write; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewFaculty {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub base_salary: f64,
}

/// Partial faculty edit. For the classifiers, `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct FacultyChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub department: Option<Option<String>>,
    pub designation: Option<Option<String>>,
    pub base_salary: Option<f64>,
}

impl FacultyChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.password_hash.is_none()
            && self.department.is_none()
            && self.designation.is_none()
            && self.base_salary.is_none()
    }

    pub fn apply(&self, faculty: &mut Faculty) {
        if let Some(name) = &self.name {
            faculty.name = name.clone();
        }
        if let Some(username) = &self.username {
            faculty.username = username.clone();
        }
        if let Some(hash) = &self.password_hash {
            faculty.password_hash = hash.clone();
        }
        if let Some(department) = &self.department {
            faculty.department = department.clone();
        }
        if let Some(designation) = &self.designation {
            faculty.designation = designation.clone();
        }
        if let Some(base_salary) = self.base_salary {
            faculty.base_salary = base_salary;
        }
    }
}

/// Empty free-text classifiers are stored as absent.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses a salary figure, accepting only finite non-negative numbers.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
