use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use organization_cell::models::{
    validate_department_code, validate_week, CreateComplexRequest, CreateMedicalServiceRequest,
    CreateOrganizationRequest, DaySchedule, OwnerType, MAX_SESSION_MINUTES, MIN_SESSION_MINUTES,
};
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::{
    check_email, check_phone, check_range, require_bilingual_name, require_non_empty, Validate,
    ValidationErrors,
};

// ==============================================================================
// PAYLOAD
// ==============================================================================

/// A whole organization described in one request. Entities refer to each
/// other through client-chosen keys instead of ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingRequest {
    pub organization: CreateOrganizationRequest,
    #[serde(default)]
    pub complexes: Vec<ComplexDraft>,
    #[serde(default)]
    pub departments: Vec<DepartmentDraft>,
    #[serde(default)]
    pub clinics: Vec<ClinicDraft>,
    #[serde(default)]
    pub services: Vec<ServiceDraft>,
    #[serde(default)]
    pub working_hours: Vec<WorkingHoursDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexDraft {
    pub key: String,
    #[serde(flatten)]
    pub details: CreateComplexRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentDraft {
    pub key: String,
    pub complex_key: String,
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicDraft {
    pub key: String,
    pub complex_key: Option<String>,
    pub department_key: Option<String>,
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub session_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub key: String,
    pub clinic_key: String,
    #[serde(flatten)]
    pub details: CreateMedicalServiceRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHoursDraft {
    pub owner_type: OwnerType,
    pub owner_key: String,
    pub days: Vec<DaySchedule>,
}

impl Validate for OnboardingRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = self.organization.validate() {
            errors.merge("organization", e);
        }
        for (i, complex) in self.complexes.iter().enumerate() {
            let prefix = format!("complexes[{}]", i);
            require_non_empty(&mut errors, &format!("{}.key", prefix), &complex.key);
            if let Err(e) = complex.details.validate() {
                errors.merge(&prefix, e);
            }
        }
        for (i, department) in self.departments.iter().enumerate() {
            let mut own = ValidationErrors::new();
            require_non_empty(&mut own, "key", &department.key);
            require_bilingual_name(&mut own, &department.name_ar, &department.name_en);
            validate_department_code(&mut own, &department.code);
            errors.merge(&format!("departments[{}]", i), own);
        }
        for (i, clinic) in self.clinics.iter().enumerate() {
            let mut own = ValidationErrors::new();
            require_non_empty(&mut own, "key", &clinic.key);
            require_bilingual_name(&mut own, &clinic.name_ar, &clinic.name_en);
            check_phone(&mut own, "phone", clinic.phone.as_deref());
            check_email(&mut own, "email", clinic.email.as_deref());
            if let Some(license) = &clinic.license_number {
                require_non_empty(&mut own, "license_number", license);
            }
            if let Some(minutes) = clinic.session_duration_minutes {
                check_range(&mut own, "session_duration_minutes", minutes, MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
            }
            if clinic.department_key.is_some() && clinic.complex_key.is_none() {
                own.add("department_key", "requires complex_key");
            }
            errors.merge(&format!("clinics[{}]", i), own);
        }
        for (i, service) in self.services.iter().enumerate() {
            let prefix = format!("services[{}]", i);
            require_non_empty(&mut errors, &format!("{}.key", prefix), &service.key);
            if let Err(e) = service.details.validate() {
                errors.merge(&prefix, e);
            }
        }
        for (i, hours) in self.working_hours.iter().enumerate() {
            let prefix = format!("working_hours[{}]", i);
            if hours.owner_type == OwnerType::Doctor {
                errors.add(format!("{}.owner_type", prefix), "must be complex or clinic");
            }
            if let Err(e) = validate_week(&hours.days) {
                errors.merge(&prefix, e);
            }
        }

        errors.into_result()
    }
}

// ==============================================================================
// PLAN
// ==============================================================================

/// Kinds of rows onboarding creates, in their tie-break rank.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Complex,
    Department,
    Clinic,
    Service,
    WorkingHours,
}

impl EntityKind {
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Organization => "organizations",
            EntityKind::Complex => "complexes",
            EntityKind::Department => "departments",
            EntityKind::Clinic => "clinics",
            EntityKind::Service => "clinic_services",
            EntityKind::WorkingHours => "working_hours",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Organization => "organization",
            EntityKind::Complex => "complex",
            EntityKind::Department => "department",
            EntityKind::Clinic => "clinic",
            EntityKind::Service => "service",
            EntityKind::WorkingHours => "working_hours",
        };
        f.write_str(name)
    }
}

/// One insert of the batch, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedOperation {
    pub table: String,
    pub key: String,
    pub row: Value,
}

/// Ids assigned to every keyed entity of the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedIds {
    pub organization: Uuid,
    pub complexes: BTreeMap<String, Uuid>,
    pub departments: BTreeMap<String, Uuid>,
    pub clinics: BTreeMap<String, Uuid>,
    pub services: BTreeMap<String, Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingPlan {
    pub ids: CreatedIds,
    pub operations: Vec<PlannedOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingResult {
    pub organization_id: Uuid,
    pub ids: CreatedIds,
    pub rows_created: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Key '{0}' is used more than once")]
    DuplicateKey(String),

    #[error("{entity} '{key}' refers to unknown {target} '{reference}'")]
    UnknownReference {
        entity: EntityKind,
        key: String,
        target: EntityKind,
        reference: String,
    },

    #[error("Clinic '{clinic}' uses department '{department}' from a different complex")]
    DepartmentComplexMismatch { clinic: String, department: String },

    #[error("Dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Organization slug '{0}' is already taken")]
    SlugTaken(String),

    #[error("License number '{0}' is already registered")]
    LicenseTaken(String),

    #[error("License number '{0}' appears more than once in the request")]
    DuplicateLicense(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<ValidationErrors> for OnboardingError {
    fn from(errors: ValidationErrors) -> Self {
        OnboardingError::Validation(errors)
    }
}

impl From<OnboardingError> for AppError {
    fn from(err: OnboardingError) -> Self {
        match err {
            OnboardingError::Validation(errors) => errors.into(),
            OnboardingError::DuplicateKey(_)
            | OnboardingError::UnknownReference { .. }
            | OnboardingError::DepartmentComplexMismatch { .. } => AppError::ValidationError(err.to_string()),
            OnboardingError::DependencyCycle(_) => AppError::BadRequest(err.to_string()),
            OnboardingError::SlugTaken(_)
            | OnboardingError::LicenseTaken(_)
            | OnboardingError::DuplicateLicense(_) => AppError::Conflict(err.to_string()),
            OnboardingError::Database(e) => e.into(),
        }
    }
}
