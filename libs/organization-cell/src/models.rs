// libs/organization-cell/src/models.rs
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::{
    check_bilingual_name_update, check_email, check_phone, check_range, is_valid_slug,
    require_bilingual_name, require_non_empty, Validate, ValidationErrors,
};

pub const MIN_SESSION_MINUTES: i32 = 5;
pub const MAX_SESSION_MINUTES: i32 = 240;
pub const MAX_SERVICE_MINUTES: i32 = 480;

// ==============================================================================
// STATUS ENUMS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizationStatus::Active => write!(f, "active"),
            OrganizationStatus::Inactive => write!(f, "inactive"),
            OrganizationStatus::Suspended => write!(f, "suspended"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityStatus::Active => write!(f, "active"),
            EntityStatus::Inactive => write!(f, "inactive"),
        }
    }
}

// ==============================================================================
// ORGANIZATIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name_ar: String,
    pub name_en: String,
    pub slug: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub owner_id: Option<Uuid>,
    pub status: OrganizationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    pub slug: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Validate for CreateOrganizationRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_bilingual_name(&mut errors, &self.name_ar, &self.name_en);
        if !is_valid_slug(&self.slug) {
            errors.add("slug", "must be lowercase letters, digits and single dashes");
        }
        check_email(&mut errors, "email", self.email.as_deref());
        check_phone(&mut errors, "phone", self.phone.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Validate for UpdateOrganizationRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, self.name_ar.as_deref(), self.name_en.as_deref());
        check_email(&mut errors, "email", self.email.as_deref());
        check_phone(&mut errors, "phone", self.phone.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationStatusRequest {
    pub status: OrganizationStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationListQuery {
    pub status: Option<OrganizationStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ==============================================================================
// COMPLEXES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complex {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name_ar: String,
    pub name_en: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComplexRequest {
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

impl Validate for CreateComplexRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_bilingual_name(&mut errors, &self.name_ar, &self.name_en);
        check_phone(&mut errors, "phone", self.phone.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateComplexRequest {
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub status: Option<EntityStatus>,
}

impl Validate for UpdateComplexRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, self.name_ar.as_deref(), self.name_en.as_deref());
        check_phone(&mut errors, "phone", self.phone.as_deref());
        errors.into_result()
    }
}

// ==============================================================================
// DEPARTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub complex_id: Uuid,
    pub name_ar: String,
    pub name_en: String,
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartmentRequest {
    pub complex_id: Uuid,
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    pub code: String,
    pub description: Option<String>,
}

impl Validate for CreateDepartmentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_bilingual_name(&mut errors, &self.name_ar, &self.name_en);
        validate_department_code(&mut errors, &self.code);
        errors.into_result()
    }
}

pub fn validate_department_code(errors: &mut ValidationErrors, code: &str) {
    require_non_empty(errors, "code", code);
    if code.len() > 20 || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        errors.add("code", "must be at most 20 ASCII letters, digits, '-' or '_'");
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDepartmentRequest {
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub description: Option<String>,
}

impl Validate for UpdateDepartmentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, self.name_ar.as_deref(), self.name_en.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentListQuery {
    pub complex_id: Option<Uuid>,
}

// ==============================================================================
// CLINICS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub complex_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub name_ar: String,
    pub name_en: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub session_duration_minutes: i32,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Clinic {
    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    pub complex_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub session_duration_minutes: Option<i32>,
}

impl Validate for CreateClinicRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_bilingual_name(&mut errors, &self.name_ar, &self.name_en);
        check_phone(&mut errors, "phone", self.phone.as_deref());
        check_email(&mut errors, "email", self.email.as_deref());
        if let Some(license) = &self.license_number {
            require_non_empty(&mut errors, "license_number", license);
        }
        if let Some(minutes) = self.session_duration_minutes {
            check_range(&mut errors, "session_duration_minutes", minutes, MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
        }
        if self.department_id.is_some() && self.complex_id.is_none() {
            errors.add("department_id", "requires complex_id");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClinicRequest {
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub session_duration_minutes: Option<i32>,
}

impl Validate for UpdateClinicRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, self.name_ar.as_deref(), self.name_en.as_deref());
        check_phone(&mut errors, "phone", self.phone.as_deref());
        check_email(&mut errors, "email", self.email.as_deref());
        if let Some(minutes) = self.session_duration_minutes {
            check_range(&mut errors, "session_duration_minutes", minutes, MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinicListQuery {
    pub complex_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub status: Option<EntityStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ==============================================================================
// MEDICAL SERVICES OFFERED BY A CLINIC
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalService {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub clinic_id: Uuid,
    pub name_ar: String,
    pub name_en: String,
    pub price: f64,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicalServiceRequest {
    #[serde(default)]
    pub name_ar: String,
    #[serde(default)]
    pub name_en: String,
    pub price: f64,
    pub duration_minutes: i32,
}

impl Validate for CreateMedicalServiceRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_bilingual_name(&mut errors, &self.name_ar, &self.name_en);
        if !self.price.is_finite() || self.price < 0.0 {
            errors.add("price", "must be zero or positive");
        }
        check_range(&mut errors, "duration_minutes", self.duration_minutes, MIN_SESSION_MINUTES, MAX_SERVICE_MINUTES);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicalServiceRequest {
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateMedicalServiceRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, self.name_ar.as_deref(), self.name_en.as_deref());
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                errors.add("price", "must be zero or positive");
            }
        }
        if let Some(minutes) = self.duration_minutes {
            check_range(&mut errors, "duration_minutes", minutes, MIN_SESSION_MINUTES, MAX_SERVICE_MINUTES);
        }
        errors.into_result()
    }
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub clinic_id: Uuid,
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub session_duration_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub clinic_id: Uuid,
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub session_duration_minutes: Option<i32>,
}

impl Validate for CreateDoctorRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "first_name", &self.first_name);
        require_non_empty(&mut errors, "last_name", &self.last_name);
        require_non_empty(&mut errors, "specialty", &self.specialty);
        if let Some(minutes) = self.session_duration_minutes {
            check_range(&mut errors, "session_duration_minutes", minutes, MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
    pub session_duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateDoctorRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name), ("specialty", &self.specialty)] {
            if let Some(value) = value {
                require_non_empty(&mut errors, field, value);
            }
        }
        if let Some(minutes) = self.session_duration_minutes {
            check_range(&mut errors, "session_duration_minutes", minutes, MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorListQuery {
    pub clinic_id: Option<Uuid>,
    pub specialty: Option<String>,
    pub active_only: Option<bool>,
}

// ==============================================================================
// WORKING HOURS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    Complex,
    Clinic,
    Doctor,
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerType::Complex => write!(f, "complex"),
            OwnerType::Clinic => write!(f, "clinic"),
            OwnerType::Doctor => write!(f, "doctor"),
        }
    }
}

/// One weekday of a schedule. `day_of_week` is 0 (Sunday) to 6 (Saturday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day_of_week: i32,
    pub is_working: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
}

impl DaySchedule {
    pub fn working(day_of_week: i32, open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            day_of_week,
            is_working: true,
            open_time: Some(open),
            close_time: Some(close),
            break_start: None,
            break_end: None,
        }
    }

    pub fn closed(day_of_week: i32) -> Self {
        Self {
            day_of_week,
            is_working: false,
            open_time: None,
            close_time: None,
            break_start: None,
            break_end: None,
        }
    }

    pub fn with_break(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.break_start = Some(start);
        self.break_end = Some(end);
        self
    }

    /// `[open, close)` when the day is a working day.
    pub fn working_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.is_working, self.open_time, self.close_time) {
            (true, Some(open), Some(close)) if open < close => Some((open, close)),
            _ => None,
        }
    }

    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.break_start, self.break_end) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }

    pub fn collect_errors(&self, errors: &mut ValidationErrors, prefix: &str) {
        let field = |name: &str| format!("{}.{}", prefix, name);

        if !(0..=6).contains(&self.day_of_week) {
            errors.add(field("day_of_week"), "must be between 0 (Sunday) and 6 (Saturday)");
        }

        if !self.is_working {
            return;
        }

        let (open, close) = match (self.open_time, self.close_time) {
            (Some(open), Some(close)) => (open, close),
            _ => {
                errors.add(field("open_time"), "open_time and close_time are required on working days");
                return;
            }
        };

        if open >= close {
            errors.add(field("close_time"), "must be after open_time");
        }

        match (self.break_start, self.break_end) {
            (None, None) => {}
            (Some(start), Some(end)) => {
                if start >= end {
                    errors.add(field("break_end"), "must be after break_start");
                } else if start < open || end > close {
                    errors.add(field("break_start"), "break must lie within working hours");
                }
            }
            _ => errors.add(field("break_start"), "break_start and break_end must be given together"),
        }
    }

    /// True when `other`'s working window lies inside this day's window.
    pub fn contains(&self, other: &DaySchedule) -> bool {
        match (self.working_window(), other.working_window()) {
            (_, None) => true,
            (Some((open, close)), Some((inner_open, inner_close))) => open <= inner_open && inner_close <= close,
            (None, Some(_)) => false,
        }
    }
}

/// Validate a weekly set: every day valid and no weekday listed twice.
pub fn validate_week(days: &[DaySchedule]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut seen = HashMap::new();

    for (index, day) in days.iter().enumerate() {
        let prefix = format!("days[{}]", index);
        day.collect_errors(&mut errors, &prefix);
        if let Some(first) = seen.insert(day.day_of_week, index) {
            errors.add(
                format!("{}.day_of_week", prefix),
                format!("duplicates days[{}]", first),
            );
        }
    }

    errors.into_result()
}

/// A child schedule (clinic) must fit inside its parent (complex) on every
/// day the parent defines. Parents with no hours impose nothing.
pub fn check_within_parent(child: &[DaySchedule], parent: &[DaySchedule]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if parent.is_empty() {
        return Ok(());
    }

    for (index, day) in child.iter().enumerate() {
        if day.working_window().is_none() {
            continue;
        }
        match parent.iter().find(|p| p.day_of_week == day.day_of_week) {
            Some(parent_day) if parent_day.contains(day) => {}
            Some(_) => errors.add(
                format!("days[{}]", index),
                "working hours fall outside the parent complex hours",
            ),
            None => {}
        }
    }

    errors.into_result()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_type: OwnerType,
    pub owner_id: Uuid,
    #[serde(flatten)]
    pub schedule: DaySchedule,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetWorkingHoursRequest {
    pub days: Vec<DaySchedule>,
}

impl Validate for SetWorkingHoursRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_week(&self.days)
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrganizationError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<ValidationErrors> for OrganizationError {
    fn from(errors: ValidationErrors) -> Self {
        OrganizationError::Validation(errors)
    }
}

impl From<OrganizationError> for AppError {
    fn from(err: OrganizationError) -> Self {
        match err {
            OrganizationError::NotFound(entity) => AppError::NotFound(format!("{} not found", entity)),
            OrganizationError::Conflict(msg) => AppError::Conflict(msg),
            OrganizationError::Validation(errors) => errors.into(),
            OrganizationError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn break_outside_hours_is_rejected() {
        let day = DaySchedule::working(1, t(9, 0), t(17, 0)).with_break(t(8, 0), t(9, 30));
        let err = validate_week(&[day]).unwrap_err();
        assert!(err.has_field("days[0].break_start"));
    }

    #[test]
    fn half_break_is_rejected() {
        let mut day = DaySchedule::working(1, t(9, 0), t(17, 0));
        day.break_start = Some(t(12, 0));
        let err = validate_week(&[day]).unwrap_err();
        assert!(err.has_field("days[0].break_start"));
    }

    #[test]
    fn duplicate_weekday_is_rejected() {
        let days = vec![
            DaySchedule::working(2, t(9, 0), t(13, 0)),
            DaySchedule::working(2, t(14, 0), t(18, 0)),
        ];
        let err = validate_week(&days).unwrap_err();
        assert!(err.has_field("days[1].day_of_week"));
    }

    #[test]
    fn closed_days_need_no_times() {
        assert!(validate_week(&[DaySchedule::closed(5), DaySchedule::closed(6)]).is_ok());
    }

    #[test]
    fn clinic_must_fit_inside_complex() {
        let complex = vec![DaySchedule::working(0, t(8, 0), t(16, 0)), DaySchedule::closed(5)];
        let inside = vec![DaySchedule::working(0, t(9, 0), t(15, 0))];
        let outside = vec![DaySchedule::working(0, t(7, 0), t(15, 0))];
        let closed_day = vec![DaySchedule::working(5, t(9, 0), t(12, 0))];

        assert!(check_within_parent(&inside, &complex).is_ok());
        assert!(check_within_parent(&outside, &complex).is_err());
        assert!(check_within_parent(&closed_day, &complex).is_err());
        assert!(check_within_parent(&outside, &[]).is_ok());
    }

    #[test]
    fn updates_cannot_blank_both_names() {
        let complex = UpdateComplexRequest {
            name_ar: Some(String::new()),
            name_en: Some("  ".into()),
            ..Default::default()
        };
        assert!(complex.validate().unwrap_err().has_field("name"));

        let service = UpdateMedicalServiceRequest {
            name_ar: Some(String::new()),
            name_en: Some("  ".into()),
            ..Default::default()
        };
        assert!(service.validate().unwrap_err().has_field("name"));

        let department = UpdateDepartmentRequest {
            name_en: Some(" ".into()),
            ..Default::default()
        };
        assert!(department.validate().unwrap_err().has_field("name"));

        let organization = UpdateOrganizationRequest {
            name_ar: Some(String::new()),
            ..Default::default()
        };
        assert!(organization.validate().is_err());

        let clinic = UpdateClinicRequest {
            name_ar: Some(String::new()),
            name_en: Some("Dental".into()),
            ..Default::default()
        };
        assert!(clinic.validate().is_ok());
    }

    #[test]
    fn doctor_update_rejects_blank_names() {
        let request = UpdateDoctorRequest {
            first_name: Some(" ".into()),
            last_name: Some("Saleh".into()),
            ..Default::default()
        };
        let err = request.validate().unwrap_err();
        assert!(err.has_field("first_name"));
        assert!(!err.has_field("last_name"));
    }

    #[test]
    fn clinic_request_needs_complex_for_department() {
        let request = CreateClinicRequest {
            complex_id: None,
            department_id: Some(Uuid::new_v4()),
            name_ar: String::new(),
            name_en: "Dental".into(),
            license_number: None,
            phone: None,
            email: None,
            session_duration_minutes: Some(2),
        };
        let err = request.validate().unwrap_err();
        assert!(err.has_field("department_id"));
        assert!(err.has_field("session_duration_minutes"));
    }
}
