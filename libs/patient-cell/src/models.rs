use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::{check_email, check_phone, require_non_empty, Validate, ValidationErrors};

const BLOOD_TYPES: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub national_id: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, date: NaiveDate) -> u32 {
        date.years_since(self.date_of_birth).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub national_id: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl Validate for CreatePatientRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "first_name", &self.first_name);
        require_non_empty(&mut errors, "last_name", &self.last_name);
        require_non_empty(&mut errors, "phone", &self.phone);
        check_phone(&mut errors, "phone", Some(self.phone.as_str()).filter(|p| !p.trim().is_empty()));
        check_email(&mut errors, "email", self.email.as_deref());
        check_phone(&mut errors, "emergency_contact_phone", self.emergency_contact_phone.as_deref());
        check_national_id(&mut errors, self.national_id.as_deref());
        check_blood_type(&mut errors, self.blood_type.as_deref());
        if self.date_of_birth > Utc::now().date_naive() {
            errors.add("date_of_birth", "must not be in the future");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for UpdatePatientRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(first_name) = &self.first_name {
            require_non_empty(&mut errors, "first_name", first_name);
        }
        if let Some(last_name) = &self.last_name {
            require_non_empty(&mut errors, "last_name", last_name);
        }
        check_phone(&mut errors, "phone", self.phone.as_deref());
        check_email(&mut errors, "email", self.email.as_deref());
        check_phone(&mut errors, "emergency_contact_phone", self.emergency_contact_phone.as_deref());
        check_national_id(&mut errors, self.national_id.as_deref());
        check_blood_type(&mut errors, self.blood_type.as_deref());
        if let Some(dob) = self.date_of_birth {
            if dob > Utc::now().date_naive() {
                errors.add("date_of_birth", "must not be in the future");
            }
        }
        errors.into_result()
    }
}

fn check_national_id(errors: &mut ValidationErrors, value: Option<&str>) {
    if let Some(id) = value {
        let id = id.trim();
        if id.len() < 5 || id.len() > 20 || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.add("national_id", "must be 5 to 20 letters or digits");
        }
    }
}

fn check_blood_type(errors: &mut ValidationErrors, value: Option<&str>) {
    if let Some(blood_type) = value {
        if !BLOOD_TYPES.contains(&blood_type.trim().to_uppercase().as_str()) {
            errors.add("blood_type", "must be one of A+, A-, B+, B-, AB+, AB-, O+, O-");
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientSearchQuery {
    /// Matched against first/last name, phone, national id and email.
    pub q: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub diagnosis: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientHistory {
    pub patient: Patient,
    pub appointments: Vec<AppointmentSummary>,
    pub medical_reports: Vec<ReportSummary>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::Conflict(msg) => AppError::Conflict(msg),
            PatientError::Validation(errors) => errors.into(),
            PatientError::Database(e) => e.into(),
        }
    }
}
