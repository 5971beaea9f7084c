use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::AppointmentStatus;
use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::{check_range, require_non_empty, Validate, ValidationErrors};

const MAX_TEXT: usize = 4000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Finalized,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Draft => write!(f, "draft"),
            ReportStatus::Finalized => write!(f, "finalized"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    /// Systolic/diastolic, e.g. `120/80`.
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<i32>,
    /// Celsius.
    pub temperature: Option<f64>,
    /// Kilograms.
    pub weight: Option<f64>,
    /// Centimetres.
    pub height: Option<f64>,
}

impl Validate for VitalSigns {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(bp) = &self.blood_pressure {
            if parse_blood_pressure(bp).is_none() {
                errors.add("blood_pressure", "must look like 120/80");
            }
        }
        if let Some(heart_rate) = self.heart_rate {
            check_range(&mut errors, "heart_rate", heart_rate, 20, 300);
        }
        if let Some(temperature) = self.temperature {
            check_range(&mut errors, "temperature", temperature, 30.0, 45.0);
        }
        if let Some(weight) = self.weight {
            check_range(&mut errors, "weight", weight, 0.5, 500.0);
        }
        if let Some(height) = self.height {
            check_range(&mut errors, "height", height, 20.0, 300.0);
        }
        errors.into_result()
    }
}

fn parse_blood_pressure(value: &str) -> Option<(u32, u32)> {
    let (systolic, diastolic) = value.trim().split_once('/')?;
    let systolic: u32 = systolic.trim().parse().ok()?;
    let diastolic: u32 = diastolic.trim().parse().ok()?;
    (diastolic < systolic && (40..=300).contains(&systolic)).then_some((systolic, diastolic))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: Option<i32>,
    pub instructions: Option<String>,
}

impl Validate for Prescription {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "medication", &self.medication);
        require_non_empty(&mut errors, "dosage", &self.dosage);
        require_non_empty(&mut errors, "frequency", &self.frequency);
        if let Some(days) = self.duration_days {
            check_range(&mut errors, "duration_days", days, 1, 365);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalReport {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub chief_complaint: Option<String>,
    pub diagnosis: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub vital_signs: Option<VitalSigns>,
    pub treatment_plan: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub status: ReportStatus,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalReport {
    pub fn is_editable(&self) -> bool {
        self.status == ReportStatus::Draft
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicalReportRequest {
    pub appointment_id: Uuid,
    pub chief_complaint: Option<String>,
    pub diagnosis: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub vital_signs: Option<VitalSigns>,
    pub treatment_plan: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl Validate for CreateMedicalReportRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "diagnosis", &self.diagnosis);
        check_clinical_content(
            &mut errors,
            &ClinicalContent {
                diagnosis: Some(&self.diagnosis),
                chief_complaint: self.chief_complaint.as_deref(),
                treatment_plan: self.treatment_plan.as_deref(),
                notes: self.notes.as_deref(),
                symptoms: Some(&self.symptoms),
                vital_signs: self.vital_signs.as_ref(),
                prescriptions: Some(&self.prescriptions),
            },
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicalReportRequest {
    pub chief_complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub vital_signs: Option<VitalSigns>,
    pub treatment_plan: Option<String>,
    pub prescriptions: Option<Vec<Prescription>>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

impl Validate for UpdateMedicalReportRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(diagnosis) = &self.diagnosis {
            require_non_empty(&mut errors, "diagnosis", diagnosis);
        }
        check_clinical_content(
            &mut errors,
            &ClinicalContent {
                diagnosis: self.diagnosis.as_deref(),
                chief_complaint: self.chief_complaint.as_deref(),
                treatment_plan: self.treatment_plan.as_deref(),
                notes: self.notes.as_deref(),
                symptoms: self.symptoms.as_deref(),
                vital_signs: self.vital_signs.as_ref(),
                prescriptions: self.prescriptions.as_deref(),
            },
        );
        errors.into_result()
    }
}

struct ClinicalContent<'a> {
    diagnosis: Option<&'a str>,
    chief_complaint: Option<&'a str>,
    treatment_plan: Option<&'a str>,
    notes: Option<&'a str>,
    symptoms: Option<&'a [String]>,
    vital_signs: Option<&'a VitalSigns>,
    prescriptions: Option<&'a [Prescription]>,
}

fn check_clinical_content(errors: &mut ValidationErrors, content: &ClinicalContent<'_>) {
    let texts = [
        ("diagnosis", content.diagnosis),
        ("chief_complaint", content.chief_complaint),
        ("treatment_plan", content.treatment_plan),
        ("notes", content.notes),
    ];
    for (field, value) in texts {
        if value.is_some_and(|v| v.chars().count() > MAX_TEXT) {
            errors.add(field, format!("must be at most {} characters", MAX_TEXT));
        }
    }

    if let Some(symptoms) = content.symptoms {
        if symptoms.iter().any(|s| s.trim().is_empty()) {
            errors.add("symptoms", "must not contain empty entries");
        }
    }
    if let Some(Err(vital_errors)) = content.vital_signs.map(Validate::validate) {
        errors.merge("vital_signs", vital_errors);
    }
    for (i, prescription) in content.prescriptions.unwrap_or_default().iter().enumerate() {
        if let Err(e) = prescription.validate() {
            errors.merge(&format!("prescriptions[{}]", i), e);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportListQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<ReportStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum MedicalReportError {
    #[error("Medical report not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Reports can only be written for in-progress or completed appointments (appointment is {0})")]
    AppointmentNotReady(AppointmentStatus),

    #[error("A report already exists for this appointment")]
    AlreadyExists,

    #[error("Report is finalized and can no longer be changed")]
    ReportFinalized,

    #[error("Follow-up date must be after the appointment date")]
    InvalidFollowUp,

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<MedicalReportError> for AppError {
    fn from(err: MedicalReportError) -> Self {
        match err {
            MedicalReportError::NotFound | MedicalReportError::AppointmentNotFound => {
                AppError::NotFound(err.to_string())
            }
            MedicalReportError::AppointmentNotReady(_) => AppError::BadRequest(err.to_string()),
            MedicalReportError::AlreadyExists | MedicalReportError::ReportFinalized => {
                AppError::Conflict(err.to_string())
            }
            MedicalReportError::InvalidFollowUp => {
                AppError::ValidationError(format!("follow_up_date: {}", err))
            }
            MedicalReportError::Validation(errors) => errors.into(),
            MedicalReportError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_request() -> CreateMedicalReportRequest {
        CreateMedicalReportRequest {
            appointment_id: Uuid::new_v4(),
            chief_complaint: Some("toothache".into()),
            diagnosis: "Dental caries".into(),
            symptoms: vec!["pain".into()],
            vital_signs: Some(VitalSigns {
                blood_pressure: Some("120/80".into()),
                heart_rate: Some(72),
                ..VitalSigns::default()
            }),
            treatment_plan: None,
            prescriptions: vec![Prescription {
                medication: "Ibuprofen".into(),
                dosage: "400mg".into(),
                frequency: "every 8 hours".into(),
                duration_days: Some(5),
                instructions: None,
            }],
            notes: None,
            follow_up_date: None,
        }
    }

    #[test]
    fn complete_report_passes() {
        assert!(report_request().validate().is_ok());
    }

    #[test]
    fn nested_errors_are_prefixed() {
        let mut request = report_request();
        request.vital_signs = Some(VitalSigns {
            blood_pressure: Some("80/120".into()),
            heart_rate: Some(500),
            ..VitalSigns::default()
        });
        request.prescriptions[0].dosage = " ".into();

        let errors = request.validate().unwrap_err();
        assert!(errors.has_field("vital_signs.blood_pressure"));
        assert!(errors.has_field("vital_signs.heart_rate"));
        assert!(errors.has_field("prescriptions[0].dosage"));
    }

    #[test]
    fn blank_diagnosis_rejected() {
        let mut request = report_request();
        request.diagnosis = "  ".into();
        assert!(request.validate().unwrap_err().has_field("diagnosis"));
    }

    #[test]
    fn blood_pressure_format() {
        assert_eq!(parse_blood_pressure("130 / 85"), Some((130, 85)));
        assert_eq!(parse_blood_pressure("130"), None);
        assert_eq!(parse_blood_pressure("abc/def"), None);
    }
}
