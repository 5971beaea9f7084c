// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_utils::validation::{Validate, ValidationErrors};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub service_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Half-open overlap with `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that still occupy the doctor's time.
    pub const ACTIVE: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::CheckedIn,
        AppointmentStatus::InProgress,
    ];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Booked but not yet under way; only these may move in time.
    pub fn is_reschedulable(self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub fn allowed_transitions(self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[Confirmed, Cancelled, NoShow],
            Confirmed => &[CheckedIn, Cancelled, NoShow],
            CheckedIn => &[InProgress, NoShow],
            InProgress => &[Completed],
            Completed | Cancelled | NoShow => &[],
        }
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::CheckedIn => write!(f, "checked_in"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "checked_in" => Ok(AppointmentStatus::CheckedIn),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no_show" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub service_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

fn check_notes(errors: &mut ValidationErrors, notes: Option<&str>) {
    if notes.is_some_and(|n| n.chars().count() > 2000) {
        errors.add("notes", "must be at most 2000 characters");
    }
}

impl Validate for BookAppointmentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_notes(&mut errors, self.notes.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Validate for RescheduleAppointmentRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_notes(&mut errors, self.notes.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub clinic_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot_duration_minutes: i32,
    pub slots: Vec<TimeSlot>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("{0} not found")]
    RelatedNotFound(&'static str),

    #[error("{0} is not active")]
    Inactive(&'static str),

    #[error("Doctor does not work at this clinic")]
    DoctorNotInClinic,

    #[error("Service is not offered by this clinic")]
    ServiceNotInClinic,

    #[error("Requested time is outside working hours")]
    OutsideWorkingHours,

    #[error("Requested time falls within the break")]
    DuringBreak,

    #[error("Appointment conflicts with an existing booking")]
    ConflictDetected,

    #[error("Patient already has an appointment at this time")]
    PatientDoubleBooked,

    #[error("Patient reached the limit of {0} appointments per day")]
    DailyLimitReached(u32),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("A cancellation reason is required")]
    ReasonRequired,

    #[error("Appointment was changed by another request")]
    ConcurrentUpdate,

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<ValidationErrors> for AppointmentError {
    fn from(errors: ValidationErrors) -> Self {
        AppointmentError::Validation(errors)
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound | AppointmentError::RelatedNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            AppointmentError::Inactive(_)
            | AppointmentError::DoctorNotInClinic
            | AppointmentError::ServiceNotInClinic
            | AppointmentError::OutsideWorkingHours
            | AppointmentError::DuringBreak
            | AppointmentError::InvalidTime(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::ConflictDetected
            | AppointmentError::PatientDoubleBooked
            | AppointmentError::DailyLimitReached(_)
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::ConcurrentUpdate => AppError::Conflict(err.to_string()),
            AppointmentError::ReasonRequired => AppError::ValidationError(format!("reason: {}", err)),
            AppointmentError::Validation(errors) => errors.into(),
            AppointmentError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn main_path_is_allowed() {
        let path = [Scheduled, Confirmed, CheckedIn, InProgress, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn cancel_and_no_show_rules() {
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!CheckedIn.can_transition_to(Cancelled));
        assert!(CheckedIn.can_transition_to(NoShow));
        assert!(!InProgress.can_transition_to(NoShow));
    }

    #[test]
    fn terminal_states_are_final() {
        for status in [Completed, Cancelled, NoShow] {
            assert!(status.is_terminal());
            assert!(!status.is_active());
            assert!(status.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn skipping_steps_is_rejected() {
        assert!(!Scheduled.can_transition_to(InProgress));
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Scheduled));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [Scheduled, Confirmed, CheckedIn, InProgress, Completed, Cancelled, NoShow] {
            assert_eq!(status.to_string().parse::<AppointmentStatus>().unwrap(), status);
        }
    }
}
