// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{QueryBuilder, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, ConflictCheckResponse};

const TABLE: &str = "appointments";

pub struct ConflictService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Active appointments on `column` (doctor or patient) that overlap
    /// `[start, end)`.
    #[allow(clippy::too_many_arguments)]
    async fn active_overlapping(
        &self,
        organization_id: Uuid,
        column: &str,
        owner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .eq(column, owner_id)
            .in_list("status", &AppointmentStatus::ACTIVE)
            .lt("start_time", end.to_rfc3339())
            .gt("end_time", start.to_rfc3339());
        if let Some(id) = exclude_id {
            query = query.neq("id", id);
        }
        let query = query.order("start_time", true);

        let rows: Vec<Appointment> = self.supabase.select(TABLE, &query, auth_token).await?;
        Ok(rows
            .into_iter()
            .filter(|a| a.status.is_active() && a.overlaps(start, end) && Some(a.id) != exclude_id)
            .collect())
    }

    pub async fn doctor_active_between(
        &self,
        organization_id: Uuid,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.active_overlapping(organization_id, "doctor_id", doctor_id, start, end, exclude_id, auth_token)
            .await
    }

    pub async fn patient_active_between(
        &self,
        organization_id: Uuid,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.active_overlapping(organization_id, "patient_id", patient_id, start, end, exclude_id, auth_token)
            .await
    }

    pub async fn check_conflicts(
        &self,
        organization_id: Uuid,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        debug!("Checking conflicts for doctor {} from {} to {}", doctor_id, start, end);

        if end <= start {
            return Err(AppointmentError::InvalidTime("end_time must be after start_time".to_string()));
        }

        let conflicting_appointments = self
            .doctor_active_between(organization_id, doctor_id, start, end, exclude_id, auth_token)
            .await?;

        if !conflicting_appointments.is_empty() {
            warn!(
                "Conflict detected for doctor {} - {} conflicting appointments",
                doctor_id,
                conflicting_appointments.len()
            );
        }

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_appointments.is_empty(),
            conflicting_appointments,
        })
    }
}
