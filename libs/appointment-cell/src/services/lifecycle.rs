// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, UpdateStatusRequest};
use crate::services::booking::fetch_appointment;

const TABLE: &str = "appointments";

/// Check a status change against the appointment state machine.
pub fn validate_transition(
    current: AppointmentStatus,
    next: AppointmentStatus,
    reason: Option<&str>,
) -> Result<(), AppointmentError> {
    if !current.can_transition_to(next) {
        warn!("Invalid status transition attempted: {} -> {}", current, next);
        return Err(AppointmentError::InvalidStatusTransition { from: current, to: next });
    }

    if next == AppointmentStatus::Cancelled && reason.map_or(true, |r| r.trim().is_empty()) {
        return Err(AppointmentError::ReasonRequired);
    }

    Ok(())
}

pub struct LifecycleService {
    supabase: Arc<SupabaseClient>,
}

impl LifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub async fn update_status(
        &self,
        organization_id: Uuid,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = fetch_appointment(&self.supabase, organization_id, appointment_id, auth_token).await?;
        debug!("Moving appointment {} from {} to {}", appointment_id, appointment.status, request.status);

        validate_transition(appointment.status, request.status, request.reason.as_deref())?;

        let reason = if request.status == AppointmentStatus::Cancelled {
            request.reason.map(|r| r.trim().to_string())
        } else {
            None
        };
        let patch = Patch::new()
            .set("status", request.status)
            .set_opt("cancellation_reason", reason);

        // Guard on the status we validated against so a concurrent change
        // is not overwritten.
        let query = QueryBuilder::new()
            .eq("id", appointment_id)
            .eq("organization_id", organization_id)
            .eq("status", appointment.status);

        let updated: Appointment = self
            .supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(AppointmentError::ConcurrentUpdate)?;

        info!("Appointment {} is now {}", appointment_id, updated.status);
        Ok(updated)
    }
}
