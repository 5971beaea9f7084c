// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use organization_cell::models::{Clinic, Doctor, MedicalService};
use patient_cell::models::Patient;
use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};
use shared_models::response::Pagination;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus, AvailableSlotsQuery,
    AvailableSlotsResponse, BookAppointmentRequest, ConflictCheckQuery, ConflictCheckResponse,
    RescheduleAppointmentRequest,
};
use crate::services::availability::{
    check_within_schedule, local_day_bounds, resolve_duration, weekday_index, AvailabilityService,
};
use crate::services::conflict::ConflictService;

const TABLE: &str = "appointments";

pub(crate) async fn fetch_appointment(
    supabase: &SupabaseClient,
    organization_id: Uuid,
    appointment_id: Uuid,
    auth_token: &str,
) -> Result<Appointment, AppointmentError> {
    let query = QueryBuilder::new()
        .eq("id", appointment_id)
        .eq("organization_id", organization_id);

    supabase
        .select_one(TABLE, query, auth_token)
        .await?
        .ok_or(AppointmentError::NotFound)
}

/// Who and where an appointment slot is checked for.
struct SlotOwner {
    doctor_id: Uuid,
    clinic_id: Uuid,
    patient_id: Uuid,
}

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    conflicts: ConflictService,
    availability: AvailabilityService,
    max_patient_daily_appointments: u32,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            conflicts: ConflictService::new(Arc::clone(&supabase)),
            availability: AvailabilityService::new(Arc::clone(&supabase), config),
            max_patient_daily_appointments: config.max_patient_daily_appointments,
            supabase,
        }
    }

    pub async fn book_appointment(
        &self,
        organization_id: Uuid,
        created_by: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking appointment for patient {} with doctor {} at {}",
            request.patient_id, request.doctor_id, request.start_time
        );

        if request.start_time <= Utc::now() {
            return Err(AppointmentError::InvalidTime("start_time must be in the future".to_string()));
        }

        let (patient, doctor, clinic, service) = futures::try_join!(
            self.fetch_related::<Patient>("patients", "Patient", organization_id, request.patient_id, auth_token),
            self.fetch_related::<Doctor>("doctors", "Doctor", organization_id, request.doctor_id, auth_token),
            self.fetch_related::<Clinic>("clinics", "Clinic", organization_id, request.clinic_id, auth_token),
            self.fetch_service(organization_id, request.service_id, auth_token),
        )?;

        if !patient.is_active {
            return Err(AppointmentError::Inactive("Patient"));
        }
        if !doctor.is_active {
            return Err(AppointmentError::Inactive("Doctor"));
        }
        if !clinic.is_active() {
            return Err(AppointmentError::Inactive("Clinic"));
        }
        if doctor.clinic_id != clinic.id {
            return Err(AppointmentError::DoctorNotInClinic);
        }
        if let Some(service) = &service {
            if service.clinic_id != clinic.id {
                return Err(AppointmentError::ServiceNotInClinic);
            }
            if !service.is_active {
                return Err(AppointmentError::Inactive("Service"));
            }
        }

        let duration = resolve_duration(service.as_ref(), &doctor, &clinic);
        let start = request.start_time;
        let end = start + Duration::minutes(duration as i64);

        let owner = SlotOwner {
            doctor_id: doctor.id,
            clinic_id: clinic.id,
            patient_id: patient.id,
        };
        self.validate_slot(organization_id, &owner, start, end, None, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "clinic_id": clinic.id,
            "doctor_id": doctor.id,
            "patient_id": patient.id,
            "service_id": service.map(|s| s.id),
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "duration_minutes": duration,
            "status": AppointmentStatus::Scheduled,
            "notes": request.notes,
            "cancellation_reason": null,
            "created_by": created_by,
            "created_at": now,
            "updated_at": now
        });

        let appointment: Appointment = self.supabase.insert(TABLE, row, auth_token).await?;
        info!("Appointment {} booked for patient {}", appointment.id, appointment.patient_id);
        Ok(appointment)
    }

    pub async fn reschedule_appointment(
        &self,
        organization_id: Uuid,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = fetch_appointment(&self.supabase, organization_id, appointment_id, auth_token).await?;
        debug!("Rescheduling appointment {} to {}", appointment_id, request.start_time);

        if !appointment.status.is_reschedulable() {
            return Err(AppointmentError::InvalidStatusTransition {
                from: appointment.status,
                to: AppointmentStatus::Scheduled,
            });
        }
        if request.start_time <= Utc::now() {
            return Err(AppointmentError::InvalidTime("start_time must be in the future".to_string()));
        }

        let start = request.start_time;
        let end = start + Duration::minutes(appointment.duration_minutes as i64);
        let owner = SlotOwner {
            doctor_id: appointment.doctor_id,
            clinic_id: appointment.clinic_id,
            patient_id: appointment.patient_id,
        };
        self.validate_slot(organization_id, &owner, start, end, Some(appointment.id), auth_token)
            .await?;

        let patch = Patch::new()
            .set("start_time", start.to_rfc3339())
            .set("end_time", end.to_rfc3339())
            .set("status", AppointmentStatus::Scheduled)
            .set_opt("notes", request.notes);

        let query = QueryBuilder::new()
            .eq("id", appointment_id)
            .eq("organization_id", organization_id)
            .eq("status", appointment.status);

        let updated = self
            .supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(AppointmentError::ConcurrentUpdate)?;

        info!("Appointment {} moved to {}", appointment_id, start);
        Ok(updated)
    }

    pub async fn get_appointment(
        &self,
        organization_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        fetch_appointment(&self.supabase, organization_id, appointment_id, auth_token).await
    }

    pub async fn list_appointments(
        &self,
        organization_id: Uuid,
        query: AppointmentListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, Pagination), AppointmentError> {
        let page = Pagination::from_query(query.limit, query.offset);

        let mut filter = QueryBuilder::new().eq("organization_id", organization_id);
        if let Some(clinic_id) = query.clinic_id {
            filter = filter.eq("clinic_id", clinic_id);
        }
        if let Some(doctor_id) = query.doctor_id {
            filter = filter.eq("doctor_id", doctor_id);
        }
        if let Some(patient_id) = query.patient_id {
            filter = filter.eq("patient_id", patient_id);
        }
        if let Some(status) = query.status {
            filter = filter.eq("status", status);
        }
        if let Some(from) = query.from {
            filter = filter.gte("start_time", from.to_rfc3339());
        }
        if let Some(to) = query.to {
            filter = filter.lt("start_time", to.to_rfc3339());
        }
        let filter = filter
            .order("start_time", true)
            .limit(page.limit)
            .offset(page.offset);

        let appointments = self.supabase.select(TABLE, &filter, auth_token).await?;
        Ok((appointments, page))
    }

    pub async fn check_conflicts(
        &self,
        organization_id: Uuid,
        query: ConflictCheckQuery,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, AppointmentError> {
        self.conflicts
            .check_conflicts(
                organization_id,
                query.doctor_id,
                query.start_time,
                query.end_time,
                query.exclude_appointment_id,
                auth_token,
            )
            .await
    }

    pub async fn available_slots(
        &self,
        organization_id: Uuid,
        query: AvailableSlotsQuery,
        auth_token: &str,
    ) -> Result<AvailableSlotsResponse, AppointmentError> {
        self.availability.available_slots(organization_id, query, auth_token).await
    }

    /// Working hours, doctor overlap, patient overlap and the patient's
    /// daily limit, in that order.
    async fn validate_slot(
        &self,
        organization_id: Uuid,
        owner: &SlotOwner,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let offset = self.availability.offset();
        let local_date = start.with_timezone(&offset).date_naive();

        let schedule = self
            .availability
            .effective_schedule(
                organization_id,
                owner.doctor_id,
                owner.clinic_id,
                weekday_index(local_date),
                auth_token,
            )
            .await?;
        check_within_schedule(schedule.as_ref(), start, end, offset)?;

        let (day_start, day_end) = local_day_bounds(local_date, offset);
        let (doctor_busy, patient_day) = futures::try_join!(
            self.conflicts.doctor_active_between(organization_id, owner.doctor_id, start, end, exclude_id, auth_token),
            self.conflicts.patient_active_between(organization_id, owner.patient_id, day_start, day_end, exclude_id, auth_token),
        )?;

        if !doctor_busy.is_empty() {
            warn!("Doctor {} already booked between {} and {}", owner.doctor_id, start, end);
            return Err(AppointmentError::ConflictDetected);
        }
        if patient_day.iter().any(|a| a.overlaps(start, end)) {
            warn!("Patient {} already booked between {} and {}", owner.patient_id, start, end);
            return Err(AppointmentError::PatientDoubleBooked);
        }
        if patient_day.len() as u32 >= self.max_patient_daily_appointments {
            warn!("Patient {} reached the daily appointment limit", owner.patient_id);
            return Err(AppointmentError::DailyLimitReached(self.max_patient_daily_appointments));
        }

        Ok(())
    }

    async fn fetch_related<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        entity: &'static str,
        organization_id: Uuid,
        id: Uuid,
        auth_token: &str,
    ) -> Result<T, AppointmentError> {
        let query = QueryBuilder::new()
            .eq("id", id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(table, query, auth_token)
            .await?
            .ok_or(AppointmentError::RelatedNotFound(entity))
    }

    async fn fetch_service(
        &self,
        organization_id: Uuid,
        service_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Option<MedicalService>, AppointmentError> {
        match service_id {
            Some(id) => self
                .fetch_related("clinic_services", "Service", organization_id, id, auth_token)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}
