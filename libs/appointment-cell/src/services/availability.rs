// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use organization_cell::models::{Clinic, DaySchedule, Doctor, MedicalService, OwnerType, WorkingHours};
use shared_config::AppConfig;
use shared_database::{QueryBuilder, SupabaseClient};

use crate::models::{AppointmentError, AvailableSlotsQuery, AvailableSlotsResponse, TimeSlot};
use crate::services::conflict::ConflictService;

/// Half-open interval overlap: touching intervals do not overlap.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// Parse the configured clinic timezone. Only `UTC` and fixed offsets such
/// as `+03:00` are understood; anything else falls back to UTC.
pub fn clinic_offset(timezone: &str) -> FixedOffset {
    let utc = Utc.fix();
    match timezone.trim() {
        "" | "UTC" | "Z" => utc,
        other => other.parse::<FixedOffset>().unwrap_or_else(|_| {
            warn!("Unsupported timezone '{}', using UTC", other);
            utc
        }),
    }
}

/// Instant at which the wall clock `time` on `date` occurs at `offset`.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    (date.and_time(time) - Duration::seconds(offset.local_minus_utc() as i64)).and_utc()
}

/// `[start, end)` in UTC of the local calendar day `date`.
pub fn local_day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(date, NaiveTime::MIN, offset);
    (start, start + Duration::days(1))
}

/// Weekday index used by working hours: 0 = Sunday.
pub fn weekday_index(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

/// Free slots of `duration_minutes` on `date` given the day's schedule and
/// the busy intervals. Slots start at `open` and advance by the slot length.
pub fn compute_free_slots(
    schedule: Option<&DaySchedule>,
    date: NaiveDate,
    offset: FixedOffset,
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
    duration_minutes: i32,
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    let Some(schedule) = schedule else {
        return Vec::new();
    };
    let Some((open, close)) = schedule.working_window() else {
        return Vec::new();
    };
    if duration_minutes <= 0 {
        return Vec::new();
    }

    let step = Duration::minutes(duration_minutes as i64);
    let close_at = local_to_utc(date, close, offset);
    let break_window = schedule
        .break_window()
        .map(|(start, end)| (local_to_utc(date, start, offset), local_to_utc(date, end, offset)));

    let mut slots = Vec::new();
    let mut t = local_to_utc(date, open, offset);
    while t + step <= close_at {
        let end = t + step;
        let in_break = break_window.is_some_and(|(b_start, b_end)| overlaps(t, end, b_start, b_end));
        let taken = busy.iter().any(|&(b_start, b_end)| overlaps(t, end, b_start, b_end));

        if !in_break && !taken && t > now {
            slots.push(TimeSlot { start_time: t, end_time: end });
        }
        t = end;
    }

    slots
}

/// Check that `[start, end)` lies inside the day's working window and
/// clear of its break.
pub fn check_within_schedule(
    schedule: Option<&DaySchedule>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<(), AppointmentError> {
    let schedule = schedule.ok_or(AppointmentError::OutsideWorkingHours)?;
    let (open, close) = schedule.working_window().ok_or(AppointmentError::OutsideWorkingHours)?;

    let date = start.with_timezone(&offset).date_naive();
    let open_at = local_to_utc(date, open, offset);
    let close_at = local_to_utc(date, close, offset);
    if start < open_at || end > close_at {
        return Err(AppointmentError::OutsideWorkingHours);
    }

    if let Some((break_start, break_end)) = schedule.break_window() {
        if overlaps(start, end, local_to_utc(date, break_start, offset), local_to_utc(date, break_end, offset)) {
            return Err(AppointmentError::DuringBreak);
        }
    }

    Ok(())
}

/// Slot length: the service's duration, else the doctor's session, else the
/// clinic's session.
pub fn resolve_duration(service: Option<&MedicalService>, doctor: &Doctor, clinic: &Clinic) -> i32 {
    service
        .map(|s| s.duration_minutes)
        .or(doctor.session_duration_minutes)
        .unwrap_or(clinic.session_duration_minutes)
}

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    conflicts: ConflictService,
    offset: FixedOffset,
}

impl AvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>, config: &AppConfig) -> Self {
        Self {
            conflicts: ConflictService::new(Arc::clone(&supabase)),
            supabase,
            offset: clinic_offset(&config.default_timezone),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The doctor's own hours for the weekday, else the clinic's.
    pub async fn effective_schedule(
        &self,
        organization_id: Uuid,
        doctor_id: Uuid,
        clinic_id: Uuid,
        day_of_week: i32,
        auth_token: &str,
    ) -> Result<Option<DaySchedule>, AppointmentError> {
        let doctor_day = self
            .schedule_for(organization_id, OwnerType::Doctor, doctor_id, day_of_week, auth_token)
            .await?;
        if doctor_day.is_some() {
            return Ok(doctor_day);
        }

        debug!("Doctor {} has no hours for day {}, using clinic {}", doctor_id, day_of_week, clinic_id);
        self.schedule_for(organization_id, OwnerType::Clinic, clinic_id, day_of_week, auth_token)
            .await
    }

    async fn schedule_for(
        &self,
        organization_id: Uuid,
        owner_type: OwnerType,
        owner_id: Uuid,
        day_of_week: i32,
        auth_token: &str,
    ) -> Result<Option<DaySchedule>, AppointmentError> {
        let query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .eq("owner_type", owner_type)
            .eq("owner_id", owner_id)
            .eq("day_of_week", day_of_week);

        let row: Option<WorkingHours> = self.supabase.select_one("working_hours", query, auth_token).await?;
        Ok(row.map(|wh| wh.schedule))
    }

    pub async fn available_slots(
        &self,
        organization_id: Uuid,
        query: AvailableSlotsQuery,
        auth_token: &str,
    ) -> Result<AvailableSlotsResponse, AppointmentError> {
        debug!("Computing available slots for doctor {} on {}", query.doctor_id, query.date);

        let doctor: Doctor = self
            .supabase
            .select_one(
                "doctors",
                QueryBuilder::new()
                    .eq("id", query.doctor_id)
                    .eq("organization_id", organization_id),
                auth_token,
            )
            .await?
            .ok_or(AppointmentError::RelatedNotFound("Doctor"))?;

        let clinic_query = QueryBuilder::new()
            .eq("id", doctor.clinic_id)
            .eq("organization_id", organization_id);
        let service_query = query.service_id.map(|service_id| {
            QueryBuilder::new()
                .eq("id", service_id)
                .eq("organization_id", organization_id)
        });

        let (day_start, day_end) = local_day_bounds(query.date, self.offset);
        let (clinic, service, schedule, busy) = futures::try_join!(
            self.fetch_clinic(clinic_query, auth_token),
            self.fetch_service(service_query, auth_token),
            self.effective_schedule(
                organization_id,
                doctor.id,
                doctor.clinic_id,
                weekday_index(query.date),
                auth_token,
            ),
            self.conflicts.doctor_active_between(organization_id, doctor.id, day_start, day_end, None, auth_token),
        )?;

        if let Some(service) = &service {
            if service.clinic_id != clinic.id {
                return Err(AppointmentError::ServiceNotInClinic);
            }
        }

        let duration = resolve_duration(service.as_ref(), &doctor, &clinic);
        let busy: Vec<_> = busy.iter().map(|a| (a.start_time, a.end_time)).collect();
        let slots = if doctor.is_active && clinic.is_active() {
            compute_free_slots(schedule.as_ref(), query.date, self.offset, &busy, duration, Utc::now())
        } else {
            Vec::new()
        };

        Ok(AvailableSlotsResponse {
            doctor_id: doctor.id,
            date: query.date,
            slot_duration_minutes: duration,
            slots,
        })
    }

    async fn fetch_clinic(&self, query: QueryBuilder, auth_token: &str) -> Result<Clinic, AppointmentError> {
        self.supabase
            .select_one("clinics", query, auth_token)
            .await?
            .ok_or(AppointmentError::RelatedNotFound("Clinic"))
    }

    async fn fetch_service(
        &self,
        query: Option<QueryBuilder>,
        auth_token: &str,
    ) -> Result<Option<MedicalService>, AppointmentError> {
        match query {
            Some(query) => {
                let service = self
                    .supabase
                    .select_one("clinic_services", query, auth_token)
                    .await?
                    .ok_or(AppointmentError::RelatedNotFound("Service"))?;
                Ok(Some(service))
            }
            None => Ok(None),
        }
    }
}
