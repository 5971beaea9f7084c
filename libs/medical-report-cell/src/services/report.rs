use chrono::{FixedOffset, NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::services::availability::clinic_offset;
use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};
use shared_models::response::Pagination;

use crate::models::{
    CreateMedicalReportRequest, MedicalReport, MedicalReportError, ReportListQuery, ReportStatus,
    UpdateMedicalReportRequest,
};

const TABLE: &str = "medical_reports";

/// The follow-up has to land on a later local day than the visit itself.
pub fn follow_up_is_valid(appointment: &Appointment, follow_up: NaiveDate, offset: FixedOffset) -> bool {
    follow_up > appointment.start_time.with_timezone(&offset).date_naive()
}

pub struct MedicalReportService {
    supabase: SupabaseClient,
    offset: FixedOffset,
}

impl MedicalReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            offset: clinic_offset(&config.default_timezone),
        }
    }

    pub async fn create_report(
        &self,
        organization_id: Uuid,
        request: CreateMedicalReportRequest,
        auth_token: &str,
    ) -> Result<MedicalReport, MedicalReportError> {
        debug!("Writing medical report for appointment {}", request.appointment_id);

        let appointment = self
            .fetch_appointment(organization_id, request.appointment_id, auth_token)
            .await?;

        if !matches!(appointment.status, AppointmentStatus::InProgress | AppointmentStatus::Completed) {
            return Err(MedicalReportError::AppointmentNotReady(appointment.status));
        }

        let existing = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .eq("appointment_id", appointment.id);
        if self.supabase.exists(TABLE, existing, auth_token).await? {
            warn!("Appointment {} already has a medical report", appointment.id);
            return Err(MedicalReportError::AlreadyExists);
        }

        if let Some(follow_up) = request.follow_up_date {
            if !follow_up_is_valid(&appointment, follow_up, self.offset) {
                return Err(MedicalReportError::InvalidFollowUp);
            }
        }

        let now = Utc::now().to_rfc3339();
        let report_data = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "appointment_id": appointment.id,
            "patient_id": appointment.patient_id,
            "doctor_id": appointment.doctor_id,
            "chief_complaint": request.chief_complaint,
            "diagnosis": request.diagnosis.trim(),
            "symptoms": request.symptoms.iter().map(|s| s.trim()).collect::<Vec<_>>(),
            "vital_signs": request.vital_signs,
            "treatment_plan": request.treatment_plan,
            "prescriptions": request.prescriptions,
            "notes": request.notes,
            "follow_up_date": request.follow_up_date.map(|d| d.format("%Y-%m-%d").to_string()),
            "status": ReportStatus::Draft,
            "finalized_at": null,
            "created_at": now,
            "updated_at": now
        });

        let report: MedicalReport = self.supabase.insert(TABLE, report_data, auth_token).await?;
        info!("Medical report {} created for appointment {}", report.id, report.appointment_id);
        Ok(report)
    }

    pub async fn get_report(
        &self,
        organization_id: Uuid,
        report_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalReport, MedicalReportError> {
        let query = QueryBuilder::new()
            .eq("id", report_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(TABLE, query, auth_token)
            .await?
            .ok_or(MedicalReportError::NotFound)
    }

    /// Newest first.
    pub async fn list_reports(
        &self,
        organization_id: Uuid,
        query: ReportListQuery,
        auth_token: &str,
    ) -> Result<(Vec<MedicalReport>, Pagination), MedicalReportError> {
        let page = Pagination::from_query(query.limit, query.offset);

        let mut filter = QueryBuilder::new().eq("organization_id", organization_id);
        if let Some(patient_id) = query.patient_id {
            filter = filter.eq("patient_id", patient_id);
        }
        if let Some(doctor_id) = query.doctor_id {
            filter = filter.eq("doctor_id", doctor_id);
        }
        if let Some(status) = query.status {
            filter = filter.eq("status", status);
        }
        let filter = filter
            .order("created_at", false)
            .limit(page.limit)
            .offset(page.offset);

        let reports = self.supabase.select(TABLE, &filter, auth_token).await?;
        Ok((reports, page))
    }

    pub async fn update_report(
        &self,
        organization_id: Uuid,
        report_id: Uuid,
        request: UpdateMedicalReportRequest,
        auth_token: &str,
    ) -> Result<MedicalReport, MedicalReportError> {
        let report = self.get_report(organization_id, report_id, auth_token).await?;
        if !report.is_editable() {
            return Err(MedicalReportError::ReportFinalized);
        }

        if let Some(follow_up) = request.follow_up_date {
            let appointment = self
                .fetch_appointment(organization_id, report.appointment_id, auth_token)
                .await?;
            if !follow_up_is_valid(&appointment, follow_up, self.offset) {
                return Err(MedicalReportError::InvalidFollowUp);
            }
        }

        let patch = Patch::new()
            .set_opt("chief_complaint", request.chief_complaint)
            .set_opt("diagnosis", request.diagnosis.map(|d| d.trim().to_string()))
            .set_opt("symptoms", request.symptoms)
            .set_opt("vital_signs", request.vital_signs)
            .set_opt("treatment_plan", request.treatment_plan)
            .set_opt("prescriptions", request.prescriptions)
            .set_opt("notes", request.notes)
            .set_opt("follow_up_date", request.follow_up_date.map(|d| d.format("%Y-%m-%d").to_string()));

        self.patch_draft(organization_id, report_id, patch, auth_token).await
    }

    pub async fn finalize_report(
        &self,
        organization_id: Uuid,
        report_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalReport, MedicalReportError> {
        let report = self.get_report(organization_id, report_id, auth_token).await?;
        if !report.is_editable() {
            return Err(MedicalReportError::ReportFinalized);
        }

        let patch = Patch::new()
            .set("status", ReportStatus::Finalized)
            .set("finalized_at", Utc::now().to_rfc3339());

        let finalized = self.patch_draft(organization_id, report_id, patch, auth_token).await?;
        info!("Medical report {} finalized", report_id);
        Ok(finalized)
    }

    /// Only rows still in draft are touched; a report finalized in the
    /// meantime yields `ReportFinalized`.
    async fn patch_draft(
        &self,
        organization_id: Uuid,
        report_id: Uuid,
        patch: Patch,
        auth_token: &str,
    ) -> Result<MedicalReport, MedicalReportError> {
        let query = QueryBuilder::new()
            .eq("id", report_id)
            .eq("organization_id", organization_id)
            .eq("status", ReportStatus::Draft);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(MedicalReportError::ReportFinalized)
    }

    async fn fetch_appointment(
        &self,
        organization_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, MedicalReportError> {
        let query = QueryBuilder::new()
            .eq("id", appointment_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one("appointments", query, auth_token)
            .await?
            .ok_or(MedicalReportError::AppointmentNotFound)
    }
}
