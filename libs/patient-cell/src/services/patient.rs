use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{condition, contains_pattern, Patch, QueryBuilder, SupabaseClient};
use shared_models::response::Pagination;
use shared_utils::validation::normalize_phone;

use crate::models::{
    AppointmentSummary, CreatePatientRequest, Patient, PatientError, PatientHistory,
    PatientSearchQuery, ReportSummary, UpdatePatientRequest,
};

const TABLE: &str = "patients";

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        organization_id: Uuid,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let phone = normalize_phone(&request.phone);
        let national_id = request.national_id.as_deref().map(|id| id.trim().to_string());
        debug!("Registering patient with phone {} in organization {}", phone, organization_id);

        self.ensure_unique(organization_id, Some(&phone), national_id.as_deref(), None, auth_token)
            .await?;

        let now = Utc::now().to_rfc3339();
        let patient_data = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "email": request.email.map(|e| e.trim().to_lowercase()),
            "phone": phone,
            "national_id": national_id,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": request.gender,
            "blood_type": request.blood_type.map(|b| b.trim().to_uppercase()),
            "address": request.address,
            "allergies": request.allergies,
            "chronic_conditions": request.chronic_conditions,
            "emergency_contact_name": request.emergency_contact_name,
            "emergency_contact_phone": request.emergency_contact_phone.as_deref().map(normalize_phone),
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        let patient: Patient = self.supabase.insert(TABLE, patient_data, auth_token).await?;
        debug!("Patient created with ID: {}", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        organization_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let query = QueryBuilder::new()
            .eq("id", patient_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(TABLE, query, auth_token)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        organization_id: Uuid,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient: {}", patient_id);

        let phone = request.phone.as_deref().map(normalize_phone);
        let national_id = request.national_id.as_deref().map(|id| id.trim().to_string());
        if phone.is_some() || national_id.is_some() {
            self.ensure_unique(
                organization_id,
                phone.as_deref(),
                national_id.as_deref(),
                Some(patient_id),
                auth_token,
            )
            .await?;
        }

        let patch = Patch::new()
            .set_opt("first_name", request.first_name.map(|v| v.trim().to_string()))
            .set_opt("last_name", request.last_name.map(|v| v.trim().to_string()))
            .set_opt("email", request.email.map(|e| e.trim().to_lowercase()))
            .set_opt("phone", phone)
            .set_opt("national_id", national_id)
            .set_opt("date_of_birth", request.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()))
            .set_opt("gender", request.gender)
            .set_opt("blood_type", request.blood_type.map(|b| b.trim().to_uppercase()))
            .set_opt("address", request.address)
            .set_opt("allergies", request.allergies)
            .set_opt("chronic_conditions", request.chronic_conditions)
            .set_opt("emergency_contact_name", request.emergency_contact_name)
            .set_opt("emergency_contact_phone", request.emergency_contact_phone.as_deref().map(normalize_phone))
            .set_opt("is_active", request.is_active);

        let query = QueryBuilder::new()
            .eq("id", patient_id)
            .eq("organization_id", organization_id);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn deactivate_patient(
        &self,
        organization_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        self.update_patient(
            organization_id,
            patient_id,
            UpdatePatientRequest {
                is_active: Some(false),
                ..Default::default()
            },
            auth_token,
        )
        .await
    }

    pub async fn search_patients(
        &self,
        organization_id: Uuid,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, Pagination), PatientError> {
        let page = Pagination::from_query(query.limit, query.offset);

        let mut filter = QueryBuilder::new().eq("organization_id", organization_id);
        if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            filter = filter.or(&[
                condition("first_name", "ilike", &pattern),
                condition("last_name", "ilike", &pattern),
                condition("phone", "ilike", &pattern),
                condition("national_id", "ilike", &pattern),
                condition("email", "ilike", &pattern),
            ]);
        }
        if let Some(active) = query.is_active {
            filter = filter.eq("is_active", active);
        }
        let filter = filter
            .order("last_name", true)
            .order("first_name", true)
            .limit(page.limit)
            .offset(page.offset);

        let patients = self.supabase.select(TABLE, &filter, auth_token).await?;
        Ok((patients, page))
    }

    /// Appointments and reports of a patient, newest first.
    pub async fn get_history(
        &self,
        organization_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<PatientHistory, PatientError> {
        let patient = self.get_patient(organization_id, patient_id, auth_token).await?;

        let appointments_query = QueryBuilder::new()
            .select("id,clinic_id,doctor_id,start_time,end_time,status")
            .eq("organization_id", organization_id)
            .eq("patient_id", patient_id)
            .order("start_time", false);
        let reports_query = QueryBuilder::new()
            .select("id,appointment_id,doctor_id,diagnosis,status,created_at")
            .eq("organization_id", organization_id)
            .eq("patient_id", patient_id)
            .order("created_at", false);

        let (appointments, medical_reports): (Vec<AppointmentSummary>, Vec<ReportSummary>) = futures::try_join!(
            self.supabase.select("appointments", &appointments_query, auth_token),
            self.supabase.select("medical_reports", &reports_query, auth_token),
        )?;

        Ok(PatientHistory {
            patient,
            appointments,
            medical_reports,
        })
    }

    async fn ensure_unique(
        &self,
        organization_id: Uuid,
        phone: Option<&str>,
        national_id: Option<&str>,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), PatientError> {
        let scoped = || {
            let query = QueryBuilder::new().eq("organization_id", organization_id);
            match exclude_id {
                Some(id) => query.neq("id", id),
                None => query,
            }
        };

        if let Some(phone) = phone {
            if self.supabase.exists(TABLE, scoped().eq("phone", phone), auth_token).await? {
                warn!("Patient phone already registered in organization {}", organization_id);
                return Err(PatientError::Conflict(format!(
                    "A patient with phone {} already exists",
                    phone
                )));
            }
        }

        if let Some(national_id) = national_id {
            if self.supabase.exists(TABLE, scoped().eq("national_id", national_id), auth_token).await? {
                warn!("Patient national id already registered in organization {}", organization_id);
                return Err(PatientError::Conflict(
                    "A patient with this national id already exists".to_string(),
                ));
            }
        }

        Ok(())
    }
}
