use chrono::Utc;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorListQuery, OrganizationError, UpdateDoctorRequest,
};

const TABLE: &str = "doctors";

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_doctor(
        &self,
        organization_id: Uuid,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, OrganizationError> {
        debug!("Adding doctor {} {} to clinic {}", request.first_name, request.last_name, request.clinic_id);

        let clinic_exists = self.supabase.exists(
            "clinics",
            QueryBuilder::new()
                .eq("id", request.clinic_id)
                .eq("organization_id", organization_id),
            auth_token,
        ).await?;
        if !clinic_exists {
            return Err(OrganizationError::NotFound("Clinic"));
        }

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "clinic_id": request.clinic_id,
            "user_id": request.user_id,
            "first_name": request.first_name.trim(),
            "last_name": request.last_name.trim(),
            "specialty": request.specialty.trim(),
            "session_duration_minutes": request.session_duration_minutes,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        Ok(self.supabase.insert(TABLE, row, auth_token).await?)
    }

    pub async fn get_doctor(
        &self,
        organization_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("id", doctor_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(TABLE, query, auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Doctor"))
    }

    pub async fn list_doctors(
        &self,
        organization_id: Uuid,
        query: DoctorListQuery,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, OrganizationError> {
        let mut filter = QueryBuilder::new().eq("organization_id", organization_id);
        if let Some(clinic_id) = query.clinic_id {
            filter = filter.eq("clinic_id", clinic_id);
        }
        if let Some(specialty) = query.specialty.as_deref() {
            filter = filter.ilike("specialty", specialty);
        }
        if query.active_only.unwrap_or(true) {
            filter = filter.eq("is_active", true);
        }
        let filter = filter.order("last_name", true);

        Ok(self.supabase.select(TABLE, &filter, auth_token).await?)
    }

    pub async fn update_doctor(
        &self,
        organization_id: Uuid,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, OrganizationError> {
        let patch = Patch::new()
            .set_opt("first_name", request.first_name.map(|v| v.trim().to_string()))
            .set_opt("last_name", request.last_name.map(|v| v.trim().to_string()))
            .set_opt("specialty", request.specialty.map(|v| v.trim().to_string()))
            .set_opt("session_duration_minutes", request.session_duration_minutes)
            .set_opt("is_active", request.is_active);

        let query = QueryBuilder::new()
            .eq("id", doctor_id)
            .eq("organization_id", organization_id);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Doctor"))
    }

    pub async fn deactivate_doctor(
        &self,
        organization_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, OrganizationError> {
        self.update_doctor(
            organization_id,
            doctor_id,
            UpdateDoctorRequest {
                is_active: Some(false),
                ..Default::default()
            },
            auth_token,
        )
        .await
    }
}
