use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};
use shared_models::response::Pagination;
use shared_utils::validation::{normalize_name, ValidationErrors};

use crate::models::{
    Clinic, ClinicListQuery, CreateClinicRequest, CreateMedicalServiceRequest, Department, EntityStatus,
    MedicalService, OrganizationError, UpdateClinicRequest, UpdateMedicalServiceRequest,
};

const TABLE: &str = "clinics";
const SERVICES_TABLE: &str = "clinic_services";
const BLOCKING_APPOINTMENT_STATUSES: [&str; 4] = ["scheduled", "confirmed", "checked_in", "in_progress"];

pub struct ClinicService {
    supabase: SupabaseClient,
    default_session_minutes: i32,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            default_session_minutes: config.default_session_minutes,
        }
    }

    pub async fn create_clinic(
        &self,
        organization_id: Uuid,
        request: CreateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic, OrganizationError> {
        debug!("Creating clinic '{}' for organization {}", request.name_en, organization_id);

        if let Some(complex_id) = request.complex_id {
            let complex_exists = self.supabase.exists(
                "complexes",
                QueryBuilder::new()
                    .eq("id", complex_id)
                    .eq("organization_id", organization_id),
                auth_token,
            ).await?;
            if !complex_exists {
                return Err(OrganizationError::NotFound("Complex"));
            }
        }

        if let Some(department_id) = request.department_id {
            let department: Department = self.supabase
                .select_one(
                    "departments",
                    QueryBuilder::new()
                        .eq("id", department_id)
                        .eq("organization_id", organization_id),
                    auth_token,
                )
                .await?
                .ok_or(OrganizationError::NotFound("Department"))?;

            if Some(department.complex_id) != request.complex_id {
                let mut errors = ValidationErrors::new();
                errors.add("department_id", "belongs to a different complex");
                return Err(errors.into());
            }
        }

        if let Some(license) = request.license_number.as_deref() {
            if self.license_taken(license, auth_token).await? {
                warn!("Clinic license number already registered: {}", license);
                return Err(OrganizationError::Conflict(format!(
                    "License number '{}' is already registered",
                    license
                )));
            }
        }

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "complex_id": request.complex_id,
            "department_id": request.department_id,
            "name_ar": normalize_name(&request.name_ar),
            "name_en": normalize_name(&request.name_en),
            "license_number": request.license_number.map(|l| l.trim().to_string()),
            "phone": request.phone,
            "email": request.email,
            "session_duration_minutes": request.session_duration_minutes.unwrap_or(self.default_session_minutes),
            "status": EntityStatus::Active,
            "created_at": now,
            "updated_at": now
        });

        let clinic: Clinic = self.supabase.insert(TABLE, row, auth_token).await?;
        debug!("Clinic created with ID: {}", clinic.id);
        Ok(clinic)
    }

    pub async fn get_clinic(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Clinic, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("id", clinic_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(TABLE, query, auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Clinic"))
    }

    pub async fn list_clinics(
        &self,
        organization_id: Uuid,
        query: ClinicListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Clinic>, Pagination), OrganizationError> {
        let page = Pagination::from_query(query.limit, query.offset);

        let mut filter = QueryBuilder::new().eq("organization_id", organization_id);
        if let Some(complex_id) = query.complex_id {
            filter = filter.eq("complex_id", complex_id);
        }
        if let Some(department_id) = query.department_id {
            filter = filter.eq("department_id", department_id);
        }
        if let Some(status) = query.status {
            filter = filter.eq("status", status);
        }
        let filter = filter.order("name_en", true).limit(page.limit).offset(page.offset);

        let clinics = self.supabase.select(TABLE, &filter, auth_token).await?;
        Ok((clinics, page))
    }

    pub async fn update_clinic(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        request: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic, OrganizationError> {
        debug!("Updating clinic: {}", clinic_id);

        let patch = Patch::new()
            .set_opt("name_ar", request.name_ar.as_deref().map(normalize_name))
            .set_opt("name_en", request.name_en.as_deref().map(normalize_name))
            .set_opt("phone", request.phone)
            .set_opt("email", request.email)
            .set_opt("session_duration_minutes", request.session_duration_minutes);

        let query = QueryBuilder::new()
            .eq("id", clinic_id)
            .eq("organization_id", organization_id);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Clinic"))
    }

    /// Soft delete. Clinics with upcoming active appointments stay open.
    pub async fn deactivate_clinic(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Clinic, OrganizationError> {
        self.get_clinic(organization_id, clinic_id, auth_token).await?;

        let upcoming = QueryBuilder::new()
            .eq("clinic_id", clinic_id)
            .gte("start_time", Utc::now().to_rfc3339())
            .in_list("status", &BLOCKING_APPOINTMENT_STATUSES);
        if self.supabase.exists("appointments", upcoming, auth_token).await? {
            warn!("Refusing to deactivate clinic {} with upcoming appointments", clinic_id);
            return Err(OrganizationError::Conflict(
                "Clinic has upcoming appointments".to_string(),
            ));
        }

        let query = QueryBuilder::new()
            .eq("id", clinic_id)
            .eq("organization_id", organization_id);
        let patch = Patch::new().set("status", EntityStatus::Inactive);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Clinic"))
    }

    pub async fn license_taken(&self, license_number: &str, auth_token: &str) -> Result<bool, OrganizationError> {
        let query = QueryBuilder::new().eq("license_number", license_number.trim());
        Ok(self.supabase.exists(TABLE, query, auth_token).await?)
    }

    // ==============================================================================
    // SERVICES OFFERED BY A CLINIC
    // ==============================================================================

    pub async fn create_service(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        request: CreateMedicalServiceRequest,
        auth_token: &str,
    ) -> Result<MedicalService, OrganizationError> {
        self.get_clinic(organization_id, clinic_id, auth_token).await?;

        let name_en = normalize_name(&request.name_en);
        self.ensure_service_name_free(clinic_id, &name_en, None, auth_token).await?;

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "clinic_id": clinic_id,
            "name_ar": normalize_name(&request.name_ar),
            "name_en": name_en,
            "price": round_money(request.price),
            "duration_minutes": request.duration_minutes,
            "is_active": true,
            "created_at": now,
            "updated_at": now
        });

        Ok(self.supabase.insert(SERVICES_TABLE, row, auth_token).await?)
    }

    pub async fn get_service(
        &self,
        organization_id: Uuid,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalService, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("id", service_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(SERVICES_TABLE, query, auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Service"))
    }

    pub async fn list_services(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<MedicalService>, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .eq("clinic_id", clinic_id)
            .order("name_en", true);
        Ok(self.supabase.select(SERVICES_TABLE, &query, auth_token).await?)
    }

    /// Service of `clinic_id`; one belonging to another clinic is not found.
    pub async fn get_clinic_service(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalService, OrganizationError> {
        let service = self.get_service(organization_id, service_id, auth_token).await?;
        if service.clinic_id != clinic_id {
            return Err(OrganizationError::NotFound("Service"));
        }
        Ok(service)
    }

    pub async fn update_service(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        service_id: Uuid,
        request: UpdateMedicalServiceRequest,
        auth_token: &str,
    ) -> Result<MedicalService, OrganizationError> {
        let existing = self.get_clinic_service(organization_id, clinic_id, service_id, auth_token).await?;

        let name_en = request.name_en.as_deref().map(normalize_name);
        if let Some(name) = name_en.as_deref() {
            if name.to_lowercase() != existing.name_en.to_lowercase() {
                self.ensure_service_name_free(clinic_id, name, Some(service_id), auth_token).await?;
            }
        }

        let patch = Patch::new()
            .set_opt("name_ar", request.name_ar.as_deref().map(normalize_name))
            .set_opt("name_en", name_en)
            .set_opt("price", request.price.map(round_money))
            .set_opt("duration_minutes", request.duration_minutes)
            .set_opt("is_active", request.is_active);

        let query = QueryBuilder::new()
            .eq("id", service_id)
            .eq("organization_id", organization_id);

        self.supabase
            .update(SERVICES_TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Service"))
    }

    pub async fn deactivate_service(
        &self,
        organization_id: Uuid,
        clinic_id: Uuid,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<MedicalService, OrganizationError> {
        self.update_service(
            organization_id,
            clinic_id,
            service_id,
            UpdateMedicalServiceRequest {
                is_active: Some(false),
                ..Default::default()
            },
            auth_token,
        )
        .await
    }

    async fn ensure_service_name_free(
        &self,
        clinic_id: Uuid,
        name_en: &str,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), OrganizationError> {
        if name_en.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new()
            .eq("clinic_id", clinic_id)
            .ilike_exact("name_en", name_en);
        if let Some(id) = exclude_id {
            query = query.neq("id", id);
        }
        if self.supabase.exists(SERVICES_TABLE, query, auth_token).await? {
            return Err(OrganizationError::Conflict(format!(
                "Service '{}' already exists in this clinic",
                name_en
            )));
        }
        Ok(())
    }
}

pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
