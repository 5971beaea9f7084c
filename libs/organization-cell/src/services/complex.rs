use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};
use shared_utils::validation::normalize_name;

use crate::models::{
    Complex, CreateComplexRequest, EntityStatus, OrganizationError, UpdateComplexRequest,
};

const TABLE: &str = "complexes";

pub struct ComplexService {
    supabase: SupabaseClient,
}

impl ComplexService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_complex(
        &self,
        organization_id: Uuid,
        request: CreateComplexRequest,
        auth_token: &str,
    ) -> Result<Complex, OrganizationError> {
        let name_en = normalize_name(&request.name_en);
        debug!("Creating complex '{}' for organization {}", name_en, organization_id);

        if !name_en.is_empty() && self.name_taken(organization_id, &name_en, None, auth_token).await? {
            return Err(OrganizationError::Conflict(format!(
                "A complex named '{}' already exists",
                name_en
            )));
        }

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "name_ar": normalize_name(&request.name_ar),
            "name_en": name_en,
            "address": request.address,
            "city": request.city,
            "phone": request.phone,
            "status": EntityStatus::Active,
            "created_at": now,
            "updated_at": now
        });

        Ok(self.supabase.insert(TABLE, row, auth_token).await?)
    }

    pub async fn get_complex(
        &self,
        organization_id: Uuid,
        complex_id: Uuid,
        auth_token: &str,
    ) -> Result<Complex, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("id", complex_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(TABLE, query, auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Complex"))
    }

    pub async fn list_complexes(
        &self,
        organization_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Complex>, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .order("name_en", true);
        Ok(self.supabase.select(TABLE, &query, auth_token).await?)
    }

    pub async fn update_complex(
        &self,
        organization_id: Uuid,
        complex_id: Uuid,
        request: UpdateComplexRequest,
        auth_token: &str,
    ) -> Result<Complex, OrganizationError> {
        debug!("Updating complex: {}", complex_id);

        let name_en = request.name_en.as_deref().map(normalize_name);
        if let Some(name) = name_en.as_deref() {
            if self.name_taken(organization_id, name, Some(complex_id), auth_token).await? {
                return Err(OrganizationError::Conflict(format!(
                    "A complex named '{}' already exists",
                    name
                )));
            }
        }

        if request.status == Some(EntityStatus::Inactive) {
            self.ensure_no_active_clinics(complex_id, auth_token).await?;
        }

        let patch = Patch::new()
            .set_opt("name_ar", request.name_ar.as_deref().map(normalize_name))
            .set_opt("name_en", name_en)
            .set_opt("address", request.address)
            .set_opt("city", request.city)
            .set_opt("phone", request.phone)
            .set_opt("status", request.status);

        let query = QueryBuilder::new()
            .eq("id", complex_id)
            .eq("organization_id", organization_id);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Complex"))
    }

    /// Soft delete; refused while active clinics still belong to the complex.
    pub async fn delete_complex(
        &self,
        organization_id: Uuid,
        complex_id: Uuid,
        auth_token: &str,
    ) -> Result<Complex, OrganizationError> {
        self.update_complex(
            organization_id,
            complex_id,
            UpdateComplexRequest {
                status: Some(EntityStatus::Inactive),
                ..Default::default()
            },
            auth_token,
        )
        .await
    }

    async fn ensure_no_active_clinics(&self, complex_id: Uuid, auth_token: &str) -> Result<(), OrganizationError> {
        let query = QueryBuilder::new()
            .eq("complex_id", complex_id)
            .eq("status", EntityStatus::Active);

        if self.supabase.exists("clinics", query, auth_token).await? {
            warn!("Refusing to deactivate complex {} with active clinics", complex_id);
            return Err(OrganizationError::Conflict(
                "Complex still has active clinics".to_string(),
            ));
        }
        Ok(())
    }

    async fn name_taken(
        &self,
        organization_id: Uuid,
        name_en: &str,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, OrganizationError> {
        let mut query = QueryBuilder::new()
            .eq("organization_id", organization_id)
            .ilike_exact("name_en", name_en);
        if let Some(id) = exclude_id {
            query = query.neq("id", id);
        }
        Ok(self.supabase.exists(TABLE, query, auth_token).await?)
    }
}
