use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};
use shared_models::response::Pagination;
use shared_utils::validation::normalize_name;

use crate::models::{
    CreateOrganizationRequest, Organization, OrganizationError, OrganizationListQuery,
    OrganizationStatus, UpdateOrganizationRequest,
};

const TABLE: &str = "organizations";

pub struct OrganizationService {
    supabase: SupabaseClient,
}

impl OrganizationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_organization(
        &self,
        request: CreateOrganizationRequest,
        owner_id: Uuid,
        auth_token: &str,
    ) -> Result<Organization, OrganizationError> {
        debug!("Creating organization with slug: {}", request.slug);

        if self.slug_taken(&request.slug, auth_token).await? {
            warn!("Organization slug already in use: {}", request.slug);
            return Err(OrganizationError::Conflict(format!(
                "Organization slug '{}' is already in use",
                request.slug
            )));
        }

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "id": Uuid::new_v4(),
            "name_ar": normalize_name(&request.name_ar),
            "name_en": normalize_name(&request.name_en),
            "slug": request.slug,
            "email": request.email,
            "phone": request.phone,
            "owner_id": owner_id,
            "status": OrganizationStatus::Active,
            "created_at": now,
            "updated_at": now
        });

        let organization: Organization = self.supabase.insert(TABLE, row, auth_token).await?;
        debug!("Organization created with ID: {}", organization.id);
        Ok(organization)
    }

    pub async fn get_organization(
        &self,
        organization_id: Uuid,
        auth_token: &str,
    ) -> Result<Organization, OrganizationError> {
        self.supabase
            .select_one(TABLE, QueryBuilder::new().eq("id", organization_id), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Organization"))
    }

    pub async fn update_organization(
        &self,
        organization_id: Uuid,
        request: UpdateOrganizationRequest,
        auth_token: &str,
    ) -> Result<Organization, OrganizationError> {
        debug!("Updating organization: {}", organization_id);

        let patch = Patch::new()
            .set_opt("name_ar", request.name_ar.as_deref().map(normalize_name))
            .set_opt("name_en", request.name_en.as_deref().map(normalize_name))
            .set_opt("email", request.email)
            .set_opt("phone", request.phone);

        self.supabase
            .update(TABLE, &QueryBuilder::new().eq("id", organization_id), patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Organization"))
    }

    pub async fn set_status(
        &self,
        organization_id: Uuid,
        status: OrganizationStatus,
        auth_token: &str,
    ) -> Result<Organization, OrganizationError> {
        debug!("Setting organization {} status to {}", organization_id, status);

        let patch = Patch::new().set("status", status);
        self.supabase
            .update(TABLE, &QueryBuilder::new().eq("id", organization_id), patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Organization"))
    }

    pub async fn list_organizations(
        &self,
        query: OrganizationListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Organization>, Pagination), OrganizationError> {
        let page = Pagination::from_query(query.limit, query.offset);
        let mut filter = QueryBuilder::new();
        if let Some(status) = query.status {
            filter = filter.eq("status", status);
        }
        let filter = filter.order("created_at", false).limit(page.limit).offset(page.offset);

        let organizations = self.supabase.select(TABLE, &filter, auth_token).await?;
        Ok((organizations, page))
    }

    pub async fn slug_taken(&self, slug: &str, auth_token: &str) -> Result<bool, OrganizationError> {
        Ok(self.supabase.exists(TABLE, QueryBuilder::new().eq("slug", slug), auth_token).await?)
    }
}
