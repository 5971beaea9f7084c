use chrono::Utc;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{Patch, QueryBuilder, SupabaseClient};
use shared_utils::validation::normalize_name;

use crate::models::{
    CreateDepartmentRequest, Department, OrganizationError, UpdateDepartmentRequest,
};

const TABLE: &str = "departments";

pub struct DepartmentService {
    supabase: SupabaseClient,
}

impl DepartmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_department(
        &self,
        organization_id: Uuid,
        request: CreateDepartmentRequest,
        auth_token: &str,
    ) -> Result<Department, OrganizationError> {
        debug!("Creating department {} under complex {}", request.code, request.complex_id);

        let complex_exists = self.supabase.exists(
            "complexes",
            QueryBuilder::new()
                .eq("id", request.complex_id)
                .eq("organization_id", organization_id),
            auth_token,
        ).await?;
        if !complex_exists {
            return Err(OrganizationError::NotFound("Complex"));
        }

        let code = request.code.trim().to_uppercase();
        let code_taken = self.supabase.exists(
            TABLE,
            QueryBuilder::new()
                .eq("complex_id", request.complex_id)
                .eq("code", &code),
            auth_token,
        ).await?;
        if code_taken {
            return Err(OrganizationError::Conflict(format!(
                "Department code '{}' already exists in this complex",
                code
            )));
        }

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "complex_id": request.complex_id,
            "name_ar": normalize_name(&request.name_ar),
            "name_en": normalize_name(&request.name_en),
            "code": code,
            "description": request.description,
            "created_at": now,
            "updated_at": now
        });

        Ok(self.supabase.insert(TABLE, row, auth_token).await?)
    }

    pub async fn get_department(
        &self,
        organization_id: Uuid,
        department_id: Uuid,
        auth_token: &str,
    ) -> Result<Department, OrganizationError> {
        let query = QueryBuilder::new()
            .eq("id", department_id)
            .eq("organization_id", organization_id);

        self.supabase
            .select_one(TABLE, query, auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Department"))
    }

    pub async fn list_departments(
        &self,
        organization_id: Uuid,
        complex_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Department>, OrganizationError> {
        let mut query = QueryBuilder::new().eq("organization_id", organization_id);
        if let Some(complex_id) = complex_id {
            query = query.eq("complex_id", complex_id);
        }
        let query = query.order("code", true);

        Ok(self.supabase.select(TABLE, &query, auth_token).await?)
    }

    pub async fn update_department(
        &self,
        organization_id: Uuid,
        department_id: Uuid,
        request: UpdateDepartmentRequest,
        auth_token: &str,
    ) -> Result<Department, OrganizationError> {
        let patch = Patch::new()
            .set_opt("name_ar", request.name_ar.as_deref().map(normalize_name))
            .set_opt("name_en", request.name_en.as_deref().map(normalize_name))
            .set_opt("description", request.description);

        let query = QueryBuilder::new()
            .eq("id", department_id)
            .eq("organization_id", organization_id);

        self.supabase
            .update(TABLE, &query, patch.into_value(), auth_token)
            .await?
            .ok_or(OrganizationError::NotFound("Department"))
    }

    pub async fn delete_department(
        &self,
        organization_id: Uuid,
        department_id: Uuid,
        auth_token: &str,
    ) -> Result<(), OrganizationError> {
        self.get_department(organization_id, department_id, auth_token).await?;

        let in_use = self.supabase.exists(
            "clinics",
            QueryBuilder::new().eq("department_id", department_id),
            auth_token,
        ).await?;
        if in_use {
            return Err(OrganizationError::Conflict(
                "Department is still referenced by clinics".to_string(),
            ));
        }

        let query = QueryBuilder::new()
            .eq("id", department_id)
            .eq("organization_id", organization_id);
        self.supabase.delete(TABLE, &query, auth_token).await?;
        Ok(())
    }
}
