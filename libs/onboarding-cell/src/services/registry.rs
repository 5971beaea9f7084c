use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{QueryBuilder, SupabaseClient};

use crate::models::{OnboardingError, PlannedOperation};

/// Database function that runs every planned insert in one transaction.
pub const APPLY_BATCH_RPC: &str = "apply_onboarding_batch";

/// What onboarding needs from storage: uniqueness lookups and an all-or-nothing
/// batch insert.
#[async_trait]
pub trait OnboardingRegistry: Send + Sync {
    async fn slug_taken(&self, slug: &str, auth_token: &str) -> Result<bool, OnboardingError>;

    /// The subset of `licenses` already registered to some clinic.
    async fn licenses_taken(&self, licenses: &[String], auth_token: &str) -> Result<Vec<String>, OnboardingError>;

    async fn apply_batch(&self, operations: &[PlannedOperation], auth_token: &str) -> Result<(), OnboardingError>;
}

pub struct SupabaseRegistry {
    supabase: SupabaseClient,
}

impl SupabaseRegistry {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl OnboardingRegistry for SupabaseRegistry {
    async fn slug_taken(&self, slug: &str, auth_token: &str) -> Result<bool, OnboardingError> {
        let query = QueryBuilder::new().eq("slug", slug);
        Ok(self.supabase.exists("organizations", query, auth_token).await?)
    }

    async fn licenses_taken(&self, licenses: &[String], auth_token: &str) -> Result<Vec<String>, OnboardingError> {
        if licenses.is_empty() {
            return Ok(vec![]);
        }

        let query = QueryBuilder::new()
            .select("license_number")
            .in_list("license_number", licenses);
        let rows: Vec<Value> = self.supabase.select("clinics", &query, auth_token).await?;

        Ok(rows
            .iter()
            .filter_map(|row| row["license_number"].as_str())
            .map(str::to_string)
            .collect())
    }

    async fn apply_batch(&self, operations: &[PlannedOperation], auth_token: &str) -> Result<(), OnboardingError> {
        debug!("Submitting onboarding batch of {} operations", operations.len());

        let payload = json!({
            "operations": operations
                .iter()
                .map(|op| json!({ "table": op.table, "row": op.row }))
                .collect::<Vec<_>>()
        });
        let _: Value = self.supabase.rpc(APPLY_BATCH_RPC, payload, auth_token).await?;
        Ok(())
    }
}
