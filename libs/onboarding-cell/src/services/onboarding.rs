use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::validation::Validate;

use crate::models::{OnboardingError, OnboardingPlan, OnboardingRequest, OnboardingResult};
use crate::services::plan::{build_plan, payload_licenses};
use crate::services::registry::{OnboardingRegistry, SupabaseRegistry};

pub struct OnboardingService<R = SupabaseRegistry> {
    registry: R,
    default_session_minutes: i32,
}

impl OnboardingService<SupabaseRegistry> {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_registry(SupabaseRegistry::new(config), config.default_session_minutes)
    }
}

impl<R: OnboardingRegistry> OnboardingService<R> {
    pub fn with_registry(registry: R, default_session_minutes: i32) -> Self {
        Self {
            registry,
            default_session_minutes,
        }
    }

    /// Validate the payload and produce the ordered inserts without writing.
    pub async fn plan(
        &self,
        owner_id: Uuid,
        request: &OnboardingRequest,
        auth_token: &str,
    ) -> Result<OnboardingPlan, OnboardingError> {
        request.validate()?;

        let plan = build_plan(request, owner_id, self.default_session_minutes, &Utc::now().to_rfc3339())?;

        let slug = &request.organization.slug;
        if self.registry.slug_taken(slug, auth_token).await? {
            warn!("Onboarding rejected: slug '{}' is taken", slug);
            return Err(OnboardingError::SlugTaken(slug.clone()));
        }

        let licenses = payload_licenses(request);
        if let Some(taken) = self.registry.licenses_taken(&licenses, auth_token).await?.into_iter().next() {
            return Err(OnboardingError::LicenseTaken(taken));
        }

        Ok(plan)
    }

    /// Create the whole organization in one transaction.
    pub async fn onboard(
        &self,
        owner_id: Uuid,
        request: &OnboardingRequest,
        auth_token: &str,
    ) -> Result<OnboardingResult, OnboardingError> {
        let plan = self.plan(owner_id, request, auth_token).await?;
        self.registry.apply_batch(&plan.operations, auth_token).await?;

        info!(
            "Onboarded organization '{}' ({}) with {} rows",
            request.organization.slug,
            plan.ids.organization,
            plan.operations.len()
        );
        Ok(OnboardingResult {
            organization_id: plan.ids.organization,
            rows_created: plan.operations.len(),
            ids: plan.ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use organization_cell::models::CreateOrganizationRequest;

    use crate::models::{ClinicDraft, PlannedOperation};

    #[derive(Default)]
    struct FakeRegistry {
        taken_slugs: Vec<String>,
        taken_licenses: Vec<String>,
        applied: Mutex<Vec<PlannedOperation>>,
    }

    #[async_trait]
    impl OnboardingRegistry for FakeRegistry {
        async fn slug_taken(&self, slug: &str, _: &str) -> Result<bool, OnboardingError> {
            Ok(self.taken_slugs.iter().any(|s| s == slug))
        }

        async fn licenses_taken(&self, licenses: &[String], _: &str) -> Result<Vec<String>, OnboardingError> {
            Ok(licenses.iter().filter(|l| self.taken_licenses.contains(*l)).cloned().collect())
        }

        async fn apply_batch(&self, operations: &[PlannedOperation], _: &str) -> Result<(), OnboardingError> {
            self.applied.lock().unwrap().extend_from_slice(operations);
            Ok(())
        }
    }

    fn request() -> OnboardingRequest {
        OnboardingRequest {
            organization: CreateOrganizationRequest {
                name_ar: "نور".into(),
                name_en: "Noor".into(),
                slug: "noor".into(),
                email: Some("admin@noor.test".into()),
                phone: None,
            },
            complexes: vec![],
            departments: vec![],
            clinics: vec![ClinicDraft {
                key: "main".into(),
                complex_key: None,
                department_key: None,
                name_ar: "عيادة".into(),
                name_en: "Main".into(),
                license_number: Some("LIC-9".into()),
                phone: None,
                email: None,
                session_duration_minutes: Some(20),
            }],
            services: vec![],
            working_hours: vec![],
        }
    }

    #[tokio::test]
    async fn onboard_applies_plan() {
        let service = OnboardingService::with_registry(FakeRegistry::default(), 30);
        let result = service.onboard(Uuid::new_v4(), &request(), "token").await.unwrap();

        assert_eq!(result.rows_created, 2);
        let applied = service.registry.applied.lock().unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[1].row["organization_id"], serde_json::json!(result.organization_id));
    }

    #[tokio::test]
    async fn taken_slug_stops_before_writing() {
        let registry = FakeRegistry {
            taken_slugs: vec!["noor".into()],
            ..Default::default()
        };
        let service = OnboardingService::with_registry(registry, 30);

        assert_matches!(
            service.onboard(Uuid::new_v4(), &request(), "token").await,
            Err(OnboardingError::SlugTaken(slug)) if slug == "noor"
        );
        assert!(service.registry.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registered_license_conflicts() {
        let registry = FakeRegistry {
            taken_licenses: vec!["LIC-9".into()],
            ..Default::default()
        };
        let service = OnboardingService::with_registry(registry, 30);

        assert_matches!(
            service.plan(Uuid::new_v4(), &request(), "token").await,
            Err(OnboardingError::LicenseTaken(license)) if license == "LIC-9"
        );
    }

    #[tokio::test]
    async fn invalid_slug_fails_validation() {
        let mut req = request();
        req.organization.slug = "Not A Slug".into();
        let service = OnboardingService::with_registry(FakeRegistry::default(), 30);

        assert_matches!(
            service.plan(Uuid::new_v4(), &req, "token").await,
            Err(OnboardingError::Validation(errors)) if errors.has_field("organization.slug")
        );
    }
}
