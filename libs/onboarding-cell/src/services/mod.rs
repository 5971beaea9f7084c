pub mod onboarding;
pub mod plan;
pub mod registry;

pub use onboarding::OnboardingService;
pub use registry::{OnboardingRegistry, SupabaseRegistry};
