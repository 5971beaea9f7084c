use std::sync::Arc;

use axum::Extension;
use axum_extra::TypedHeader;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use headers::{Authorization, authorization::Bearer};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Point the database client at a running mock server.
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub organization_id: Option<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "admin".to_string(),
            organization_id: Some(Uuid::new_v4()),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            organization_id: Some(Uuid::new_v4()),
        }
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, "receptionist")
    }

    pub fn accountant(email: &str) -> Self {
        Self::new(email, "accountant")
    }

    pub fn super_admin(email: &str) -> Self {
        Self {
            organization_id: None,
            ..Self::new(email, "super_admin")
        }
    }

    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn without_organization(mut self) -> Self {
        self.organization_id = None;
        self
    }

    pub fn org(&self) -> Uuid {
        self.organization_id.unwrap_or_default()
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            organization_id: self.organization_id,
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn extension(&self) -> Extension<User> {
        Extension(self.to_user())
    }
}

pub fn auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).expect("valid bearer token"))
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": {
                "role": user.role,
                "organization_id": user.organization_id.map(|id| id.to_string()),
            },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row shapes as PostgREST would return them.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn organization(id: Uuid, slug: &str) -> Value {
        json!({
            "id": id,
            "name_ar": "مجمع النور الطبي",
            "name_en": "Al Noor Medical",
            "slug": slug,
            "email": "info@alnoor.test",
            "phone": "+966501234567",
            "owner_id": Uuid::new_v4(),
            "status": "active",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn complex(id: Uuid, organization_id: Uuid) -> Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "name_ar": "المجمع الرئيسي",
            "name_en": "Main Complex",
            "address": "King Fahd Road",
            "city": "Riyadh",
            "phone": null,
            "status": "active",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn department(id: Uuid, organization_id: Uuid, complex_id: Uuid, code: &str) -> Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "complex_id": complex_id,
            "name_ar": "طب الأسنان",
            "name_en": "Dentistry",
            "code": code,
            "description": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn clinic(id: Uuid, organization_id: Uuid, session_minutes: i32) -> Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "complex_id": null,
            "department_id": null,
            "name_ar": "عيادة الأسنان",
            "name_en": "Dental Clinic",
            "license_number": "LIC-001",
            "phone": "+966501234567",
            "email": null,
            "session_duration_minutes": session_minutes,
            "status": "active",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn clinic_service(id: Uuid, organization_id: Uuid, clinic_id: Uuid, duration: i32, price: f64) -> Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "clinic_id": clinic_id,
            "name_ar": "تنظيف الأسنان",
            "name_en": "Teeth Cleaning",
            "price": price,
            "duration_minutes": duration,
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn doctor(id: Uuid, organization_id: Uuid, clinic_id: Uuid, session_minutes: Option<i32>) -> Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "clinic_id": clinic_id,
            "user_id": null,
            "first_name": "Huda",
            "last_name": "Al-Qahtani",
            "specialty": "Dentistry",
            "session_duration_minutes": session_minutes,
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn working_hours(
        organization_id: Uuid,
        owner_type: &str,
        owner_id: Uuid,
        day_of_week: i32,
        open: &str,
        close: &str,
        break_window: Option<(&str, &str)>,
    ) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "organization_id": organization_id,
            "owner_type": owner_type,
            "owner_id": owner_id,
            "day_of_week": day_of_week,
            "is_working": true,
            "open_time": open,
            "close_time": close,
            "break_start": break_window.map(|b| b.0),
            "break_end": break_window.map(|b| b.1),
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn patient(id: Uuid, organization_id: Uuid, phone: &str) -> Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "first_name": "Omar",
            "last_name": "Haddad",
            "email": "omar@example.com",
            "phone": phone,
            "national_id": "1023456789",
            "date_of_birth": "1990-05-14",
            "gender": "male",
            "blood_type": null,
            "address": null,
            "allergies": null,
            "chronic_conditions": null,
            "emergency_contact_name": null,
            "emergency_contact_phone": null,
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn appointment(
        id: Uuid,
        organization_id: Uuid,
        clinic_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        start: DateTime<Utc>,
        minutes: i64,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "clinic_id": clinic_id,
            "doctor_id": doctor_id,
            "patient_id": patient_id,
            "service_id": null,
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::minutes(minutes)).to_rfc3339(),
            "duration_minutes": minutes,
            "status": status,
            "notes": null,
            "cancellation_reason": null,
            "created_by": Uuid::new_v4(),
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
