use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
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
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            environment: "development".to_string(),
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
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "customer".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn customer(email: &str) -> Self {
        Self::new(email, "customer")
    }

    pub fn provider(email: &str) -> Self {
        Self::new(email, "provider")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
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
            "role": user.role,
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
}

/// Canned PostgREST row payloads matching the application tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn service_row(id: i64, name: &str, duration_hours: i32) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "description": format!("{} description", name),
            "duration_hours": duration_hours,
            "price": 100,
            "requirements": ["valid photo id"],
            "disclaimers": ["results may vary"]
        })
    }

    pub fn provider_row(id: i64, display_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": Uuid::new_v4().to_string(),
            "display_name": display_name,
            "provider_type": "general"
        })
    }

    pub fn provider_row_for_user(id: i64, display_name: &str, user_id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": user_id,
            "display_name": display_name,
            "provider_type": "general"
        })
    }

    pub fn provider_service_row(id: i64, provider_id: i64, service_id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "provider_id": provider_id,
            "service_id": service_id
        })
    }

    pub fn customer_row(user_id: &str, email: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "email": email,
            "full_name": "Test Customer"
        })
    }

    pub fn appointment_row(
        id: i64,
        customer_id: &str,
        provider_id: i64,
        service_id: i64,
        date_time: DateTime<Utc>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "customer_id": customer_id,
            "provider_id": provider_id,
            "service_id": service_id,
            "date_time": date_time.to_rfc3339(),
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }
}
