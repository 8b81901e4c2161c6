use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub app_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            app_url: "http://localhost:3333".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing the database gateway at a mock server.
    pub fn with_supabase_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            app_url: self.app_url.clone(),
            port: 3333,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub provider: bool,
}

impl TestUser {
    pub fn new(id: i64, name: &str, provider: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: format!("user{}@example.com", id),
            provider,
        }
    }

    pub fn provider(id: i64) -> Self {
        Self::new(id, &format!("Provider {}", id), true)
    }

    pub fn client(id: i64) -> Self {
        Self::new(id, &format!("Client {}", id), false)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.clone()),
            role: Some("authenticated".to_string()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        Self::sign(&user.id.to_string(), &user.email, secret, exp_hours)
    }

    /// Token whose subject is an arbitrary string rather than a user id.
    pub fn create_token_for_subject(subject: &str, secret: &str) -> String {
        Self::sign(subject, "subject@example.com", secret, None)
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

    fn sign(subject: &str, email: &str, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": subject,
            "email": email,
            "role": "authenticated",
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
}

/// PostgREST row shapes returned by the mocked Supabase endpoints.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn provider_response(user: &TestUser) -> Value {
        json!({
            "id": user.id,
            "name": user.name,
            "provider": user.provider
        })
    }

    pub fn provider_profile_response(user: &TestUser, avatar_id: Option<i64>) -> Value {
        json!({
            "id": user.id,
            "name": user.name,
            "avatar_id": avatar_id
        })
    }

    pub fn file_response(file_id: i64, path: &str) -> Value {
        json!({
            "id": file_id,
            "path": path
        })
    }

    pub fn appointment_summary_response(id: i64, date: &str, provider_id: i64) -> Value {
        json!({
            "id": id,
            "date": date,
            "provider_id": provider_id
        })
    }

    pub fn appointment_response(id: i64, user_id: i64, provider_id: i64, date: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "provider_id": provider_id,
            "date": date,
            "canceled_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
