use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, InferenceMode};
use shared_models::auth::User;

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub store_url: String,
    pub store_anon_key: String,
    pub classifier_api_url: String,
    pub chat_api_url: String,
    pub vision_api_url: String,
    pub transcribe_api_url: String,
    pub inference_mode: InferenceMode,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            store_url: "http://localhost:54321".to_string(),
            store_anon_key: "test-anon-key".to_string(),
            classifier_api_url: "http://localhost:54330/classify".to_string(),
            chat_api_url: "http://localhost:54331/v1/chat/completions".to_string(),
            vision_api_url: "http://localhost:54332/v1/analyze".to_string(),
            transcribe_api_url: "http://localhost:54333/v1/transcribe".to_string(),
            inference_mode: InferenceMode::Classifier,
        }
    }
}

impl TestConfig {
    /// Point every external collaborator at a single wiremock server.
    pub fn with_mock_server(url: &str) -> Self {
        Self {
            store_url: url.to_string(),
            classifier_api_url: format!("{}/classify", url),
            chat_api_url: format!("{}/v1/chat/completions", url),
            vision_api_url: format!("{}/v1/analyze", url),
            transcribe_api_url: format!("{}/v1/transcribe", url),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_anon_key: self.store_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            classifier_api_url: self.classifier_api_url.clone(),
            chat_api_url: self.chat_api_url.clone(),
            chat_api_key: "test-chat-key".to_string(),
            chat_model: "test-model".to_string(),
            vision_api_url: self.vision_api_url.clone(),
            vision_api_key: "test-vision-key".to_string(),
            transcribe_api_url: self.transcribe_api_url.clone(),
            video_room_base_url: "https://meet.test.example".to_string(),
            inference_mode: self.inference_mode,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(username: &str, email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(username: &str) -> Self {
        Self::new(username, &format!("{}@example.com", username), "doctor")
    }

    pub fn patient(username: &str) -> Self {
        Self::new(username, &format!("{}@example.com", username), "patient")
    }

    pub fn admin(username: &str) -> Self {
        Self::new(username, &format!("{}@example.com", username), "admin")
    }

    pub fn token(&self, secret: &str) -> String {
        JwtTestUtils::create_test_token(self, secret, Some(24))
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            username: Some(self.username.clone()),
            created_at: Some(chrono::Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, valid_hours: Option<i64>) -> String {
        issue_token(
            &user.id,
            &user.username,
            &user.email,
            &user.role,
            secret,
            valid_hours.unwrap_or(24),
        )
        .expect("test token")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }
}

/// Canned store rows for wiremock fixtures.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn user_row(id: &str, username: &str, email: &str, user_type: &str) -> serde_json::Value {
        json!({
            "id": id,
            "username": username,
            "email": email,
            "password_hash": "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$c29tZWhhc2g",
            "user_type": user_type,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(id: &str, username: &str, specialization: &str) -> serde_json::Value {
        json!({
            "id": id,
            "username": username,
            "email": format!("{}@example.com", username),
            "password_hash": "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$c29tZWhhc2g",
            "user_type": "doctor",
            "specialization": specialization,
            "experience": 8,
            "qualification": "MBBS, MD",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "time": time,
            "symptoms": "fever",
            "status": status,
            "version": 1,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn history_row(user_id: &str, entry_type: &str, timestamp: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "entry_type": entry_type,
            "timestamp": timestamp,
            "payload": { "note": "fixture" }
        })
    }

    pub fn blog_row(id: &str, title: &str, author_id: &str, views: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "content": "Lorem ipsum",
            "author_id": author_id,
            "category": "Holistic Health",
            "created_at": "2024-01-01T00:00:00Z",
            "views": views
        })
    }
}
