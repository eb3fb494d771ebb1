use chrono::Utc;
use regex::Regex;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::jwt::issue_token;
use shared_utils::password::{Argon2Hasher, CredentialHasher};

use crate::models::{
    DirectoryError, DirectoryOverview, LoginRequest, LoginResponse, RegisterRequest,
    UpdateProfileRequest, UserProfile, UserRole, MIN_PASSWORD_LENGTH,
};

const TOKEN_VALID_HOURS: i64 = 24;

pub struct DirectoryService {
    supabase: SupabaseClient,
    hasher: Argon2Hasher,
    jwt_secret: String,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            hasher: Argon2Hasher::new(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    /// Look up a single profile. Reads hit the store directly on every call;
    /// nothing is cached between requests.
    pub async fn find_by_id(
        &self,
        user_id: &str,
        auth_token: Option<&str>,
    ) -> Result<UserProfile, DirectoryError> {
        debug!("Fetching user profile: {}", user_id);

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(DirectoryError::NotFound)?;
        serde_json::from_value(row).map_err(|e| DirectoryError::DatabaseError(e.to_string()))
    }

    pub async fn list_by_role(
        &self,
        role: UserRole,
        auth_token: Option<&str>,
    ) -> Result<Vec<UserProfile>, DirectoryError> {
        debug!("Listing users with role: {}", role);

        let path = format!("/rest/v1/users?user_type=eq.{}&order=username.asc", role);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| DirectoryError::DatabaseError(e.to_string()))
            })
            .collect()
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, DirectoryError> {
        debug!("Registering new {} account: {}", request.role, request.email);

        if !email_is_valid(&request.email) {
            return Err(DirectoryError::InvalidEmail(request.email));
        }
        if request.password.len() < MIN_PASSWORD_LENGTH {
            return Err(DirectoryError::WeakPassword);
        }
        if request.username.trim().is_empty() {
            return Err(DirectoryError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }
        if request.role == UserRole::Doctor && request.specialization.is_none() {
            return Err(DirectoryError::ValidationError(
                "Doctor registration requires a specialization".to_string(),
            ));
        }

        let existing_path = format!("/rest/v1/users?email=eq.{}&select=id", request.email);
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, None, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DirectoryError::DuplicateEmail(request.email));
        }

        let password_hash = self
            .hasher
            .hash_password(&request.password)
            .map_err(DirectoryError::ValidationError)?;

        let mut user_data = json!({
            "username": request.username,
            "email": request.email,
            "password_hash": password_hash,
            "user_type": request.role.to_string(),
            "created_at": Utc::now().to_rfc3339(),
        });

        if request.role == UserRole::Doctor {
            let record = user_data.as_object_mut().ok_or_else(|| {
                DirectoryError::DatabaseError("User payload is not an object".to_string())
            })?;
            record.insert("specialization".to_string(), json!(request.specialization));
            if let Some(experience) = request.experience {
                record.insert("experience".to_string(), json!(experience));
            }
            if let Some(qualification) = &request.qualification {
                record.insert("qualification".to_string(), json!(qualification));
            }
        }

        let created = self
            .supabase
            .insert_returning("/rest/v1/users", None, user_data)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let row = created.into_iter().next().ok_or_else(|| {
            DirectoryError::DatabaseError("Store returned no row for created user".to_string())
        })?;

        let profile: UserProfile =
            serde_json::from_value(row).map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;
        info!("Registered {} account {}", profile.user_type, profile.id);

        Ok(profile)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, DirectoryError> {
        debug!("Login attempt for: {}", request.email);

        let path = format!("/rest/v1/users?email=eq.{}", request.email);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let row = rows.into_iter().next().ok_or(DirectoryError::NotFound)?;

        let stored_hash = row
            .get("password_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DirectoryError::DatabaseError("User row is missing password_hash".to_string())
            })?;

        let verified = self
            .hasher
            .verify_password(stored_hash, &request.password)
            .map_err(DirectoryError::DatabaseError)?;

        if !verified {
            warn!("Failed login attempt for: {}", request.email);
            return Err(DirectoryError::InvalidCredentials);
        }

        let user: UserProfile = serde_json::from_value(row)
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let token = issue_token(
            &user.id.to_string(),
            &user.username,
            &user.email,
            &user.user_type.to_string(),
            &self.jwt_secret,
            TOKEN_VALID_HOURS,
        )
        .map_err(DirectoryError::TokenError)?;

        info!("User {} logged in", user.id);
        Ok(LoginResponse { token, user })
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<UserProfile, DirectoryError> {
        debug!("Updating profile: {}", user_id);

        if request.is_empty() {
            return Err(DirectoryError::ValidationError(
                "No fields to update".to_string(),
            ));
        }

        let mut update_data = Map::new();
        if let Some(username) = request.username {
            if username.trim().is_empty() {
                return Err(DirectoryError::ValidationError(
                    "Username cannot be empty".to_string(),
                ));
            }
            update_data.insert("username".to_string(), json!(username));
        }
        if let Some(email) = request.email {
            if !email_is_valid(&email) {
                return Err(DirectoryError::InvalidEmail(email));
            }
            let existing_path =
                format!("/rest/v1/users?email=eq.{}&id=neq.{}&select=id", email, user_id);
            let existing: Vec<Value> = self
                .supabase
                .request(Method::GET, &existing_path, Some(auth_token), None)
                .await
                .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;
            if !existing.is_empty() {
                return Err(DirectoryError::DuplicateEmail(email));
            }
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization));
        }
        if let Some(experience) = request.experience {
            update_data.insert("experience".to_string(), json!(experience));
        }
        if let Some(qualification) = request.qualification {
            update_data.insert("qualification".to_string(), json!(qualification));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let updated = self
            .supabase
            .update_returning(&path, Some(auth_token), Value::Object(update_data))
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let row = updated.into_iter().next().ok_or(DirectoryError::NotFound)?;
        serde_json::from_value(row).map_err(|e| DirectoryError::DatabaseError(e.to_string()))
    }

    /// The only hard delete in the system; everything else retires records by
    /// status.
    pub async fn delete_user(&self, user_id: &str, auth_token: &str) -> Result<(), DirectoryError> {
        debug!("Deleting user: {}", user_id);

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let deleted = self
            .supabase
            .delete_returning(&path, Some(auth_token))
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(DirectoryError::NotFound);
        }

        info!("Deleted user {}", user_id);
        Ok(())
    }

    pub async fn overview(&self, auth_token: &str) -> Result<DirectoryOverview, DirectoryError> {
        debug!("Computing directory overview counts");

        let patients: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/users?user_type=eq.patient&select=id",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/users?user_type=eq.doctor&select=id",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/appointments?select=id",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        Ok(DirectoryOverview {
            patients: patients.len(),
            doctors: doctors.len(),
            appointments: appointments.len(),
        })
    }
}

fn email_is_valid(email: &str) -> bool {
    let email_regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    email_regex.is_match(email) && email.len() <= 254
}
