use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt;

use crate::models::{DirectoryError, LoginRequest, RegisterRequest, UpdateProfileRequest, UserRole};
use crate::services::directory::DirectoryService;

fn map_directory_error(e: DirectoryError) -> AppError {
    match e {
        DirectoryError::NotFound => AppError::NotFound("User not found".to_string()),
        DirectoryError::DuplicateEmail(email) => {
            AppError::Validation(format!("An account with email {} already exists", email))
        }
        DirectoryError::InvalidEmail(email) => {
            AppError::Validation(format!("Invalid email address: {}", email))
        }
        DirectoryError::WeakPassword => AppError::Validation(e.to_string()),
        DirectoryError::InvalidCredentials => AppError::Auth("Invalid email or password".to_string()),
        DirectoryError::ValidationError(msg) => AppError::Validation(msg),
        DirectoryError::TokenError(msg) => AppError::Internal(msg),
        DirectoryError::DatabaseError(msg) => AppError::StoreUnavailable(msg),
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    let directory_service = DirectoryService::new(&state);

    let profile = directory_service
        .register(request)
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
        "message": "Registration successful"
    })))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let directory_service = DirectoryService::new(&state);

    let response = directory_service
        .login(request)
        .await
        .map_err(|e| match e {
            DirectoryError::NotFound => {
                AppError::NotFound("No account with this email".to_string())
            }
            other => map_directory_error(other),
        })?;

    Ok(Json(json!({
        "success": true,
        "token": response.token,
        "user": response.user
    })))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match jwt::validate_token(&token, &config.jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_me(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let directory_service = DirectoryService::new(&state);

    let profile = directory_service
        .find_by_id(&user.id, Some(token))
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let directory_service = DirectoryService::new(&state);

    let profile = directory_service
        .find_by_id(&user_id.to_string(), Some(token))
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let directory_service = DirectoryService::new(&state);

    let doctors = directory_service
        .list_by_role(UserRole::Doctor, Some(token))
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_self = user_id.to_string() == user.id;
    if !is_self && !user.is_admin() {
        return Err(AppError::Permission(
            "Not authorized to update this profile".to_string(),
        ));
    }

    let directory_service = DirectoryService::new(&state);

    let profile = directory_service
        .update_profile(&user_id.to_string(), request, token)
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
        "message": "Profile updated"
    })))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Permission(
            "Only administrators can delete accounts".to_string(),
        ));
    }

    let directory_service = DirectoryService::new(&state);

    directory_service
        .delete_user(&user_id.to_string(), token)
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Account deleted"
    })))
}

#[axum::debug_handler]
pub async fn admin_overview(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Permission(
            "Only administrators can view the overview".to_string(),
        ));
    }

    let directory_service = DirectoryService::new(&state);

    let overview = directory_service
        .overview(token)
        .await
        .map_err(map_directory_error)?;

    Ok(Json(json!(overview)))
}
