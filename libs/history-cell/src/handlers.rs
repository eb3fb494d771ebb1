use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AppendHistoryRequest, HistoryError};
use crate::services::history::HistoryService;

fn map_history_error(e: HistoryError) -> AppError {
    match e {
        HistoryError::ValidationError(msg) => AppError::Validation(msg),
        HistoryError::DatabaseError(msg) => AppError::StoreUnavailable(msg),
    }
}

fn authorize_journal_access(user: &User, owner_id: Uuid) -> Result<(), AppError> {
    if user.id != owner_id.to_string() && !user.is_admin() {
        return Err(AppError::Permission(
            "Not authorized to access this journal".to_string(),
        ));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn append_entry(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AppendHistoryRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    authorize_journal_access(&user, user_id)?;

    let history_service = HistoryService::new(&state);

    let entry = history_service
        .append(user_id, request.entry_type, request.payload, Some(token))
        .await
        .map_err(map_history_error)?;

    Ok(Json(json!({
        "success": true,
        "entry": entry
    })))
}

#[axum::debug_handler]
pub async fn list_entries(
    State(state): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    authorize_journal_access(&user, user_id)?;

    let history_service = HistoryService::new(&state);

    let mut entries = history_service
        .list(user_id, Some(token))
        .await
        .map_err(map_history_error)?;

    // Newest first for display; the store makes no ordering promise.
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len()
    })))
}
