use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AnalyzeReportRequest, ChatRequest, PredictionRequest, TranscribeRequest, TriageError,
};
use crate::services::chat::ChatService;
use crate::services::inference::InferenceService;
use crate::services::report::ReportAnalysisService;
use crate::services::transcribe::TranscriptionService;

fn map_triage_error(e: TriageError) -> AppError {
    match e {
        TriageError::ValidationError(msg) => AppError::Validation(msg),
        TriageError::UpstreamAi(msg) => AppError::UpstreamAi(msg),
        TriageError::NotConfigured(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn predict_disease(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_patient() {
        return Err(AppError::Permission(
            "Symptom inference is available only to patients".to_string(),
        ));
    }

    let token = auth.token();
    let inference_service = InferenceService::new(&state);

    let report = inference_service
        .predict(&user, request, token)
        .await
        .map_err(map_triage_error)?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn analyze_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AnalyzeReportRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let report_service = ReportAnalysisService::new(&state);

    let analysis = report_service
        .analyze(&user, request, token)
        .await
        .map_err(map_triage_error)?;

    Ok(Json(json!(analysis)))
}

#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let chat_service = ChatService::new(&state);

    let reply = chat_service
        .converse(&user, request, token)
        .await
        .map_err(map_triage_error)?;

    Ok(Json(json!(reply)))
}

#[axum::debug_handler]
pub async fn transcribe_audio(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<TranscribeRequest>,
) -> Result<Json<Value>, AppError> {
    let transcription_service = TranscriptionService::new(&state);

    let transcript = transcription_service
        .transcribe(request)
        .await
        .map_err(map_triage_error)?;

    Ok(Json(json!(transcript)))
}
