use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How many ranked predictions are returned to the caller.
pub const TOP_PREDICTIONS: usize = 5;

/// Completion budget for chat and prompt-backed inference calls.
pub const MAX_COMPLETION_TOKENS: u32 = 512;

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    pub symptoms: Vec<String>,
    /// Optional flavoring for prompt-backed inference; ignored by the
    /// classifier backend.
    #[serde(default)]
    pub specialization_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseasePrediction {
    pub label: String,
    pub probability: f64,
}

/// What an inference backend hands back before journaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPredictions {
    pub predictions: Vec<DiseasePrediction>,
    #[serde(default)]
    pub unrecognized_symptoms: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionReport {
    pub predictions: Vec<DiseasePrediction>,
    pub unrecognized_symptoms: Vec<String>,
    pub history_recorded: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeReportRequest {
    /// Base64-encoded report contents; bare base64 or a data URL.
    pub file_data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorSuggestion {
    pub id: Uuid,
    pub username: String,
    pub specialization: String,
}

#[derive(Debug, Serialize)]
pub struct ReportAnalysis {
    pub specializations: Vec<String>,
    pub explanation: String,
    pub suggested_doctors: Vec<DoctorSuggestion>,
    pub history_recorded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// The client resends the whole conversation each turn; no conversation
/// state is held server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub history_recorded: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeRequest {
    /// Base64-encoded audio; bare base64 or a data URL.
    pub audio_data: String,
}

#[derive(Debug, Serialize)]
pub struct Transcript {
    pub text: String,
}

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Upstream AI error: {0}")]
    UpstreamAi(String),

    #[error("AI endpoint not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for TriageError {
    fn from(err: reqwest::Error) -> Self {
        TriageError::UpstreamAi(err.to_string())
    }
}
