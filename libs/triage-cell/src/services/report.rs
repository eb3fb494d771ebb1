use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use directory_cell::models::UserRole;
use directory_cell::services::directory::DirectoryService;
use history_cell::models::HistoryEntryType;
use history_cell::services::history::HistoryService;
use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{
    AnalyzeReportRequest, DoctorSuggestion, ReportAnalysis, TriageError,
};
use crate::services::extract::{decode_base64_payload, extract_json, split_data_url};

const REPORT_PROMPT: &str = "Analyze this medical report and suggest the top 1-2 doctor \
    specializations to consult, and explain why. Respond ONLY in this JSON format: \
    {\"specializations\": [\"specialization1\", ...], \"explanation\": \"...\"}";

/// Sends an uploaded report to the vision analyzer and turns its reply into
/// specialization suggestions. Doctor matching is an enhancement on top: a
/// directory failure empties the suggestion list without failing the
/// analysis.
pub struct ReportAnalysisService {
    client: Client,
    api_url: String,
    api_key: String,
    directory: DirectoryService,
    history: HistoryService,
}

#[derive(Deserialize)]
struct VisionReply {
    text: String,
}

impl ReportAnalysisService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.vision_api_url.clone(),
            api_key: config.vision_api_key.clone(),
            directory: DirectoryService::new(config),
            history: HistoryService::new(config),
        }
    }

    pub async fn analyze(
        &self,
        user: &User,
        request: AnalyzeReportRequest,
        auth_token: &str,
    ) -> Result<ReportAnalysis, TriageError> {
        if self.api_url.is_empty() {
            return Err(TriageError::NotConfigured(
                "Vision analyzer endpoint not configured".to_string(),
            ));
        }

        let (url_mime, payload) = split_data_url(&request.file_data);
        let file_bytes = decode_base64_payload(payload)?;
        if file_bytes.is_empty() {
            return Err(TriageError::ValidationError(
                "Uploaded report is empty".to_string(),
            ));
        }
        let mime_type = request
            .mime_type
            .clone()
            .or_else(|| url_mime.map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        debug!("Analyzing report of {} bytes ({})", file_bytes.len(), mime_type);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "prompt": REPORT_PROMPT,
                "mime_type": mime_type,
                "file_data": BASE64.encode(&file_bytes),
            }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TriageError::UpstreamAi(format!("HTTP {}: {}", status, text)));
        }

        let reply: VisionReply = serde_json::from_str(&text)
            .map_err(|e| TriageError::UpstreamAi(format!("Unparseable analyzer reply: {}", e)))?;

        let parsed = extract_json(&reply.text).ok_or_else(|| {
            TriageError::UpstreamAi("No JSON object in analyzer reply".to_string())
        })?;
        let specializations: Vec<String> = parsed
            .get("specializations")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if specializations.is_empty() {
            return Err(TriageError::UpstreamAi(
                "No specialization could be extracted from the analyzer reply".to_string(),
            ));
        }
        let explanation = parsed
            .get("explanation")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let suggested_doctors = self.match_doctors(&specializations, auth_token).await;

        let history_recorded = match Uuid::parse_str(&user.id) {
            Ok(user_id) => {
                let payload = json!({
                    "specializations": specializations,
                    "explanation": explanation,
                });
                match self
                    .history
                    .append(user_id, HistoryEntryType::ReportAnalysis, payload, Some(auth_token))
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("History append for report analysis failed: {}", e);
                        false
                    }
                }
            }
            Err(_) => {
                warn!("User id {} is not a valid journal key", user.id);
                false
            }
        };

        Ok(ReportAnalysis {
            specializations,
            explanation,
            suggested_doctors,
            history_recorded,
        })
    }

    async fn match_doctors(
        &self,
        specializations: &[String],
        auth_token: &str,
    ) -> Vec<DoctorSuggestion> {
        let doctors = match self
            .directory
            .list_by_role(UserRole::Doctor, Some(auth_token))
            .await
        {
            Ok(doctors) => doctors,
            Err(e) => {
                warn!("Doctor matching skipped, directory unavailable: {}", e);
                return Vec::new();
            }
        };

        doctors
            .into_iter()
            .filter(|doctor| {
                let offered = doctor
                    .specialization
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase();
                specializations
                    .iter()
                    .any(|wanted| offered.contains(&wanted.to_lowercase()))
            })
            .map(|doctor| DoctorSuggestion {
                id: doctor.id,
                username: doctor.username,
                specialization: doctor
                    .specialization
                    .unwrap_or_else(|| "General".to_string()),
            })
            .collect()
    }
}
