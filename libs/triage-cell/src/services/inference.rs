use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use history_cell::models::HistoryEntryType;
use history_cell::services::history::HistoryService;
use shared_config::{AppConfig, InferenceMode};
use shared_models::auth::User;

use crate::models::{
    DiseasePrediction, PredictionReport, PredictionRequest, RankedPredictions, TriageError,
    MAX_COMPLETION_TOKENS, TOP_PREDICTIONS,
};
use crate::services::extract::extract_json;

/// One way of turning a symptom list into ranked disease predictions.
/// Implementations are selected by configuration, not by the caller.
#[async_trait]
pub trait SymptomInferer: Send + Sync {
    async fn infer(
        &self,
        symptoms: &[String],
        specialization_hint: Option<&str>,
    ) -> Result<RankedPredictions, TriageError>;
}

/// Posts the symptom list to the dedicated disease-classifier endpoint.
/// The classifier owns the symptom vocabulary, so it reports back any
/// symptom it did not recognize.
pub struct ClassifierInferer {
    client: Client,
    api_url: String,
}

impl ClassifierInferer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.classifier_api_url.clone(),
        }
    }
}

#[async_trait]
impl SymptomInferer for ClassifierInferer {
    async fn infer(
        &self,
        symptoms: &[String],
        _specialization_hint: Option<&str>,
    ) -> Result<RankedPredictions, TriageError> {
        if self.api_url.is_empty() {
            return Err(TriageError::NotConfigured(
                "Classifier endpoint not configured".to_string(),
            ));
        }

        debug!("Classifying {} symptoms", symptoms.len());

        let response = self
            .client
            .post(&self.api_url)
            .json(&json!({ "symptoms": symptoms }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TriageError::UpstreamAi(format!("HTTP {}: {}", status, text)));
        }

        let mut ranked: RankedPredictions = serde_json::from_str(&text)
            .map_err(|e| TriageError::UpstreamAi(format!("Unparseable classifier reply: {}", e)))?;
        ranked.predictions = rank(ranked.predictions);

        Ok(ranked)
    }
}

/// Asks the chat-completion endpoint to rank conditions, then parses the
/// JSON list out of the free-text reply.
pub struct PromptInferer {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl PromptInferer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.chat_api_url.clone(),
            api_key: config.chat_api_key.clone(),
            model: config.chat_model.clone(),
        }
    }

    fn build_prompt(symptoms: &[String], specialization_hint: Option<&str>) -> String {
        let mut prompt = format!(
            "A patient reports the following symptoms: {}. \
             Rank the most likely conditions with an estimated probability for each.",
            symptoms.join(", ")
        );
        if let Some(hint) = specialization_hint {
            prompt.push_str(&format!(
                " The patient is considering a consultation in {}.",
                hint
            ));
        }
        prompt.push_str(
            " Respond ONLY in this JSON format: \
             {\"predictions\": [{\"label\": \"condition\", \"probability\": 0.0}]}",
        );
        prompt
    }
}

#[derive(Deserialize)]
struct ChatCompletionReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatTurn,
}

#[derive(Deserialize)]
struct ChatTurn {
    content: String,
}

#[async_trait]
impl SymptomInferer for PromptInferer {
    async fn infer(
        &self,
        symptoms: &[String],
        specialization_hint: Option<&str>,
    ) -> Result<RankedPredictions, TriageError> {
        if self.api_url.is_empty() || self.api_key.is_empty() {
            return Err(TriageError::NotConfigured(
                "Chat completion endpoint not configured".to_string(),
            ));
        }

        let prompt = Self::build_prompt(symptoms, specialization_hint);
        debug!("Prompting model {} for symptom inference", self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": MAX_COMPLETION_TOKENS,
                "model": self.model,
                "stream": false,
            }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TriageError::UpstreamAi(format!("HTTP {}: {}", status, text)));
        }

        let reply: ChatCompletionReply = serde_json::from_str(&text)
            .map_err(|e| TriageError::UpstreamAi(format!("Unparseable completion reply: {}", e)))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        let parsed = extract_json(&content).ok_or_else(|| {
            TriageError::UpstreamAi("No ranked prediction list in model reply".to_string())
        })?;
        let predictions = parsed.get("predictions").cloned().ok_or_else(|| {
            TriageError::UpstreamAi("Model reply is missing the predictions list".to_string())
        })?;
        let predictions: Vec<DiseasePrediction> = serde_json::from_value(predictions)
            .map_err(|e| TriageError::UpstreamAi(format!("Malformed prediction list: {}", e)))?;

        Ok(RankedPredictions {
            predictions: rank(predictions),
            unrecognized_symptoms: Vec::new(),
        })
    }
}

/// Symptom inference plus journaling. The backend is chosen once from
/// configuration; handlers never branch on the mode themselves.
pub struct InferenceService {
    inferer: Box<dyn SymptomInferer>,
    history: HistoryService,
}

impl InferenceService {
    pub fn new(config: &AppConfig) -> Self {
        let inferer: Box<dyn SymptomInferer> = match config.inference_mode {
            InferenceMode::Classifier => Box::new(ClassifierInferer::new(config)),
            InferenceMode::Prompt => Box::new(PromptInferer::new(config)),
        };

        Self {
            inferer,
            history: HistoryService::new(config),
        }
    }

    pub async fn predict(
        &self,
        user: &User,
        request: PredictionRequest,
        auth_token: &str,
    ) -> Result<PredictionReport, TriageError> {
        let symptoms: Vec<String> = request
            .symptoms
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symptoms.is_empty() {
            return Err(TriageError::ValidationError(
                "At least one symptom is required".to_string(),
            ));
        }

        let ranked = self
            .inferer
            .infer(&symptoms, request.specialization_hint.as_deref())
            .await?;

        let history_recorded = match Uuid::parse_str(&user.id) {
            Ok(user_id) => {
                let payload = json!({
                    "symptoms": symptoms,
                    "predictions": ranked.predictions,
                });
                match self
                    .history
                    .append(user_id, HistoryEntryType::Inference, payload, Some(auth_token))
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("History append for inference failed: {}", e);
                        false
                    }
                }
            }
            Err(_) => {
                warn!("User id {} is not a valid journal key", user.id);
                false
            }
        };

        Ok(PredictionReport {
            predictions: ranked.predictions,
            unrecognized_symptoms: ranked.unrecognized_symptoms,
            history_recorded,
        })
    }
}

fn rank(mut predictions: Vec<DiseasePrediction>) -> Vec<DiseasePrediction> {
    predictions.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    predictions.truncate(TOP_PREDICTIONS);
    predictions
}
