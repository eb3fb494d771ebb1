use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{Transcript, TranscribeRequest, TriageError};
use crate::services::extract::{decode_base64_payload, split_data_url};

/// Speech-to-text pass-through. The audio goes up as raw bytes; the reply's
/// text comes back verbatim.
pub struct TranscriptionService {
    client: Client,
    api_url: String,
}

#[derive(Deserialize)]
struct TranscribeReply {
    text: String,
}

impl TranscriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.transcribe_api_url.clone(),
        }
    }

    pub async fn transcribe(&self, request: TranscribeRequest) -> Result<Transcript, TriageError> {
        if self.api_url.is_empty() {
            return Err(TriageError::NotConfigured(
                "Transcription endpoint not configured".to_string(),
            ));
        }

        let (_, payload) = split_data_url(&request.audio_data);
        let audio = decode_base64_payload(payload)?;
        if audio.is_empty() {
            return Err(TriageError::ValidationError(
                "Uploaded audio is empty".to_string(),
            ));
        }

        debug!("Transcribing {} bytes of audio", audio.len());

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/octet-stream")
            .body(audio)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TriageError::UpstreamAi(format!("HTTP {}: {}", status, text)));
        }

        let reply: TranscribeReply = serde_json::from_str(&text).map_err(|e| {
            TriageError::UpstreamAi(format!("Unparseable transcription reply: {}", e))
        })?;

        Ok(Transcript { text: reply.text })
    }
}
