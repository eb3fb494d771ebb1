use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use history_cell::models::HistoryEntryType;
use history_cell::services::history::HistoryService;
use shared_config::AppConfig;
use shared_models::auth::User;

use crate::models::{ChatReply, ChatRequest, TriageError, MAX_COMPLETION_TOKENS};

/// Streams a completion from the chat endpoint and assembles it into one
/// reply. The conversation itself lives with the client.
pub struct ChatService {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    history: HistoryService,
}

impl ChatService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.chat_api_url.clone(),
            api_key: config.chat_api_key.clone(),
            model: config.chat_model.clone(),
            history: HistoryService::new(config),
        }
    }

    pub async fn converse(
        &self,
        user: &User,
        request: ChatRequest,
        auth_token: &str,
    ) -> Result<ChatReply, TriageError> {
        if self.api_url.is_empty() || self.api_key.is_empty() {
            return Err(TriageError::NotConfigured(
                "Chat completion endpoint not configured".to_string(),
            ));
        }
        if request.messages.is_empty() {
            return Err(TriageError::ValidationError(
                "Message history cannot be empty".to_string(),
            ));
        }

        debug!("Streaming chat completion for {} messages", request.messages.len());

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "messages": request.messages,
                "max_tokens": MAX_COMPLETION_TOKENS,
                "model": self.model,
                "stream": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(TriageError::UpstreamAi(format!("HTTP {}: {}", status, text)));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut reply = String::new();
        let mut done = false;

        // Chunks can split lines anywhere; only complete lines are consumed
        // and the tail stays buffered for the next chunk.
        while !done {
            let Some(chunk) = stream.next().await else { break };
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                if consume_sse_line(line.trim(), &mut reply)? {
                    done = true;
                    break;
                }
            }
        }

        let last_message = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let history_recorded = match Uuid::parse_str(&user.id) {
            Ok(user_id) => {
                let payload = json!({
                    "message": last_message,
                    "reply": reply,
                });
                match self
                    .history
                    .append(user_id, HistoryEntryType::Chatbot, payload, Some(auth_token))
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("History append for chat failed: {}", e);
                        false
                    }
                }
            }
            Err(_) => {
                warn!("User id {} is not a valid journal key", user.id);
                false
            }
        };

        Ok(ChatReply {
            reply,
            history_recorded,
        })
    }
}

/// Feed one SSE line into the assembled reply. Returns true on the `[DONE]`
/// terminator. Non-data lines (comments, keep-alives) are skipped.
fn consume_sse_line(line: &str, reply: &mut String) -> Result<bool, TriageError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(false);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(true);
    }

    let chunk: Value = serde_json::from_str(data)
        .map_err(|e| TriageError::UpstreamAi(format!("Unparseable stream chunk: {}", e)))?;
    if let Some(delta) = chunk["choices"][0]["delta"]["content"].as_str() {
        reply.push_str(delta);
    }

    Ok(false)
}
