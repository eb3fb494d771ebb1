use std::env;
use tracing::warn;

/// How symptom inference is performed: against the dedicated classifier
/// endpoint, or by prompting the chat-completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    Classifier,
    Prompt,
}

impl InferenceMode {
    fn from_env_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "prompt" => InferenceMode::Prompt,
            "classifier" => InferenceMode::Classifier,
            other => {
                warn!("Unknown INFERENCE_MODE '{}', defaulting to classifier", other);
                InferenceMode::Classifier
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_anon_key: String,
    pub jwt_secret: String,
    pub classifier_api_url: String,
    pub chat_api_url: String,
    pub chat_api_key: String,
    pub chat_model: String,
    pub vision_api_url: String,
    pub vision_api_key: String,
    pub transcribe_api_url: String,
    pub video_room_base_url: String,
    pub inference_mode: InferenceMode,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL").unwrap_or_else(|_| {
                warn!("STORE_URL not set, using empty value");
                String::new()
            }),
            store_anon_key: env::var("STORE_ANON_KEY").unwrap_or_else(|_| {
                warn!("STORE_ANON_KEY not set, using empty value");
                String::new()
            }),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                warn!("JWT_SECRET not set, using empty value");
                String::new()
            }),
            classifier_api_url: env::var("CLASSIFIER_API_URL").unwrap_or_else(|_| {
                warn!("CLASSIFIER_API_URL not set, using empty value");
                String::new()
            }),
            chat_api_url: env::var("CHAT_API_URL").unwrap_or_else(|_| {
                warn!("CHAT_API_URL not set, using default");
                "https://router.huggingface.co/nebius/v1/chat/completions".to_string()
            }),
            chat_api_key: env::var("CHAT_API_KEY").unwrap_or_else(|_| {
                warn!("CHAT_API_KEY not set, using empty value");
                String::new()
            }),
            chat_model: env::var("CHAT_MODEL")
                .unwrap_or_else(|_| "aaditya/Llama3-OpenBioLLM-70B".to_string()),
            vision_api_url: env::var("VISION_API_URL").unwrap_or_else(|_| {
                warn!("VISION_API_URL not set, using empty value");
                String::new()
            }),
            vision_api_key: env::var("VISION_API_KEY").unwrap_or_else(|_| {
                warn!("VISION_API_KEY not set, using empty value");
                String::new()
            }),
            transcribe_api_url: env::var("TRANSCRIBE_API_URL").unwrap_or_else(|_| {
                warn!("TRANSCRIBE_API_URL not set, using empty value");
                String::new()
            }),
            video_room_base_url: env::var("VIDEO_ROOM_BASE_URL").unwrap_or_else(|_| {
                warn!("VIDEO_ROOM_BASE_URL not set, using default");
                "https://meet.medai.example".to_string()
            }),
            inference_mode: match env::var("INFERENCE_MODE") {
                Ok(value) => InferenceMode::from_env_value(&value),
                Err(_) => InferenceMode::Classifier,
            },
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_anon_key.is_empty() && !self.jwt_secret.is_empty()
    }

    pub fn is_chat_configured(&self) -> bool {
        !self.chat_api_url.is_empty() && !self.chat_api_key.is_empty()
    }

    pub fn is_vision_configured(&self) -> bool {
        !self.vision_api_url.is_empty() && !self.vision_api_key.is_empty()
    }
}
