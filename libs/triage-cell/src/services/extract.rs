use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use crate::models::TriageError;

/// Pull a JSON object out of a model reply. Models often wrap the JSON in
/// Markdown code fences or surround it with prose, so fences are stripped
/// first and the outermost brace pair is parsed.
pub fn extract_json(text: &str) -> Option<Value> {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        text = rest.trim().trim_end_matches('`').trim_end();
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str(&text[start..=end]).ok()
}

/// Split a client upload into its declared mime type and base64 payload.
/// Accepts bare base64 as well as `data:<mime>;base64,<payload>` URLs.
pub fn split_data_url(data: &str) -> (Option<&str>, &str) {
    if let Some(rest) = data.strip_prefix("data:") {
        if let Some((meta, payload)) = rest.split_once(',') {
            let mime = meta.split(';').next().filter(|m| !m.is_empty());
            return (mime, payload);
        }
    }
    (None, data)
}

pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, TriageError> {
    BASE64
        .decode(payload.trim())
        .map_err(|e| TriageError::ValidationError(format!("Invalid base64 payload: {}", e)))
}
