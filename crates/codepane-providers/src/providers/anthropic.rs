//! Anthropic-style messages codec

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{join_blocks, Extractor};
use crate::models::{ProviderProfile, DEFAULT_ANTHROPIC_VERSION};

/// Anthropic API request format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicMessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub system: String,
    pub messages: Vec<AnthropicMessage>,
}

/// Anthropic API message format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<AnthropicContent>,
}

/// Anthropic API content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl AnthropicMessagesRequest {
    pub fn new(profile: &ProviderProfile, user_text: String) -> Self {
        Self {
            model: profile.model.trim().to_string(),
            max_tokens: profile.effective_max_tokens(),
            temperature: profile.effective_temperature(),
            system: profile.effective_system_prompt().to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: vec![AnthropicContent {
                    content_type: "text".to_string(),
                    text: user_text,
                }],
            }],
        }
    }
}

/// API key and version headers
pub fn headers(profile: &ProviderProfile) -> Vec<(String, String)> {
    let version = profile.anthropic_version.trim();
    let version = if version.is_empty() {
        DEFAULT_ANTHROPIC_VERSION
    } else {
        version
    };
    vec![
        ("x-api-key".to_string(), profile.api_key.clone()),
        ("anthropic-version".to_string(), version.to_string()),
    ]
}

/// Response extractors, in order of preference
pub const EXTRACTORS: &[(&str, Extractor)] = &[("content", content), ("output_text", output_text)];

fn content(body: &Value) -> Option<String> {
    match body.get("content")? {
        Value::Array(blocks) if !blocks.is_empty() => Some(join_blocks(blocks)),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn output_text(body: &Value) -> Option<String> {
    body.get("output_text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WireFormat;
    use crate::providers::parse_response;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let mut profile = ProviderProfile::builtin("anthropic").unwrap();
        profile.max_tokens = 1024;
        let body =
            serde_json::to_value(AnthropicMessagesRequest::new(&profile, "write it".into()))
                .unwrap();

        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], crate::models::DEFAULT_SYSTEM_PROMPT);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
        assert_eq!(body["messages"][0]["content"][0]["text"], "write it");
    }

    #[test]
    fn test_headers_default_version() {
        let mut profile = ProviderProfile::builtin("anthropic").unwrap();
        profile.api_key = "k".to_string();
        profile.anthropic_version = String::new();
        assert_eq!(
            headers(&profile),
            vec![
                ("x-api-key".to_string(), "k".to_string()),
                ("anthropic-version".to_string(), "2023-06-01".to_string()),
            ]
        );
    }

    #[test]
    fn test_content_blocks_joined() {
        let body = json!({"content": [
            {"type": "text", "text": "first"},
            "second",
            {"type": "tool_use", "id": "t1"}
        ], "output_text": "ignored"});
        let extraction = parse_response(WireFormat::Anthropic, &body).unwrap();
        assert_eq!(extraction.text, "first\nsecond");
        assert_eq!(extraction.source, "content");
    }

    #[test]
    fn test_falls_back_to_output_text() {
        let body = json!({"content": [], "output_text": "fallback"});
        let extraction = parse_response(WireFormat::Anthropic, &body).unwrap();
        assert_eq!(extraction.text, "fallback");
    }
}
