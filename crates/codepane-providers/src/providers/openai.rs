//! OpenAI-style chat completion codec

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{text_or_blocks, Extractor};
use crate::models::ProviderProfile;

/// OpenAI API request format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiChatRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// OpenAI API message format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    pub content: String,
}

impl OpenAiChatRequest {
    pub fn new(profile: &ProviderProfile, user_text: String) -> Self {
        Self {
            model: profile.model.trim().to_string(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: profile.effective_system_prompt().to_string(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: user_text,
                },
            ],
            temperature: profile.effective_temperature(),
            max_tokens: profile.effective_max_tokens(),
        }
    }
}

/// Bearer authorization plus the optional organization header
pub fn headers(profile: &ProviderProfile) -> Vec<(String, String)> {
    let mut headers = vec![(
        "Authorization".to_string(),
        format!("Bearer {}", profile.api_key),
    )];
    if let Some(organization) = profile.organization.as_deref().filter(|o| !o.is_empty()) {
        headers.push(("OpenAI-Organization".to_string(), organization.to_string()));
    }
    headers
}

/// Response extractors, in order of preference
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("output", output),
    ("output_text", output_text),
    ("choices", first_choice),
    ("data", first_data),
];

fn output(body: &Value) -> Option<String> {
    body.get("output")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn output_text(body: &Value) -> Option<String> {
    body.get("output_text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Message content of the first choice, else its `text`
///
/// String or array content is taken as-is, even when empty. Once a non-empty
/// `choices` array is present, this extractor claims the response even when the
/// choice carries no usable text.
fn first_choice(body: &Value) -> Option<String> {
    let choice = body.get("choices")?.as_array()?.first()?;
    let content = choice.get("message").and_then(|m| m.get("content"));

    let text = match content {
        Some(content @ (Value::String(_) | Value::Array(_))) => text_or_blocks(content),
        Some(Value::Object(block)) => block
            .get("text")
            .and_then(text_or_blocks)
            .filter(|text| !text.is_empty()),
        _ => None,
    }
    .or_else(|| choice.get("text").and_then(text_or_blocks));

    Some(text.unwrap_or_default())
}

fn first_data(body: &Value) -> Option<String> {
    body.get("data")?
        .as_array()?
        .first()?
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::parse_response;
    use crate::models::WireFormat;
    use serde_json::json;

    fn extract(body: Value) -> Option<String> {
        parse_response(WireFormat::OpenAi, &body).map(|e| e.text)
    }

    #[test]
    fn test_request_body_shape() {
        let mut profile = ProviderProfile::builtin("openai").unwrap();
        profile.temperature = 0.0;
        let body = serde_json::to_value(OpenAiChatRequest::new(&profile, "hi".into())).unwrap();

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 800);
    }

    #[test]
    fn test_headers_include_organization_when_set() {
        let mut profile = ProviderProfile::builtin("openai").unwrap();
        profile.api_key = "k".to_string();
        assert_eq!(headers(&profile).len(), 1);

        profile.organization = Some("org-1".to_string());
        let headers = headers(&profile);
        assert_eq!(headers[0], ("Authorization".to_string(), "Bearer k".to_string()));
        assert_eq!(headers[1].0, "OpenAI-Organization");
    }

    #[test]
    fn test_extractor_precedence() {
        assert_eq!(
            extract(json!({"output": "a", "output_text": "b"})).as_deref(),
            Some("a")
        );
        assert_eq!(
            extract(json!({"output": "", "output_text": "b"})).as_deref(),
            Some("b")
        );
        assert_eq!(
            extract(json!({"choices": [{"message": {"content": "c"}}], "data": [{"text": "d"}]}))
                .as_deref(),
            Some("c")
        );
        assert_eq!(extract(json!({"data": [{"text": "d"}]})).as_deref(), Some("d"));
        assert_eq!(extract(json!({"id": "x"})), None);
    }

    #[test]
    fn test_choice_content_shapes() {
        let blocks = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "line one"},
            {"value": "line two"}
        ]}}]});
        assert_eq!(extract(blocks).as_deref(), Some("line one\nline two"));

        let nested = json!({"choices": [{"message": {"content": {"text": "inner"}}}]});
        assert_eq!(extract(nested).as_deref(), Some("inner"));

        let legacy = json!({"choices": [{"text": "completion"}]});
        assert_eq!(extract(legacy).as_deref(), Some("completion"));

        let empty = json!({"choices": [{}], "data": [{"text": "ignored"}]});
        assert_eq!(extract(empty).as_deref(), Some(""));

        let blank = json!({"choices": [{"message": {"content": ""}, "text": "fallback"}]});
        assert_eq!(extract(blank).as_deref(), Some(""));

        let no_message = json!({"choices": [{"message": {"content": null}, "text": "legacy"}]});
        assert_eq!(extract(no_message).as_deref(), Some("legacy"));
    }
}
