//! Wire codecs for the supported backend formats
//!
//! Each format module owns its request body type, its format-specific headers and an
//! ordered chain of response extractors. The first extractor that recognizes the
//! response shape wins; later ones are never consulted.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicMessagesRequest;
pub use openai::OpenAiChatRequest;

use serde::Serialize;
use serde_json::Value;

use crate::models::{ProviderProfile, WireFormat};

/// A request body in one of the supported wire formats
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireBody {
    OpenAi(OpenAiChatRequest),
    Anthropic(AnthropicMessagesRequest),
}

impl WireBody {
    pub fn build(profile: &ProviderProfile, user_text: String) -> Self {
        match profile.wire_format {
            WireFormat::OpenAi => WireBody::OpenAi(OpenAiChatRequest::new(profile, user_text)),
            WireFormat::Anthropic => {
                WireBody::Anthropic(AnthropicMessagesRequest::new(profile, user_text))
            }
        }
    }

    pub fn format(&self) -> WireFormat {
        match self {
            WireBody::OpenAi(_) => WireFormat::OpenAi,
            WireBody::Anthropic(_) => WireFormat::Anthropic,
        }
    }
}

/// Authentication and version headers for the profile's wire format
pub fn format_headers(profile: &ProviderProfile) -> Vec<(String, String)> {
    match profile.wire_format {
        WireFormat::OpenAi => openai::headers(profile),
        WireFormat::Anthropic => anthropic::headers(profile),
    }
}

/// One attempt at pulling text out of a response body
pub type Extractor = fn(&Value) -> Option<String>;

/// Text pulled out of a response, tagged with the extractor that matched
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub source: &'static str,
}

/// Run the format's extractor chain over a response body
pub fn parse_response(format: WireFormat, body: &Value) -> Option<Extraction> {
    let chain = match format {
        WireFormat::OpenAi => openai::EXTRACTORS,
        WireFormat::Anthropic => anthropic::EXTRACTORS,
    };
    chain
        .iter()
        .find_map(|&(source, extract)| extract(body).map(|text| Extraction { text, source }))
}

/// Text of one content block: the block itself if it is a string, else its
/// `text` field, else its `value` field. Empty text counts as absent.
fn block_text(block: &Value) -> Option<&str> {
    let text = match block {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| map.get("value").and_then(Value::as_str)),
        _ => None,
    };
    text.filter(|s| !s.is_empty())
}

/// Newline-join the text of every usable block
pub(crate) fn join_blocks(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter_map(block_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A string as-is, or an array flattened with [`join_blocks`]
pub(crate) fn text_or_blocks(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => Some(join_blocks(blocks)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_blocks_mixed_shapes() {
        let blocks = json!(["a", {"text": "b"}, {"value": "c"}, null, {"other": 1}, ""]);
        assert_eq!(join_blocks(blocks.as_array().unwrap()), "a\nb\nc");
    }

    #[test]
    fn test_parse_response_reports_source() {
        let body = json!({"output_text": "x"});
        let extraction = parse_response(WireFormat::OpenAi, &body).unwrap();
        assert_eq!(extraction.source, "output_text");
        assert_eq!(extraction.text, "x");

        let body = json!({"unexpected": true});
        assert!(parse_response(WireFormat::Anthropic, &body).is_none());
    }
}
