//! Code generation adapter
//!
//! Stateless translation between a [`ProviderProfile`] plus prompt and a backend
//! request, and between the backend's response and plain source code.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::models::{ProviderProfile, WireFormat};
use crate::providers::{format_headers, parse_response, WireBody};
use crate::redaction::{redact, redact_headers};
use crate::transport::{HttpTransport, ReqwestTransport};

/// A fully built backend request; always sent as a POST
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: WireBody,
}

impl GenerationRequest {
    pub fn method(&self) -> &'static str {
        "POST"
    }

    pub fn wire_format(&self) -> WireFormat {
        self.body.format()
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_json(&self) -> Result<String, ProviderError> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

/// Issues generation requests over an injected transport
#[derive(Clone)]
pub struct CodeGenAdapter {
    transport: Arc<dyn HttpTransport>,
}

impl CodeGenAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Build the backend request for `prompt`
    pub fn build_request(
        profile: &ProviderProfile,
        prompt: &str,
    ) -> Result<GenerationRequest, ProviderError> {
        let base_url = profile.base_url.trim();
        if base_url.is_empty() {
            return Err(ProviderError::ConfigError(format!(
                "Provider '{}' has no base URL",
                profile.id
            )));
        }
        if profile.model.trim().is_empty() {
            return Err(ProviderError::ConfigError(format!(
                "Provider '{}' has no model",
                profile.id
            )));
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ProviderError::ConfigError("Prompt is empty".to_string()));
        }

        let instructions = profile.instructions.trim();
        let user_text = if instructions.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", instructions, prompt)
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        for (name, value) in format_headers(profile) {
            set_header(&mut headers, name, value);
        }
        for (name, value) in &profile.extra_headers {
            if name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            set_header(&mut headers, name.clone(), value.clone());
        }

        Ok(GenerationRequest {
            url: join_url(base_url, profile.effective_endpoint()),
            headers,
            body: WireBody::build(profile, user_text),
        })
    }

    /// Issue a generation request and return the extracted code
    ///
    /// The returned code may be empty when the response carried none.
    pub async fn send(
        &self,
        profile: &ProviderProfile,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let request = Self::build_request(profile, prompt)?;
        debug!(
            "Sending {} request to {} with headers {:?}",
            request.wire_format(),
            request.url,
            redact_headers(&request.headers)
        );

        let response = self
            .transport
            .post(&request.url, &request.headers, request.body_json()?)
            .await
            .map_err(|e| {
                warn!("Generation request to {} failed: {}", request.url, redact(&e.0));
                ProviderError::from(e)
            })?;

        if !response.is_success() {
            let body = response.body.unwrap_or_default();
            warn!(
                "Provider '{}' returned status {}: {}",
                profile.id,
                response.status,
                redact(&body)
            );
            return Err(ProviderError::HttpStatus {
                status: response.status,
                body,
            });
        }

        let payload: Value = serde_json::from_str(response.body.as_deref().unwrap_or_default())?;
        let code = extract_code_snippet(&Self::extract_response(profile, &payload));
        debug!("Provider '{}' returned {} characters of code", profile.id, code.len());
        Ok(code)
    }

    /// Pull the model's text out of a backend response; unknown shapes yield ""
    pub fn extract_response(profile: &ProviderProfile, body: &Value) -> String {
        match parse_response(profile.wire_format, body) {
            Some(extraction) => {
                debug!("Response text taken from '{}'", extraction.source);
                extraction.text
            }
            None => String::new(),
        }
    }
}

impl Default for CodeGenAdapter {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestTransport::new()))
    }
}

impl std::fmt::Debug for CodeGenAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGenAdapter").finish_non_exhaustive()
    }
}

/// Replace a header case-insensitively, or append it
fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
    {
        Some(existing) => *existing = (name, value),
        None => headers.push((name, value)),
    }
}

/// Strip trailing slashes from `base` and join with `path` on exactly one slash
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim();
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base, path.trim_start_matches('/'))
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\n(.*?)```").ok())
        .as_ref()
}

/// Contents of the first fenced code block, else the whole text, trimmed
pub fn extract_code_snippet(text: &str) -> String {
    let content = text.trim();
    let fenced = fence_regex()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|inner| !inner.is_empty());
    match fenced {
        Some(inner) => inner.trim().to_string(),
        None => content.to_string(),
    }
}
