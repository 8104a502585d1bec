//! Key redaction and safety utilities
//!
//! Credentials pass through request logging and `Debug` output; everything that might
//! end up in a log goes through [`redact`] first.

use std::sync::OnceLock;

use regex::Regex;

/// Default patterns, most specific first
const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    (r"sk-ant-[A-Za-z0-9_\-]{8,}", "[REDACTED_ANTHROPIC_KEY]"),
    (r"sk-[A-Za-z0-9_\-]{8,}", "[REDACTED_OPENAI_KEY]"),
    (r"(?i)bearer\s+[A-Za-z0-9._\-/+=]+", "Bearer [REDACTED]"),
    (r"(?i)x-api-key:\s*[^\s,;]+", "x-api-key: [REDACTED]"),
    (
        r"(?i)(api[_-]?key|token|secret|password)\s*=\s*[^\s,;&]+",
        "$1=[REDACTED]",
    ),
    (
        r"(?i)(OPENAI|ANTHROPIC|[A-Z]+)_API_KEY\s*=\s*[^\s,;]+",
        "${1}_API_KEY=[REDACTED]",
    ),
];

/// Header names whose values are credentials
const SENSITIVE_HEADERS: &[&str] = &["authorization", "x-api-key", "api-key"];

fn patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DEFAULT_PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|regex| (regex, *replacement))
            })
            .collect()
    })
}

/// Redact credentials from free text
pub fn redact(input: &str) -> String {
    patterns()
        .iter()
        .fold(input.to_string(), |text, (regex, replacement)| {
            regex.replace_all(&text, *replacement).into_owned()
        })
}

/// Copy of `headers` safe to log: credential header values are masked entirely
pub fn redact_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if SENSITIVE_HEADERS
                .iter()
                .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
            {
                "[REDACTED]".to_string()
            } else {
                redact(value)
            };
            (name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_provider_keys() {
        let text = redact("keys sk-abcdefghijklmnop and sk-ant-api03-zyxwvutsrq");
        assert!(!text.contains("abcdefghijklmnop"));
        assert!(!text.contains("zyxwvutsrq"));
        assert!(text.contains("[REDACTED_OPENAI_KEY]"));
        assert!(text.contains("[REDACTED_ANTHROPIC_KEY]"));
    }

    #[test]
    fn test_redacts_bearer_and_pairs() {
        assert_eq!(redact("Bearer abc.def"), "Bearer [REDACTED]");
        assert_eq!(redact("api_key=hunter2"), "api_key=[REDACTED]");
        assert_eq!(redact("x-api-key: k-123"), "x-api-key: [REDACTED]");
        assert_eq!(redact("model=gpt-4.1-mini"), "model=gpt-4.1-mini");
    }

    #[test]
    fn test_redact_headers_masks_credentials() {
        let headers = vec![
            ("Authorization".to_string(), "Bearer short".to_string()),
            ("x-api-key".to_string(), "k".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        let safe = redact_headers(&headers);
        assert_eq!(safe[0].1, "[REDACTED]");
        assert_eq!(safe[1].1, "[REDACTED]");
        assert_eq!(safe[2].1, "application/json");
    }
}
