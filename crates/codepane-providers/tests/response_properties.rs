//! Property-based tests for response normalization

use codepane_providers::{extract_code_snippet, CodeGenAdapter, ProviderProfile};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    /// Text without a fence comes back trimmed and otherwise unchanged
    #[test]
    fn prop_unfenced_text_is_trimmed(text in "[a-zA-Z0-9 ;=(){}\n]{0,200}") {
        prop_assert_eq!(extract_code_snippet(&text), text.trim());
    }

    /// Fenced code is recovered regardless of surrounding prose and language tag
    #[test]
    fn prop_fenced_code_is_recovered(
        before in "[a-zA-Z .:]{0,40}",
        tag in "[a-z]{0,10}",
        code in "[a-z0-9=;(){}]{1,40}(\n\n?[a-z0-9=;(){}]{1,40}){0,5}",
        after in "[a-zA-Z .]{0,40}",
    ) {
        let text = format!("{}\n```{}\n{}\n```\n{}", before, tag, code, after);
        prop_assert_eq!(extract_code_snippet(&text), code.trim());
    }

    /// Unrecognized response shapes never fail, they yield nothing
    #[test]
    fn prop_unknown_shapes_yield_empty(key in "[a-z]{1,12}", value in "\\PC{0,30}") {
        prop_assume!(!["output", "output_text", "choices", "data", "content"].contains(&key.as_str()));
        let body = json!({ key: value });
        for id in ["openai", "anthropic"] {
            let profile = ProviderProfile::builtin(id).unwrap();
            prop_assert_eq!(CodeGenAdapter::extract_response(&profile, &body), "");
        }
    }
}
