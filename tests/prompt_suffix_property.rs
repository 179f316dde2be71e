//! Property tests for request construction
//!
//! Whatever the user types, the transmitted user message is the prompt
//! followed by the configured suffix, byte-for-byte, and the system message,
//! model and token cap never change.

use encarta::chat::ChatRequest;
use encarta::config::{ChatConfig, DEFAULT_PROMPT_SUFFIX, DEFAULT_SYSTEM_PROMPT};
use proptest::prelude::*;
use serde_json::Value;

fn transmitted(prompt: &str, config: &ChatConfig) -> Value {
    let bytes = ChatRequest::from_prompt(config, prompt)
        .to_json()
        .expect("request should serialize");
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

proptest! {
    #[test]
    fn user_content_is_prompt_plus_suffix(prompt in "\\PC{1,200}") {
        let body = transmitted(&prompt, &ChatConfig::default());

        let expected = format!("{}{}", prompt, DEFAULT_PROMPT_SUFFIX);
        prop_assert_eq!(body["messages"][1]["role"].as_str(), Some("user"));
        prop_assert_eq!(body["messages"][1]["content"].as_str(), Some(expected.as_str()));
    }

    #[test]
    fn envelope_is_independent_of_prompt(prompt in any::<String>()) {
        let body = transmitted(&prompt, &ChatConfig::default());

        prop_assert_eq!(body["model"].as_str(), Some("gpt-3.5-turbo"));
        prop_assert_eq!(body["max_tokens"].as_u64(), Some(150));
        prop_assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
        prop_assert_eq!(body["messages"][0]["role"].as_str(), Some("system"));
        prop_assert_eq!(body["messages"][0]["content"].as_str(), Some(DEFAULT_SYSTEM_PROMPT));
    }

    #[test]
    fn custom_suffix_is_appended_verbatim(prompt in "\\PC{1,64}", suffix in "\\PC{0,32}") {
        let config = ChatConfig {
            prompt_suffix: suffix.clone(),
            ..ChatConfig::default()
        };
        let body = transmitted(&prompt, &config);

        let content = body["messages"][1]["content"].as_str().unwrap_or_default();
        prop_assert!(content.starts_with(prompt.as_str()));
        prop_assert!(content.ends_with(suffix.as_str()));
        prop_assert_eq!(content.len(), prompt.len() + suffix.len());
    }
}

#[test]
fn hola_example_is_exact() {
    let body = transmitted("Hola", &ChatConfig::default());
    assert_eq!(
        body["messages"][1]["content"],
        "Hola. Limita tu respuesta a 50 palabras o menos"
    );
}
