//! Chat-completion request and response types
//!
//! These types follow the OpenAI Chat Completions wire format. Only the
//! subset this client sends and consumes is modeled; the rest of the response
//! envelope is decoded leniently so extra or missing metadata never turns a
//! usable reply into a decode failure.

use crate::config::ChatConfig;
use crate::error::ChatError;
use serde::{Deserialize, Serialize};

/// Object type of a non-streaming chat completion
pub const OBJECT_CHAT_COMPLETION: &str = "chat.completion";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message carried by a completion choice
///
/// `role` is kept as the endpoint sent it. `content` is absent when the reply
/// was filtered or carries only tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// One chat-completion request, built fresh per call
///
/// Fields are private: a request is immutable once built. The user content
/// always carries the configured instruction suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    model: String,
    system_prompt: String,
    user_prompt: String,
    max_tokens: u32,
}

impl ChatRequest {
    /// Build a request for `prompt` using the configured model and prompts
    ///
    /// The suffix is appended unconditionally and byte-for-byte.
    pub fn from_prompt(config: &ChatConfig, prompt: &str) -> Self {
        let mut user_prompt = String::with_capacity(prompt.len() + config.prompt_suffix.len());
        user_prompt.push_str(prompt);
        user_prompt.push_str(&config.prompt_suffix);

        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            user_prompt,
            max_tokens: config.max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// User message content as transmitted (prompt plus suffix)
    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Wire body for this request
    pub fn body(&self) -> ChatCompletionBody<'_> {
        ChatCompletionBody {
            model: &self.model,
            messages: [
                WireMessage {
                    role: Role::System,
                    content: &self.system_prompt,
                },
                WireMessage {
                    role: Role::User,
                    content: &self.user_prompt,
                },
            ],
            max_tokens: self.max_tokens,
        }
    }

    /// Serialized JSON body
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.body())
    }
}

/// Borrowed request body, serialized as
/// `{"model":..,"messages":[system,user],"max_tokens":..}`
#[derive(Debug, Serialize)]
pub struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

/// Chat-completion response envelope
///
/// Only `choices[0]` is consumed. The remaining fields are kept for
/// diagnostics and default when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    /// Unix timestamp in seconds
    #[serde(default, rename = "created")]
    pub created_at: i64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
}

/// A single completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default, rename = "logprobs")]
    pub log_probabilities: Option<serde_json::Value>,
}

impl ChatResponse {
    /// Consume the response and return the first choice's content
    ///
    /// A first choice without content is as empty as no choice at all.
    pub fn into_reply(self) -> Result<String, ChatError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ChatError::EmptyResponse)
    }
}
