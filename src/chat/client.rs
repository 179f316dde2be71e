//! HTTP transport for the chat-completions endpoint
//!
//! `ChatBackend` is the seam between the session (supersession and delivery)
//! and the wire. `HttpChatClient` is the reqwest implementation.

use crate::chat::types::{ChatRequest, ChatResponse};
use crate::config::{ApiConfig, ApiKey};
use crate::error::{AppError, AppResult, ChatError};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;

/// Trait for chat-completion backends
///
/// Allows dependency injection of different backends, enabling tests to
/// control exactly when and how a request resolves.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request and return the assistant reply
    ///
    /// This is the only suspension point of a chat call.
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// Validate and decode a raw HTTP response into the reply text
///
/// A non-200 status short-circuits before any decoding, so an error body is
/// never misreported as a schema mismatch.
pub fn decode_reply(status: u16, body: &[u8]) -> Result<String, ChatError> {
    if status != StatusCode::OK.as_u16() {
        return Err(ChatError::BadStatus {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }

    let response: ChatResponse =
        serde_json::from_slice(body).map_err(|e| ChatError::Decode {
            reason: e.to_string(),
        })?;

    response.into_reply()
}

/// reqwest-backed chat client
///
/// Cheap to clone: the underlying connection pool is shared.
#[derive(Clone)]
pub struct HttpChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
}

impl HttpChatClient {
    /// Build a client for the configured endpoint with an explicit timeout
    pub fn new(api: &ApiConfig, api_key: ApiKey) -> AppResult<Self> {
        Self::with_timeout(&api.endpoint, api_key, api.request_timeout())
    }

    pub fn with_timeout(endpoint: &str, api_key: ApiKey, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    /// Target URL of every request
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: &reqwest::Error) -> ChatError {
        let reason = if e.is_timeout() {
            format!("timed out: {}", e)
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            e.to_string()
        };

        ChatError::Transport {
            endpoint: self.endpoint.clone(),
            reason,
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let body = request.to_json().map_err(|e| ChatError::Transport {
            endpoint: self.endpoint.clone(),
            reason: format!("failed to encode request body: {}", e),
        })?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if status != StatusCode::OK.as_u16() {
            tracing::warn!(
                endpoint = %self.endpoint,
                status,
                body = %String::from_utf8_lossy(&bytes),
                "Chat endpoint returned non-200 status"
            );
        }

        decode_reply(status, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{"choices":[{"message":{"role":"assistant","content":"Hola"},"index":0,"finish_reason":"stop"}], "id":"x","object":"chat.completion","created":1,"model":"gpt-3.5-turbo"}"#;

    #[test]
    fn test_decode_reply_success() {
        assert_eq!(decode_reply(200, FIXTURE.as_bytes()).unwrap(), "Hola");
    }

    #[test]
    fn test_decode_reply_non_200_is_bad_status_even_with_valid_body() {
        let err = decode_reply(500, FIXTURE.as_bytes()).unwrap_err();
        assert!(matches!(err, ChatError::BadStatus { status: 500, .. }));
    }

    #[test]
    fn test_decode_reply_401_is_bad_status_not_decode() {
        let body = br#"{"error":"invalid_api_key"}"#;
        for _ in 0..3 {
            match decode_reply(401, body) {
                Err(ChatError::BadStatus { status, body }) => {
                    assert_eq!(status, 401);
                    assert_eq!(body, r#"{"error":"invalid_api_key"}"#);
                }
                other => panic!("expected BadStatus, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_decode_reply_other_2xx_is_bad_status() {
        let err = decode_reply(201, FIXTURE.as_bytes()).unwrap_err();
        assert!(matches!(err, ChatError::BadStatus { status: 201, .. }));
    }

    #[test]
    fn test_decode_reply_malformed_json_is_decode() {
        let err = decode_reply(200, b"{not json").unwrap_err();
        assert!(matches!(err, ChatError::Decode { .. }));
    }

    #[test]
    fn test_decode_reply_wrong_schema_is_decode() {
        let err = decode_reply(200, br#"{"error":"invalid_api_key"}"#).unwrap_err();
        assert!(matches!(err, ChatError::Decode { .. }));
    }

    #[test]
    fn test_decode_reply_empty_choices() {
        let err = decode_reply(200, br#"{"choices":[],"id":"x"}"#).unwrap_err();
        assert!(matches!(err, ChatError::EmptyResponse));
    }

    #[test]
    fn test_decode_reply_non_utf8_error_body_is_preserved_lossily() {
        let err = decode_reply(502, &[0xff, b'o', b'k']).unwrap_err();
        match err {
            ChatError::BadStatus { body, .. } => assert!(body.ends_with("ok")),
            other => panic!("expected BadStatus, got {:?}", other),
        }
    }
}
