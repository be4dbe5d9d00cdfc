//! OpenAI-compatible chat-completion client
//!
//! Works against any API that follows the OpenAI chat completions format
//! (OpenRouter is the default endpoint). Credentials are only sent to the
//! configured endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatCompleter, ChatMessage, LlmError};

/// Client for a `{base}/chat/completions` endpoint with bearer-token auth
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    custom_headers: Vec<(String, String)>,
}

impl OpenAiCompatClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1024,
            custom_headers: Vec::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, messages: &'a [ChatMessage]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: Some(self.max_tokens),
        }
    }
}

#[async_trait]
impl ChatCompleter for OpenAiCompatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        tracing::debug!(
            target: "llm",
            model = self.model,
            messages = messages.len(),
            "Sending chat request"
        );

        let body = self.build_request(messages);
        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key));
        for (name, value) in &self.custom_headers {
            req = req.header(name, value);
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        extract_content(api_response)
    }
}

/// Pull the assistant text out of a parsed response.
fn extract_content(response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::MalformedResponse("response carried no message content".into()))
}

// ============================================================================
// Wire types (OpenAI format)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
