//! Non-streaming chat completions over reqwest.

use std::time::Duration;

use reqwest::Client as HttpClient;

use super::errors::InferenceError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::PlannerConfig;

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for one chat-completions endpoint and model.
pub struct ChatClient {
    http: HttpClient,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    request_timeout_secs: u64,
}

impl ChatClient {
    /// Build a client from the planner config. Does not check connectivity.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, InferenceError> {
        let base_url = config.base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "planner.base_url is empty".into(),
            });
        }
        if config.model.trim().is_empty() {
            return Err(InferenceError::ConfigError {
                reason: "planner.model is empty".into(),
            });
        }

        let endpoint = format!("{base_url}/chat/completions");
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: endpoint.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let api_key = Some(config.api_key.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(Self {
            http,
            endpoint,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            request_timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and return the first choice's text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, InferenceError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            messages = messages.len(),
            "sending chat completion"
        );

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    duration_secs: self.request_timeout_secs,
                }
            } else {
                InferenceError::ConnectionFailed {
                    endpoint: self.endpoint.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat completion rejected");
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    duration_secs: self.request_timeout_secs,
                }
            } else {
                InferenceError::ResponseError {
                    reason: format!("failed to read response body: {e}"),
                }
            }
        })?;

        parse_completion_text(&body_text)
    }
}

/// Pull the first choice's content out of a completion body.
pub fn parse_completion_text(body: &str) -> Result<String, InferenceError> {
    let resp: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ResponseError {
            reason: format!("failed to parse completion: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::ResponseError {
            reason: "completion has no choices".into(),
        })?;

    choice
        .message
        .content
        .ok_or_else(|| InferenceError::ResponseError {
            reason: "completion message has no content".into(),
        })
}
