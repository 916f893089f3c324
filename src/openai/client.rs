use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::types::{ApiError, ChatCompletionRequest, ChatCompletionResponse, Message};
use crate::config::{ModelCredential, ModelSettings};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("OPENAI_API_KEY not set")]
    ApiKeyNotSet,

    #[error("OpenAI rejected the API key")]
    Unauthorized,

    #[error("OpenAI rate limit exceeded")]
    RateLimited,

    #[error("OpenAI quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("OpenAI API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("OpenAI request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed OpenAI response: {0}")]
    InvalidResponse(String),

    #[error("OpenAI returned an empty answer")]
    EmptyResponse,
}

/// A chat model that answers one system+user exchange.
/// Implemented by `OpenAiClient` for production; mock implementations used in tests.
pub trait CompletionClient {
    fn model(&self) -> &str;

    async fn complete(&self, system: &str, user: &str) -> Result<String, ModelError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: ModelCredential,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(
        http: Client,
        credential: &ModelCredential,
        settings: &ModelSettings,
    ) -> Result<Self, ModelError> {
        if credential.is_empty() {
            return Err(ModelError::ApiKeyNotSet);
        }
        Ok(Self {
            http,
            api_key: credential.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        let settings = ModelSettings {
            base_url: base_url.to_string(),
            ..ModelSettings::default()
        };
        Self::new(http, &ModelCredential::new("test-key"), &settings)
            .expect("test key is not empty")
    }

    fn transport_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout(self.timeout)
        } else {
            ModelError::Network(e)
        }
    }
}

impl CompletionClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message::new("system", system), Message::new("user", user)],
            temperature: 0.0,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let api_error = serde_json::from_str::<ChatCompletionResponse>(&text)
                .ok()
                .and_then(|body| body.error);
            let classified = classify_status(status, api_error.as_ref(), &text);
            warn!(status = %status, error = %classified, "OpenAI API error");
            return Err(classified);
        }

        let body: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        if let Some(err) = &body.error {
            let classified = classify_status(status, Some(err), &text);
            warn!(error = %classified, "OpenAI API error in 200 response");
            return Err(classified);
        }

        debug!(model = %self.model, "chat completion received");
        body.answer()
            .map(str::to_string)
            .ok_or(ModelError::EmptyResponse)
    }
}

fn classify_status(status: StatusCode, err: Option<&ApiError>, body: &str) -> ModelError {
    let message = err
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {status}: {}", snippet(body)));

    match status.as_u16() {
        401 => ModelError::Unauthorized,
        429 if err.is_some_and(ApiError::is_quota) => ModelError::QuotaExhausted(message),
        429 => ModelError::RateLimited,
        _ if err.is_some_and(ApiError::is_quota) => ModelError::QuotaExhausted(message),
        // An error object inside a 200 body is a malformed answer, not a status failure.
        _ if status.is_success() => ModelError::InvalidResponse(message),
        code => ModelError::Api { code, message },
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
