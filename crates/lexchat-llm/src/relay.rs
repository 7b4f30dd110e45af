// Upstream side of the server-side chat function: prepend the assistant's
// system prompt and open a streaming chat completion on an OpenAI-compatible API.

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::types::Message;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Upstream rate limit exceeded")]
    RateLimited,

    #[error("Upstream credits exhausted")]
    PaymentRequired,

    #[error("Upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Relay setup failed: {0}")]
    Setup(#[from] anyhow::Error),
}

pub struct RelayClient {
    http_client: reqwest::Client,
    upstream_url: String,
    model: String,
    system_prompt: String,
}

impl RelayClient {
    pub fn new(
        upstream_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.into()))
                .context("Invalid upstream API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            upstream_url: upstream_url.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
        })
    }

    /// Upstream request body with the system prompt in front of the conversation.
    pub fn build_request(&self, messages: &[Message]) -> Value {
        let mut upstream_messages = Vec::with_capacity(messages.len() + 1);
        upstream_messages.push(json!({
            "role": "system",
            "content": self.system_prompt,
        }));
        upstream_messages.extend(messages.iter().map(|m| {
            json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        json!({
            "model": self.model,
            "messages": upstream_messages,
            "stream": true,
        })
    }

    /// Open the upstream stream. The returned response has a success status.
    pub async fn open_stream(&self, messages: &[Message]) -> Result<Response, RelayError> {
        let response = self
            .http_client
            .post(&self.upstream_url)
            .json(&self.build_request(messages))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(RelayError::RateLimited),
            StatusCode::PAYMENT_REQUIRED => Err(RelayError::PaymentRequired),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(RelayError::Status { status, body })
            }
        }
    }
}
