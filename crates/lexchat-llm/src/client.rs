use crate::streaming::parse_chat_sse_stream;
use crate::traits::{ChatClient, ChatRequest, EventStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

/// Client for the remote streaming completion endpoint (HTTP direct, no SDK)
pub struct CompletionClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: Option<String>,
}

impl CompletionClient {
    /// Create a client posting to `endpoint` with a bearer credential
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            model: None,
        })
    }

    /// Model name forwarded with every request
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatClient for CompletionClient {
    async fn chat_stream(&self, mut request: ChatRequest) -> Result<EventStream> {
        if request.model.is_none() {
            request.model = self.model.clone();
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            "Requesting chat completion stream"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion endpoint returned {}: {}", status, body);
        }

        Ok(parse_chat_sse_stream(response))
    }
}
