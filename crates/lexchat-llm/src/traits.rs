use crate::streaming::StreamEvent;
use crate::types::Message;
use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Streaming chat completion
///
/// The returned stream yields content deltas and ends with `StreamEvent::Done`,
/// or with an error item when the body ends early or breaks.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream>;
}

/// Wire body for the completion endpoint: `{ "messages": [...] }`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
