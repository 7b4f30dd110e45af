use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use lexchat_llm::Role;

/// Database-agnostic message model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(conversation_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

impl From<StoredMessage> for lexchat_llm::Message {
    fn from(message: StoredMessage) -> Self {
        lexchat_llm::Message::new(message.role, message.content)
    }
}
