use serde::{Deserialize, Serialize};

pub const SIGN_IN_NOTICE: &str = "Sign in to save your conversation history.";
pub const EMPTY_RESPONSE_NOTICE: &str = "The assistant did not return a response. Please try again.";
pub const TRANSPORT_FAILURE_MESSAGE: &str = "The assistant is unavailable right now. Please try again.";

/// What a chat turn reports to its consumer, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A conversation record was created for this session
    Conversation {
        conversation_id: String,
    },

    /// Full assistant text so far; replaces the previous snapshot
    Snapshot {
        content: String,
    },

    /// User-facing information that does not end the turn
    Notice {
        message: String,
    },

    /// Final assistant message
    Completed {
        content: String,
        persisted: bool,
    },

    /// The turn was aborted
    Error {
        message: String,
    },
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Conversation { .. } => "conversation",
            ChatEvent::Snapshot { .. } => "snapshot",
            ChatEvent::Notice { .. } => "notice",
            ChatEvent::Completed { .. } => "completed",
            ChatEvent::Error { .. } => "error",
        }
    }

    pub(crate) fn notice(message: &str) -> Self {
        ChatEvent::Notice {
            message: message.to_string(),
        }
    }
}
