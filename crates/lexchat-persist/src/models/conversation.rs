use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Maximum title length, in characters, before truncation.
pub const TITLE_MAX_CHARS: usize = 50;

/// Database-agnostic conversation model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Title for a conversation started by `seed`: the first 50 characters,
/// with `...` appended when the message is longer.
pub fn derive_title(seed: &str) -> String {
    match seed.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &seed[..cut]),
        None => seed.to_string(),
    }
}
