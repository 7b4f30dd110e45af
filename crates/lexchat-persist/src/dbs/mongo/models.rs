use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use lexchat_llm::Role;
use serde::{Deserialize, Serialize};

use crate::models::{Bookmark, BookmarkKind, Conversation, StoredMessage};

/// MongoDB-specific conversation model (uses ObjectId)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConversation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// MongoDB-specific message model. `user_id` is denormalized from the
/// owning conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub conversation_id: ObjectId,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Insertion order tie-breaker for messages sharing a millisecond
    #[serde(default = "ObjectId::new")]
    pub seq: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoBookmark {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub item_type: BookmarkKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// Conversions between database-agnostic and MongoDB-specific models

impl From<MongoConversation> for Conversation {
    fn from(conversation: MongoConversation) -> Self {
        Self {
            id: conversation.id.to_hex(),
            user_id: conversation.user_id,
            title: conversation.title,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

impl MongoMessage {
    pub fn from_stored(message: StoredMessage, conversation_id: ObjectId, user_id: &str) -> Self {
        Self {
            id: message.id,
            conversation_id,
            user_id: user_id.to_string(),
            role: message.role,
            content: message.content,
            created_at: message.created_at,
            seq: ObjectId::new(),
        }
    }
}

impl From<MongoMessage> for StoredMessage {
    fn from(message: MongoMessage) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id.to_hex(),
            role: message.role,
            content: message.content,
            created_at: message.created_at,
        }
    }
}

impl From<Bookmark> for MongoBookmark {
    fn from(bookmark: Bookmark) -> Self {
        Self {
            id: bookmark.id,
            user_id: bookmark.user_id,
            item_type: bookmark.item_type,
            title: bookmark.title,
            content: bookmark.content,
            created_at: bookmark.created_at,
        }
    }
}

impl From<MongoBookmark> for Bookmark {
    fn from(bookmark: MongoBookmark) -> Self {
        Self {
            id: bookmark.id,
            user_id: bookmark.user_id,
            item_type: bookmark.item_type,
            title: bookmark.title,
            content: bookmark.content,
            created_at: bookmark.created_at,
        }
    }
}
