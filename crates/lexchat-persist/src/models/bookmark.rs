use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkKind {
    Resource,
    Answer,
    Article,
    Form,
    Other,
}

/// A saved item on a principal's dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub item_type: BookmarkKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bookmark fields supplied by the caller; ownership and identity are assigned on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBookmark {
    pub item_type: BookmarkKind,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl NewBookmark {
    pub fn into_bookmark(self, user_id: impl Into<String>) -> Bookmark {
        Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            item_type: self.item_type,
            title: self.title,
            content: self.content,
            created_at: Utc::now(),
        }
    }
}
