use async_trait::async_trait;
use crate::models::{Bookmark, Conversation, StoredMessage};
use crate::error::Result;

/// Trait for database persistence operations
///
/// Every operation is scoped to `user_id`: a principal only reads and writes
/// its own conversations and bookmarks, and only the messages of
/// conversations it owns. Implementations enforce this themselves.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Short backend name for health reporting
    fn backend_name(&self) -> &'static str;

    /// Create a new conversation owned by `user_id`
    async fn create_conversation(&self, user_id: &str, title: String) -> Result<Conversation>;

    /// Get a conversation by ID if `user_id` owns it
    async fn get_conversation(&self, conversation_id: &str, user_id: &str) -> Result<Option<Conversation>>;

    /// List conversations for a user, most recently updated first
    async fn list_conversations(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>>;

    /// Append a message to a conversation owned by `user_id`
    async fn save_message(&self, user_id: &str, message: StoredMessage) -> Result<()>;

    /// All messages of a conversation owned by `user_id`, oldest first
    async fn get_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<StoredMessage>>;

    async fn save_bookmark(&self, bookmark: Bookmark) -> Result<()>;

    /// Bookmarks for a user, newest first
    async fn list_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>>;

    /// Delete a bookmark; returns false when nothing owned by `user_id` matched
    async fn delete_bookmark(&self, bookmark_id: &str, user_id: &str) -> Result<bool>;
}
