use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Bookmark, Conversation, StoredMessage};
use crate::trait_client::PersistenceClient;

#[derive(Default)]
struct Tables {
    conversations: HashMap<String, Conversation>,
    messages: Vec<StoredMessage>,
    bookmarks: Vec<Bookmark>,
}

impl Tables {
    fn check_owner(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let conversation = self
            .conversations
            .get(conversation_id)
            .ok_or_else(|| PersistError::ConversationNotFound(conversation_id.to_string()))?;
        if conversation.user_id != user_id {
            return Err(PersistError::Forbidden(format!("conversation {}", conversation_id)));
        }
        Ok(())
    }
}

/// Process-local store, used by default and in tests
#[derive(Default)]
pub struct InMemoryPersistenceClient {
    tables: RwLock<Tables>,
}

impl InMemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceClient for InMemoryPersistenceClient {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_conversation(&self, user_id: &str, title: String) -> Result<Conversation> {
        let conversation = Conversation::new(user_id, title);
        self.tables
            .write()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, conversation_id: &str, user_id: &str) -> Result<Option<Conversation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .conversations
            .get(conversation_id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn list_conversations(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>> {
        let tables = self.tables.read().await;
        let mut conversations: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        conversations.truncate(limit.max(0) as usize);
        Ok(conversations)
    }

    async fn save_message(&self, user_id: &str, message: StoredMessage) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_owner(&message.conversation_id, user_id)?;
        if let Some(conversation) = tables.conversations.get_mut(&message.conversation_id) {
            conversation.updated_at = Utc::now();
        }
        tables.messages.push(message);
        Ok(())
    }

    async fn get_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let tables = self.tables.read().await;
        tables.check_owner(conversation_id, user_id)?;

        let mut messages: Vec<StoredMessage> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn save_bookmark(&self, bookmark: Bookmark) -> Result<()> {
        self.tables.write().await.bookmarks.push(bookmark);
        Ok(())
    }

    async fn list_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        let tables = self.tables.read().await;
        let mut bookmarks: Vec<Bookmark> = tables
            .bookmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookmarks.reverse();
        bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookmarks)
    }

    async fn delete_bookmark(&self, bookmark_id: &str, user_id: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.bookmarks.len();
        tables
            .bookmarks
            .retain(|b| !(b.id == bookmark_id && b.user_id == user_id));
        Ok(tables.bookmarks.len() != before)
    }
}
