use std::sync::Arc;

use lexchat_llm::Role;

use crate::auth::{AuthProvider, Principal};
use crate::error::{PersistError, Result};
use crate::models::{derive_title, Bookmark, Conversation, NewBookmark, StoredMessage};
use crate::trait_client::PersistenceClient;

/// Conversation persistence on behalf of the current principal.
///
/// Chat writes are best-effort: `ensure_conversation` and `append_message`
/// never fail the caller, they log and report what happened. Reads return
/// errors so the caller can decide how to surface them.
#[derive(Clone)]
pub struct ConversationGateway {
    store: Arc<dyn PersistenceClient>,
    auth: Arc<dyn AuthProvider>,
}

impl ConversationGateway {
    pub fn new(store: Arc<dyn PersistenceClient>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    pub fn principal(&self) -> Option<Principal> {
        self.auth.current_principal()
    }

    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    fn require_principal(&self) -> Result<Principal> {
        self.principal().ok_or(PersistError::Unauthenticated)
    }

    /// Return `existing_id` unchanged, or create a conversation titled after
    /// `seed`. `None` when nobody is signed in or the store rejected the insert.
    pub async fn ensure_conversation(&self, existing_id: Option<&str>, seed: &str) -> Option<String> {
        let principal = self.principal();
        self.ensure_conversation_for(principal.as_ref().map(|p| p.user_id.as_str()), existing_id, seed)
            .await
    }

    /// Like `ensure_conversation`, but on behalf of `user_id` rather than
    /// whoever is signed in now.
    pub async fn ensure_conversation_for(
        &self,
        user_id: Option<&str>,
        existing_id: Option<&str>,
        seed: &str,
    ) -> Option<String> {
        if let Some(id) = existing_id {
            return Some(id.to_string());
        }

        let user_id = user_id?;
        match self.store.create_conversation(user_id, derive_title(seed)).await {
            Ok(conversation) => {
                tracing::info!(
                    conversation_id = %conversation.id,
                    %user_id,
                    "Created conversation"
                );
                Some(conversation.id)
            }
            Err(e) => {
                tracing::error!("Failed to create conversation: {}", e);
                None
            }
        }
    }

    /// Store one message. Returns whether it was saved; failures are logged only.
    pub async fn append_message(&self, conversation_id: &str, role: Role, content: &str) -> bool {
        let principal = self.principal();
        self.append_message_for(
            principal.as_ref().map(|p| p.user_id.as_str()),
            conversation_id,
            role,
            content,
        )
        .await
    }

    /// Store one message owned by `user_id`.
    pub async fn append_message_for(
        &self,
        user_id: Option<&str>,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> bool {
        let Some(user_id) = user_id else {
            tracing::debug!(%conversation_id, "No principal, skipping message save");
            return false;
        };

        let message = StoredMessage::new(conversation_id, role, content);
        match self.store.save_message(user_id, message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(%conversation_id, %role, "Failed to save message: {}", e);
                false
            }
        }
    }

    /// All messages of a conversation, oldest first
    pub async fn load_transcript(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let principal = self.require_principal()?;
        self.store.get_messages(&principal.user_id, conversation_id).await
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let principal = self.require_principal()?;
        self.store
            .get_conversation(conversation_id, &principal.user_id)
            .await?
            .ok_or_else(|| PersistError::ConversationNotFound(conversation_id.to_string()))
    }

    /// The principal's conversations, most recently active first
    pub async fn recent_conversations(&self, limit: i64) -> Result<Vec<Conversation>> {
        let principal = self.require_principal()?;
        self.store.list_conversations(&principal.user_id, limit).await
    }

    pub async fn save_bookmark(&self, bookmark: NewBookmark) -> Result<Bookmark> {
        let principal = self.require_principal()?;
        let bookmark = bookmark.into_bookmark(principal.user_id);
        self.store.save_bookmark(bookmark.clone()).await?;
        Ok(bookmark)
    }

    pub async fn list_bookmarks(&self) -> Result<Vec<Bookmark>> {
        let principal = self.require_principal()?;
        self.store.list_bookmarks(&principal.user_id).await
    }

    pub async fn delete_bookmark(&self, bookmark_id: &str) -> Result<()> {
        let principal = self.require_principal()?;
        if self.store.delete_bookmark(bookmark_id, &principal.user_id).await? {
            Ok(())
        } else {
            Err(PersistError::BookmarkNotFound(bookmark_id.to_string()))
        }
    }
}
