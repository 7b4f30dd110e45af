use async_trait::async_trait;
use bson::oid::ObjectId;
use mongodb::Client;

use crate::dbs::mongo::models::{MongoBookmark, MongoMessage};
use crate::dbs::mongo::repositories::{
    MongoBookmarkRepository, MongoConversationRepository, MongoMessageRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{Bookmark, Conversation, StoredMessage};
use crate::trait_client::PersistenceClient;

pub struct MongoPersistenceClient {
    conversation_repo: MongoConversationRepository,
    message_repo: MongoMessageRepository,
    bookmark_repo: MongoBookmarkRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB and create client
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        Ok(Self {
            conversation_repo: MongoConversationRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
            bookmark_repo: MongoBookmarkRepository::new(&client, database),
        })
    }

    /// Resolve a conversation the user owns, distinguishing missing from foreign.
    async fn owned_conversation_id(&self, conversation_id: &str, user_id: &str) -> Result<ObjectId> {
        let object_id = parse_object_id(conversation_id)?;

        if self.conversation_repo.get_owned(object_id, user_id).await?.is_some() {
            return Ok(object_id);
        }
        if self.conversation_repo.exists(object_id).await? {
            Err(PersistError::Forbidden(format!("conversation {}", conversation_id)))
        } else {
            Err(PersistError::ConversationNotFound(conversation_id.to_string()))
        }
    }
}

fn parse_object_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|e| PersistError::InvalidId(e.to_string()))
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn create_conversation(&self, user_id: &str, title: String) -> Result<Conversation> {
        let conversation = self
            .conversation_repo
            .create_conversation(user_id.to_string(), title)
            .await?;
        Ok(conversation.into())
    }

    async fn get_conversation(&self, conversation_id: &str, user_id: &str) -> Result<Option<Conversation>> {
        let Ok(object_id) = ObjectId::parse_str(conversation_id) else {
            return Ok(None);
        };
        let conversation = self.conversation_repo.get_owned(object_id, user_id).await?;
        Ok(conversation.map(Into::into))
    }

    async fn list_conversations(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>> {
        let conversations = self.conversation_repo.list_conversations(user_id, limit).await?;
        Ok(conversations.into_iter().map(Into::into).collect())
    }

    async fn save_message(&self, user_id: &str, message: StoredMessage) -> Result<()> {
        let conversation_id = self
            .owned_conversation_id(&message.conversation_id, user_id)
            .await?;

        let mongo_message = MongoMessage::from_stored(message, conversation_id, user_id);
        self.message_repo.save_message(&mongo_message).await?;
        self.conversation_repo.touch(conversation_id).await?;
        Ok(())
    }

    async fn get_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let object_id = self.owned_conversation_id(conversation_id, user_id).await?;
        let messages = self.message_repo.get_messages(object_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn save_bookmark(&self, bookmark: Bookmark) -> Result<()> {
        let mongo_bookmark: MongoBookmark = bookmark.into();
        self.bookmark_repo.save_bookmark(&mongo_bookmark).await
    }

    async fn list_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        let bookmarks = self.bookmark_repo.list_bookmarks(user_id).await?;
        Ok(bookmarks.into_iter().map(Into::into).collect())
    }

    async fn delete_bookmark(&self, bookmark_id: &str, user_id: &str) -> Result<bool> {
        self.bookmark_repo.delete_bookmark(bookmark_id, user_id).await
    }
}
