use bson::oid::ObjectId;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoConversation;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoConversationRepository {
    collection: Collection<MongoConversation>,
}

impl MongoConversationRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("conversations");
        Self { collection }
    }

    /// Create a new conversation
    pub async fn create_conversation(&self, user_id: String, title: String) -> Result<MongoConversation> {
        let now = Utc::now();
        let conversation = MongoConversation {
            id: ObjectId::new(),
            user_id,
            title,
            created_at: now,
            updated_at: now,
        };

        self.collection.insert_one(&conversation).await?;
        Ok(conversation)
    }

    /// Get a conversation owned by `user_id`
    pub async fn get_owned(&self, conversation_id: ObjectId, user_id: &str) -> Result<Option<MongoConversation>> {
        let filter = doc! { "_id": conversation_id, "user_id": user_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// Whether a conversation with this id exists at all
    pub async fn exists(&self, conversation_id: ObjectId) -> Result<bool> {
        let filter = doc! { "_id": conversation_id };
        Ok(self.collection.count_documents(filter).await? > 0)
    }

    /// List conversations for a user, most recently updated first
    pub async fn list_conversations(&self, user_id: &str, limit: i64) -> Result<Vec<MongoConversation>> {
        let filter = doc! { "user_id": user_id };
        let conversations = self
            .collection
            .find(filter)
            .sort(doc! { "updated_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(conversations)
    }

    /// Touch conversation (update updated_at)
    pub async fn touch(&self, conversation_id: ObjectId) -> Result<()> {
        let filter = doc! { "_id": conversation_id };
        let update = doc! { "$set": { "updated_at": bson::DateTime::now() } };
        self.collection.update_one(filter, update).await?;
        Ok(())
    }
}
