use bson::oid::ObjectId;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    Client, Collection,
};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

/// Creation time, then insertion sequence for equal timestamps
fn transcript_order() -> Document {
    doc! { "created_at": 1, "seq": 1 }
}

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    /// Save a single message
    pub async fn save_message(&self, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).await?;
        Ok(())
    }

    /// Get all messages for a conversation in creation order
    pub async fn get_messages(&self, conversation_id: ObjectId) -> Result<Vec<MongoMessage>> {
        let filter = doc! { "conversation_id": conversation_id };
        let messages = self
            .collection
            .find(filter)
            .sort(transcript_order())
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_order_breaks_ties_by_seq() {
        let keys: Vec<&str> = transcript_order().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["created_at", "seq"]);
    }
}
