use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoBookmark;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoBookmarkRepository {
    collection: Collection<MongoBookmark>,
}

impl MongoBookmarkRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("saved_items");
        Self { collection }
    }

    pub async fn save_bookmark(&self, bookmark: &MongoBookmark) -> Result<()> {
        self.collection.insert_one(bookmark).await?;
        Ok(())
    }

    pub async fn list_bookmarks(&self, user_id: &str) -> Result<Vec<MongoBookmark>> {
        let filter = doc! { "user_id": user_id };
        let bookmarks = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(bookmarks)
    }

    pub async fn delete_bookmark(&self, bookmark_id: &str, user_id: &str) -> Result<bool> {
        let filter = doc! { "_id": bookmark_id, "user_id": user_id };
        let result = self.collection.delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }
}
