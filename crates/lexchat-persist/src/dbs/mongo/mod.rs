mod client;
mod models;
mod repositories;

pub use client::MongoPersistenceClient;
pub use models::{MongoBookmark, MongoConversation, MongoMessage};
pub use repositories::{MongoBookmarkRepository, MongoConversationRepository, MongoMessageRepository};
