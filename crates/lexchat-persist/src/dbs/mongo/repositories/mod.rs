mod bookmark;
mod conversation;
mod message;

pub use bookmark::MongoBookmarkRepository;
pub use conversation::MongoConversationRepository;
pub use message::MongoMessageRepository;
