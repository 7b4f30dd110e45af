pub mod auth;
pub mod dbs;
pub mod error;
pub mod gateway;
pub mod models;
pub mod trait_client;

pub use auth::{AuthProvider, Principal, SessionAuth};
pub use dbs::InMemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use dbs::MongoPersistenceClient;
pub use error::{PersistError, Result};
pub use gateway::ConversationGateway;
pub use models::{derive_title, Bookmark, BookmarkKind, Conversation, NewBookmark, StoredMessage, TITLE_MAX_CHARS};
pub use trait_client::PersistenceClient;
