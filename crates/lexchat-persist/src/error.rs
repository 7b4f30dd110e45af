use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(String),

    #[error("Access denied to {0}")]
    Forbidden(String),

    #[error("No authenticated principal")]
    Unauthenticated,

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
