mod bookmark;
mod conversation;
mod message;

pub use bookmark::{Bookmark, BookmarkKind, NewBookmark};
pub use conversation::{derive_title, Conversation, TITLE_MAX_CHARS};
pub use message::StoredMessage;
