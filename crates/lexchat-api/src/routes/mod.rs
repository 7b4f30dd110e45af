pub mod bookmarks;
pub mod conversations;
pub mod health;
pub mod sessions;
