use thiserror::Error;

use lexchat_persist::PersistError;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("A response is still streaming")]
    Busy,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Completion failed: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("Turn abandoned by its consumer")]
    Abandoned,

    #[error(transparent)]
    Persist(#[from] PersistError),
}
