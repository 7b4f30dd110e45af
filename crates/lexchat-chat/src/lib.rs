pub mod assembler;
pub mod error;
pub mod events;
pub mod session;

pub use assembler::TranscriptAssembler;
pub use error::TurnError;
pub use events::{ChatEvent, EMPTY_RESPONSE_NOTICE, SIGN_IN_NOTICE, TRANSPORT_FAILURE_MESSAGE};
pub use session::{ChatSession, SessionSnapshot, TurnOutcome, EVENT_CHANNEL_CAPACITY};
