pub mod types;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod client;
pub mod relay;

pub use traits::{ChatClient, ChatRequest, EventStream};
pub use streaming::{ChatStreamChunk, StreamEvent};
pub use buffer_utils::{parse_frame, parse_sse_stream, Frame, LineBuffer, SseDecoder};
pub use client::CompletionClient;
pub use relay::{RelayClient, RelayError};
pub use types::{Message, Role};
