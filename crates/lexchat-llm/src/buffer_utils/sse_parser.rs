use anyhow::Result;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

use super::buffering::LineBuffer;
use crate::streaming::{ChatStreamChunk, StreamEvent};

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// One line of the event stream, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Separator, comment, non-data field, or a chunk without content.
    Ignored,
    Delta(String),
    Done,
    /// A `data: ` line whose payload did not parse.
    Malformed,
}

/// Classify a single line.
pub fn parse_frame(line: &str) -> Frame {
    if line.trim().is_empty() || line.starts_with(':') {
        return Frame::Ignored;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    let payload = payload.trim();

    if payload == DONE_MARKER {
        return Frame::Done;
    }

    match serde_json::from_str::<ChatStreamChunk>(payload) {
        Ok(chunk) => match chunk.content() {
            Some(content) if !content.is_empty() => Frame::Delta(content.to_string()),
            _ => Frame::Ignored,
        },
        Err(_) => Frame::Malformed,
    }
}

/// A non-empty line that would otherwise be ignored as a non-data field.
fn is_continuation(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with(':') && !line.starts_with("data:")
}

/// Incremental decoder: bytes in, stream events out.
///
/// A `data: ` line that fails to parse is carried over and retried once,
/// joined to the following line, in case a frame was broken by a stray line
/// feed. Fragments that cannot be recovered are dropped with a warning.
pub struct SseDecoder {
    lines: LineBuffer,
    fragment: Option<String>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            lines: LineBuffer::with_capacity(8192),
            fragment: None,
            done: false,
        }
    }

    /// Whether `[DONE]` has been seen. Nothing is decoded after that.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one chunk and return the events completed by it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.lines.extend(bytes);
        while let Some(line) = self.lines.next_line() {
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
            if self.done {
                break;
            }
        }

        events
    }

    fn process_line(&mut self, line: String) -> Option<StreamEvent> {
        let (line, rejoined) = match self.fragment.take() {
            Some(fragment) if is_continuation(&line) => (format!("{}\n{}", fragment, line), true),
            Some(fragment) => {
                tracing::warn!(bytes = fragment.len(), "Dropping unparseable stream frame");
                (line, false)
            }
            None => (line, false),
        };

        match parse_frame(&line) {
            Frame::Ignored => None,
            Frame::Delta(content) => Some(StreamEvent::Message { content }),
            Frame::Done => {
                self.done = true;
                Some(StreamEvent::Done)
            }
            Frame::Malformed if !rejoined => {
                tracing::debug!("Frame did not parse, waiting for continuation");
                self.fragment = Some(line);
                None
            }
            Frame::Malformed => {
                tracing::warn!(bytes = line.len(), "Dropping unparseable stream frame after re-sync");
                None
            }
        }
    }

    /// Close the decoder at end of input. Returns whether `[DONE]` was seen.
    pub fn finish(&mut self) -> bool {
        if let Some(fragment) = self.fragment.take() {
            tracing::warn!(bytes = fragment.len(), "Stream ended with an unparseable frame");
        }
        let discarded = self.lines.discard_remainder();
        if discarded > 0 {
            tracing::debug!(bytes = discarded, "Discarding unterminated line at end of stream");
        }
        self.done
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a chunked body into content deltas terminated by `StreamEvent::Done`.
///
/// Ending without `[DONE]` yields a final error item.
pub fn parse_sse_stream<S, B, E>(
    chunks: S,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut decoder = SseDecoder::new();
        let mut failed = false;

        while let Some(chunk_result) = chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for event in decoder.feed(bytes.as_ref()) {
                        yield Ok(event);
                    }
                    if decoder.is_done() {
                        break;
                    }
                }
                Err(e) => {
                    failed = true;
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            }
        }

        if !decoder.finish() && !failed {
            yield Err(anyhow::anyhow!("Stream ended before [DONE]"));
        }
    })
}
