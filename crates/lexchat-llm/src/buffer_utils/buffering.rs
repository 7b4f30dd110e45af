use std::collections::VecDeque;

/// Carry-over buffer that turns arbitrarily split chunks into complete lines.
///
/// Bytes are kept until a `\n` arrives, so a frame (or a multi-byte UTF-8
/// character) split across two reads is reassembled before decoding.
pub struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract the next complete line, without its `\n` and one trailing `\r`.
    ///
    /// Returns None if no complete line is available.
    pub fn next_line(&mut self) -> Option<String> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;

        let mut line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        line_bytes.pop();
        if line_bytes.last() == Some(&b'\r') {
            line_bytes.pop();
        }

        Some(String::from_utf8_lossy(&line_bytes).into_owned())
    }

    /// Drop the unterminated remainder at end of stream, returning its length.
    pub fn discard_remainder(&mut self) -> usize {
        let len = self.buffer.len();
        self.buffer.clear();
        len
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_capacity(4096)
    }
}
