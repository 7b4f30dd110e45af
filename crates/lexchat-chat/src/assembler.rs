/// Accumulates content deltas of one assistant response.
///
/// Every `push` returns the whole text so far, so a display can replace
/// its previous rendering instead of patching it.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    buffer: String,
    deltas: usize,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the current snapshot.
    pub fn push(&mut self, delta: &str) -> &str {
        self.buffer.push_str(delta);
        self.deltas += 1;
        &self.buffer
    }

    pub fn snapshot(&self) -> &str {
        &self.buffer
    }

    pub fn delta_count(&self) -> usize {
        self.deltas
    }

    /// The message to persist, or `None` when no delta ever arrived.
    pub fn finish(self) -> Option<String> {
        (self.deltas > 0).then_some(self.buffer)
    }
}
