// transcript.rs
//
// Running transcript state for a live recognition session. Finalized text
// only ever grows within a session; interim text is the engine's current
// best guess and is replaced wholesale on every update.

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TranscriptState {
    finalized: String,
    interim: String,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized segment with its trailing separator. The interim
    /// guess it grew out of is cleared; the engine sends a fresh one if the
    /// speaker is still mid-utterance.
    pub fn push_final(&mut self, segment: &str) {
        self.finalized.push_str(segment);
        self.finalized.push(' ');
        self.interim.clear();
    }

    /// Replace the interim guess. Never appends.
    pub fn set_interim(&mut self, segment: &str) {
        self.interim.clear();
        self.interim.push_str(segment);
    }

    /// Clear both fields atomically.
    pub fn reset(&mut self) {
        self.finalized.clear();
        self.interim.clear();
    }

    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn is_empty(&self) -> bool {
        self.finalized.is_empty() && self.interim.is_empty()
    }
}
