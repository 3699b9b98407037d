/// Stored when a take produced no recognized speech
pub const NO_TRANSCRIPT: &str = "No transcript available";

/// Final recognition segments of one take, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptBuffer {
    segments: Vec<String>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a final segment; blank segments are dropped
    pub fn push_final(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.segments.push(trimmed.to_string());
        true
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Every segment followed by a single space
    pub fn text(&self) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            text.push_str(segment);
            text.push(' ');
        }
        text
    }

    /// The value written to the attempt record
    pub fn persisted_text(&self) -> String {
        let text = self.text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            NO_TRANSCRIPT.to_string()
        } else {
            trimmed.to_string()
        }
    }
}
