/// One processed chunk's contribution to the transcript. The sequence number
/// is retained for diagnostics and error attribution even though arrival
/// order already equals submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Text { sequence: u64, text: String },
    Error { sequence: u64, message: String },
}

impl TranscriptEntry {
    pub fn sequence(&self) -> u64 {
        match self {
            TranscriptEntry::Text { sequence, .. } => *sequence,
            TranscriptEntry::Error { sequence, .. } => *sequence,
        }
    }
}

/// Append-only ordered transcript exposed to the presentation layer.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript {
            entries: Vec::new(),
        }
    }

    pub fn append_text(&mut self, sequence: u64, text: String) {
        self.entries.push(TranscriptEntry::Text { sequence, text });
    }

    pub fn append_error(&mut self, sequence: u64, message: String) {
        self.entries
            .push(TranscriptEntry::Error { sequence, message });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full visible text: successful entries joined with spaces, error
    /// entries rendered as bracketed markers.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| match entry {
                TranscriptEntry::Text { text, .. } => text.clone(),
                TranscriptEntry::Error { sequence, .. } => {
                    format!("[transcription error on chunk {}]", sequence)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_arrival_order() {
        let mut transcript = Transcript::new();
        transcript.append_text(0, "hello".to_string());
        transcript.append_error(1, "engine status -1".to_string());
        transcript.append_text(2, "world".to_string());

        let sequences: Vec<u64> = transcript.entries().iter().map(|e| e.sequence()).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn render_marks_errors_with_sequence() {
        let mut transcript = Transcript::new();
        transcript.append_text(0, "hello".to_string());
        transcript.append_error(1, "boom".to_string());

        assert_eq!(transcript.render(), "hello [transcription error on chunk 1]");
    }
}
