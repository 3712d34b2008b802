use crate::constants::audio::{BYTES_PER_SAMPLE, SAMPLE_RATE};

/// A bounded span of 16-bit little-endian PCM audio submitted as one unit
/// for transcription.
///
/// Tagged with the recording session it belongs to and its position within
/// that session. Consumed by exactly one worker invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub session: u64,
    pub sequence: u64,
    pub bytes: Vec<u8>,
}

impl AudioChunk {
    pub fn new(session: u64, sequence: u64, bytes: Vec<u8>) -> Self {
        AudioChunk {
            session,
            sequence,
            bytes,
        }
    }

    /// Zero-pad the chunk up to `min_bytes` if it is shorter. Chunks already
    /// at or above the floor are left untouched.
    pub fn pad_to(&mut self, min_bytes: usize) {
        if self.bytes.len() < min_bytes {
            self.bytes.resize(min_bytes, 0);
        }
    }

    /// Reinterpret the bytes as signed 16-bit LE samples normalized to
    /// f32 in [-1, 1]. A trailing odd byte (malformed input) is ignored.
    pub fn samples(&self) -> Vec<f32> {
        self.bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect()
    }

    pub fn duration_secs(&self) -> f32 {
        self.bytes.len() as f32 / (SAMPLE_RATE * BYTES_PER_SAMPLE) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::audio::MIN_BYTES;

    #[test]
    fn samples_normalizes_i16_le() {
        let bytes = [
            0i16.to_le_bytes(),
            i16::MAX.to_le_bytes(),
            i16::MIN.to_le_bytes(),
            (-16384i16).to_le_bytes(),
        ]
        .concat();
        let chunk = AudioChunk::new(1, 0, bytes);

        let samples = chunk.samples();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(samples[2], -1.0);
        assert_eq!(samples[3], -0.5);
    }

    #[test]
    fn pad_to_extends_short_chunk_with_zeros() {
        let mut chunk = AudioChunk::new(1, 0, vec![7; 100]);
        chunk.pad_to(MIN_BYTES);

        assert_eq!(chunk.bytes.len(), MIN_BYTES);
        assert!(chunk.bytes[100..].iter().all(|&b| b == 0));
        assert!(chunk.bytes[..100].iter().all(|&b| b == 7));
    }

    #[test]
    fn pad_to_leaves_long_chunk_alone() {
        let mut chunk = AudioChunk::new(1, 0, vec![7; MIN_BYTES + 4]);
        chunk.pad_to(MIN_BYTES);
        assert_eq!(chunk.bytes.len(), MIN_BYTES + 4);
    }

    #[test]
    fn duration_counts_sample_pairs() {
        let chunk = AudioChunk::new(1, 0, vec![0; MIN_BYTES]);
        assert_eq!(chunk.duration_secs(), 1.0);
    }
}
