use std::sync::Mutex;

/// Thread-safe append-only byte buffer between the capture callback and the
/// chunk scheduler.
///
/// The capture thread appends raw PCM bytes; the scheduler atomically takes
/// either a fixed-size window from the front or everything that remains.
/// The lock is held only across the append/take itself, so the audio callback
/// never waits on transcription.
pub struct AudioAccumulator {
    buffer: Mutex<Vec<u8>>,
}

impl AudioAccumulator {
    pub fn new() -> Self {
        AudioAccumulator {
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Append captured bytes. Bytes from concurrent appends are never lost
    /// or interleaved mid-span; each append lands as one contiguous run.
    pub fn append(&self, bytes: &[u8]) {
        let Ok(mut buf) = self.buffer.lock() else {
            log::warn!("accumulator mutex poisoned, dropping {} bytes", bytes.len());
            return;
        };
        buf.extend_from_slice(bytes);
    }

    /// Atomically remove and return exactly the first `n` bytes, oldest first.
    /// Returns None and leaves the buffer untouched if fewer than `n` bytes
    /// are present.
    pub fn take_first(&self, n: usize) -> Option<Vec<u8>> {
        let mut buf = self.buffer.lock().unwrap();
        if buf.len() < n {
            return None;
        }
        Some(buf.drain(..n).collect())
    }

    /// Drain and return everything present, leaving the buffer empty.
    pub fn take_all(&self) -> Vec<u8> {
        let mut buf = self.buffer.lock().unwrap();
        std::mem::take(&mut *buf)
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AudioAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
