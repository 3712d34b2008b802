use crate::accumulator::AudioAccumulator;
use std::time::{Duration, Instant};

/// Periodic trigger that pulls fixed-size windows out of the accumulator
/// while capture is active, and flushes the remainder on stop.
///
/// The control loop polls this at a short interval; `poll` only actually
/// fires once per period. Not enough data at a fire is fine, the bytes keep
/// accumulating and come out on a later fire or in the flush. Every appended
/// byte ends up in exactly one extracted window.
pub struct ChunkScheduler {
    period: Duration,
    chunk_bytes: usize,
    min_bytes: usize,
    last_fire: Instant,
}

impl ChunkScheduler {
    pub fn new(period: Duration, chunk_bytes: usize, min_bytes: usize) -> Self {
        ChunkScheduler {
            period,
            chunk_bytes,
            min_bytes,
            last_fire: Instant::now(),
        }
    }

    /// Restart the fire timer for a new recording session.
    pub fn reset(&mut self) {
        self.last_fire = Instant::now();
    }

    /// Fire if a full period has elapsed. Returns a full window if the
    /// accumulator holds at least `chunk_bytes`, None otherwise.
    pub fn poll(&mut self, accumulator: &AudioAccumulator) -> Option<Vec<u8>> {
        if self.last_fire.elapsed() < self.period {
            return None;
        }
        self.last_fire = Instant::now();
        accumulator.take_first(self.chunk_bytes)
    }

    /// Drain everything left in the accumulator for the final chunk of a
    /// session, zero-padded up to `min_bytes` when shorter. Returns None if
    /// nothing was captured since the last extraction.
    pub fn flush(&mut self, accumulator: &AudioAccumulator) -> Option<Vec<u8>> {
        let mut bytes = accumulator.take_all();
        if bytes.is_empty() {
            return None;
        }
        if bytes.len() < self.min_bytes {
            bytes.resize(self.min_bytes, 0);
        }
        Some(bytes)
    }
}
