/// Application-wide constants for audio framing and chunk extraction

pub mod audio {
    /// Sample rate expected by Whisper (Hz)
    pub const SAMPLE_RATE: usize = 16000;

    /// Bytes per signed 16-bit little-endian PCM sample
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// Nominal chunk duration in seconds (configurable via settings)
    pub const CHUNK_SECONDS: usize = 5;

    /// Bytes in one nominal chunk
    pub const CHUNK_BYTES: usize = SAMPLE_RATE * BYTES_PER_SAMPLE * CHUNK_SECONDS;

    /// Minimum bytes the engine will accept (1 second floor, shorter
    /// final chunks are zero-padded up to this)
    pub const MIN_BYTES: usize = SAMPLE_RATE * BYTES_PER_SAMPLE;
}

pub mod worker {
    /// Capacity of the hand-over channel to the worker thread.
    /// Single-flight admission means at most one chunk is ever in it.
    pub const HANDOVER_CAPACITY: usize = 1;
}
