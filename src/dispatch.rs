use crate::chunk::AudioChunk;
use std::collections::VecDeque;
use std::sync::Mutex;

struct Inner {
    queue: VecDeque<AudioChunk>,
    in_flight: bool,
}

/// FIFO holding area for chunks awaiting transcription, with single-flight
/// admission control.
///
/// At most one chunk is being transcribed at any instant; the next is
/// admitted only after the previous invocation's result has been delivered.
/// Admission check and flag mutation happen under one lock, so two
/// completions can never both dispatch. The queue itself is unbounded: a slow
/// engine stalls admission, never enqueueing.
pub struct DispatchQueue {
    inner: Mutex<Inner>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        DispatchQueue {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                in_flight: false,
            }),
        }
    }

    /// Append a chunk at the tail.
    pub fn enqueue(&self, chunk: AudioChunk) {
        self.inner.lock().unwrap().queue.push_back(chunk);
    }

    /// Atomically admit the head chunk for transcription if nothing is in
    /// flight. Admission sets the in-flight flag; the caller must hand the
    /// chunk to the worker and later call `complete`.
    pub fn try_admit(&self) -> Option<AudioChunk> {
        let mut inner = self.inner.lock().unwrap();
        if inner.in_flight {
            return None;
        }
        let chunk = inner.queue.pop_front()?;
        inner.in_flight = true;
        Some(chunk)
    }

    /// Mark the in-flight transcription as delivered, re-opening admission.
    pub fn complete(&self) {
        self.inner.lock().unwrap().in_flight = false;
    }

    /// Discard all queued chunks (a new session supersedes the old one's
    /// backlog). Does not touch the in-flight flag; a running transcription
    /// still completes.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let dropped = inner.queue.len();
        inner.queue.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> bool {
        self.inner.lock().unwrap().in_flight
    }

    /// True once nothing is queued and nothing is being transcribed.
    pub fn is_drained(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.queue.is_empty() && !inner.in_flight
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(sequence: u64) -> AudioChunk {
        AudioChunk::new(1, sequence, vec![0; 4])
    }

    #[test]
    fn admits_in_fifo_order() {
        let queue = DispatchQueue::new();
        queue.enqueue(chunk(0));
        queue.enqueue(chunk(1));
        queue.enqueue(chunk(2));

        assert_eq!(queue.try_admit().unwrap().sequence, 0);
        queue.complete();
        assert_eq!(queue.try_admit().unwrap().sequence, 1);
        queue.complete();
        assert_eq!(queue.try_admit().unwrap().sequence, 2);
    }

    #[test]
    fn no_admission_while_in_flight() {
        let queue = DispatchQueue::new();
        queue.enqueue(chunk(0));
        queue.enqueue(chunk(1));

        assert!(queue.try_admit().is_some());
        // Second chunk stays queued until completion is delivered
        assert!(queue.try_admit().is_none());
        assert_eq!(queue.len(), 1);

        queue.complete();
        assert_eq!(queue.try_admit().unwrap().sequence, 1);
    }

    #[test]
    fn admit_on_empty_queue_is_none_and_leaves_flag_clear() {
        let queue = DispatchQueue::new();
        assert!(queue.try_admit().is_none());
        assert!(!queue.in_flight());
    }

    #[test]
    fn drained_only_when_empty_and_idle() {
        let queue = DispatchQueue::new();
        assert!(queue.is_drained());

        queue.enqueue(chunk(0));
        assert!(!queue.is_drained());

        queue.try_admit().unwrap();
        assert!(!queue.is_drained());

        queue.complete();
        assert!(queue.is_drained());
    }

    #[test]
    fn clear_drops_backlog_but_not_in_flight() {
        let queue = DispatchQueue::new();
        queue.enqueue(chunk(0));
        queue.enqueue(chunk(1));
        queue.enqueue(chunk(2));
        queue.try_admit().unwrap();

        assert_eq!(queue.clear(), 2);
        assert!(queue.in_flight());
        assert!(queue.is_empty());
    }
}
