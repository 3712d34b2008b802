use crate::accumulator::AudioAccumulator;
use crate::capture::{ByteSink, CaptureSource};
use crate::chunk::AudioChunk;
use crate::config::PipelineConfig;
use crate::constants::audio::MIN_BYTES;
use crate::dispatch::DispatchQueue;
use crate::engine::SpeechEngine;
use crate::scheduler::ChunkScheduler;
use crate::transcript::{Transcript, TranscriptEntry};
use crate::worker::{TranscriptionOutcome, TranscriptionResult, TranscriptionWorker};
use anyhow::Result;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lifecycle of one recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    /// Capture and scheduler running, chunks flowing.
    Recording,
    /// Capture stopped; waiting for the session's queue to drain.
    Flushing,
}

/// Wires capture, accumulator, scheduler, dispatch queue, worker and
/// transcript into one state machine driven by the control loop.
///
/// The control loop calls `poll` on a short interval and `on_result` for
/// every result the worker posts; none of these block. The slow inference
/// lives entirely on the worker thread.
pub struct TranscriptionPipeline<C: CaptureSource> {
    capture: C,
    accumulator: Arc<AudioAccumulator>,
    scheduler: ChunkScheduler,
    queue: DispatchQueue,
    worker: TranscriptionWorker,
    transcript: Transcript,
    phase: SessionPhase,
    session: u64,
    next_sequence: u64,
}

impl<C: CaptureSource> TranscriptionPipeline<C> {
    pub fn new<E>(
        capture: C,
        engine: Arc<Mutex<E>>,
        config: &PipelineConfig,
    ) -> (Self, Receiver<TranscriptionResult>)
    where
        E: SpeechEngine + 'static,
    {
        Self::with_timing(capture, engine, config.chunk_period(), config.chunk_bytes())
    }

    /// Construction with explicit scheduler timing, used by tests to fire
    /// on every poll.
    pub fn with_timing<E>(
        capture: C,
        engine: Arc<Mutex<E>>,
        period: Duration,
        chunk_bytes: usize,
    ) -> (Self, Receiver<TranscriptionResult>)
    where
        E: SpeechEngine + 'static,
    {
        let (worker, results) = TranscriptionWorker::new(engine);
        let pipeline = TranscriptionPipeline {
            capture,
            accumulator: Arc::new(AudioAccumulator::new()),
            scheduler: ChunkScheduler::new(period, chunk_bytes, MIN_BYTES),
            queue: DispatchQueue::new(),
            worker,
            transcript: Transcript::new(),
            phase: SessionPhase::Idle,
            session: 0,
            next_sequence: 0,
        };
        (pipeline, results)
    }

    /// Begin a new recording session. A prior session's in-flight
    /// transcription is not interrupted; its late result will be dropped and
    /// its queued backlog is discarded now.
    pub fn start(&mut self) -> Result<()> {
        if self.capture.is_active() {
            return Ok(()); // already recording
        }

        let dropped = self.queue.clear();
        if dropped > 0 {
            log::info!("discarded {} queued chunks from previous session", dropped);
        }
        self.accumulator.take_all();

        self.session += 1;
        self.next_sequence = 0;

        let acc = Arc::clone(&self.accumulator);
        let sink: ByteSink = Arc::new(move |bytes| acc.append(bytes));
        self.capture.start(sink)?;

        self.scheduler.reset();
        self.phase = SessionPhase::Recording;
        log::info!("session {} recording", self.session);
        Ok(())
    }

    /// Stop capture, flush the final partial chunk and enter `Flushing`.
    /// The session settles back to `Idle` once its queue has drained.
    pub fn stop(&mut self) {
        if self.phase != SessionPhase::Recording {
            return;
        }

        self.capture.stop();

        if let Some(bytes) = self.scheduler.flush(&self.accumulator) {
            self.submit(bytes);
        }

        self.phase = SessionPhase::Flushing;
        self.try_settle();
    }

    /// Scheduler tick: extract one full window if a period has elapsed and
    /// enough data is present. Called on every pass of the control loop.
    pub fn poll(&mut self) {
        if self.phase != SessionPhase::Recording {
            return;
        }
        if let Some(bytes) = self.scheduler.poll(&self.accumulator) {
            self.submit(bytes);
        }
    }

    /// Deliver a worker completion: re-open admission, append the entry to
    /// the transcript (unless it belongs to a superseded session), dispatch
    /// the next queued chunk. Returns the appended entry for display.
    pub fn on_result(&mut self, result: TranscriptionResult) -> Option<TranscriptEntry> {
        self.queue.complete();

        let entry = if result.session == self.session {
            let entry = match result.outcome {
                TranscriptionOutcome::Text(text) => TranscriptEntry::Text {
                    sequence: result.sequence,
                    text,
                },
                TranscriptionOutcome::Failed(message) => {
                    log::warn!("{}", message);
                    TranscriptEntry::Error {
                        sequence: result.sequence,
                        message,
                    }
                }
            };
            match &entry {
                TranscriptEntry::Text { sequence, text } => {
                    self.transcript.append_text(*sequence, text.clone())
                }
                TranscriptEntry::Error { sequence, message } => {
                    self.transcript.append_error(*sequence, message.clone())
                }
            }
            Some(entry)
        } else {
            log::debug!(
                "dropping stale result from session {} (chunk {})",
                result.session,
                result.sequence
            );
            None
        };

        self.pump();
        self.try_settle();
        entry
    }

    fn submit(&mut self, bytes: Vec<u8>) {
        let chunk = AudioChunk::new(self.session, self.next_sequence, bytes);
        log::debug!(
            "session {} chunk {}: {:.2}s queued",
            chunk.session,
            chunk.sequence,
            chunk.duration_secs()
        );
        self.next_sequence += 1;
        self.queue.enqueue(chunk);
        self.pump();
    }

    fn pump(&mut self) {
        if let Some(chunk) = self.queue.try_admit() {
            self.worker.submit(chunk);
        }
    }

    fn try_settle(&mut self) {
        if self.phase == SessionPhase::Flushing && self.queue.is_drained() {
            self.phase = SessionPhase::Idle;
            log::info!("session {} complete", self.session);
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_recording(&self) -> bool {
        self.phase == SessionPhase::Recording
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn queued_chunks(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::audio::CHUNK_BYTES;

    struct EchoEngine;

    impl SpeechEngine for EchoEngine {
        fn transcribe(&mut self, samples: &[f32]) -> Result<Vec<String>> {
            Ok(vec![format!("{} samples", samples.len())])
        }
    }

    /// Capture double that hands the sink back to the test.
    #[derive(Clone, Default)]
    struct TestFeed(Arc<Mutex<Option<ByteSink>>>);

    impl TestFeed {
        fn push(&self, bytes: &[u8]) {
            if let Some(sink) = &*self.0.lock().unwrap() {
                sink(bytes);
            }
        }
    }

    struct TestCapture {
        feed: TestFeed,
        active: bool,
    }

    impl CaptureSource for TestCapture {
        fn start(&mut self, sink: ByteSink) -> Result<()> {
            *self.feed.0.lock().unwrap() = Some(sink);
            self.active = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn pipeline() -> (
        TranscriptionPipeline<TestCapture>,
        TestFeed,
        Receiver<TranscriptionResult>,
    ) {
        let feed = TestFeed::default();
        let capture = TestCapture {
            feed: feed.clone(),
            active: false,
        };
        let engine = Arc::new(Mutex::new(EchoEngine));
        let (pipeline, results) =
            TranscriptionPipeline::with_timing(capture, engine, Duration::ZERO, CHUNK_BYTES);
        (pipeline, feed, results)
    }

    fn drain_one(
        pipeline: &mut TranscriptionPipeline<TestCapture>,
        results: &Receiver<TranscriptionResult>,
    ) -> Option<TranscriptEntry> {
        let result = results.recv_timeout(Duration::from_secs(5)).unwrap();
        pipeline.on_result(result)
    }

    #[test]
    fn idle_until_started() {
        let (mut pipeline, feed, _results) = pipeline();
        assert_eq!(pipeline.phase(), SessionPhase::Idle);

        // Bytes pushed while idle go nowhere
        feed.push(&[0; 64]);
        pipeline.poll();
        assert_eq!(pipeline.queued_chunks(), 0);
    }

    #[test]
    fn full_session_reaches_idle_with_transcript() {
        let (mut pipeline, feed, results) = pipeline();
        pipeline.start().unwrap();
        assert!(pipeline.is_recording());

        feed.push(&vec![1; CHUNK_BYTES]);
        pipeline.poll();
        drain_one(&mut pipeline, &results).unwrap();

        feed.push(&vec![1; 100]);
        pipeline.stop();
        assert_eq!(pipeline.phase(), SessionPhase::Flushing);

        drain_one(&mut pipeline, &results).unwrap();
        assert_eq!(pipeline.phase(), SessionPhase::Idle);
        assert_eq!(pipeline.transcript().len(), 2);
    }

    #[test]
    fn stop_with_nothing_captured_settles_immediately() {
        let (mut pipeline, _feed, _results) = pipeline();
        pipeline.start().unwrap();
        pipeline.stop();
        assert_eq!(pipeline.phase(), SessionPhase::Idle);
        assert!(pipeline.transcript().is_empty());
    }

    #[test]
    fn stale_session_result_is_dropped_from_transcript() {
        let (mut pipeline, feed, results) = pipeline();
        pipeline.start().unwrap();
        feed.push(&vec![1; CHUNK_BYTES]);
        pipeline.poll();

        // Restart before the first session's result is delivered
        pipeline.stop();
        pipeline.start().unwrap();

        let stale = results.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(stale.session, 1);
        assert!(pipeline.on_result(stale).is_none());
        assert!(pipeline.transcript().is_empty());

        // The new session still works end to end
        feed.push(&vec![1; 200]);
        pipeline.stop();
        let entry = drain_one(&mut pipeline, &results).unwrap();
        assert_eq!(entry.sequence(), 0);
        assert_eq!(pipeline.transcript().len(), 1);
    }

    #[test]
    fn sequences_are_per_session() {
        let (mut pipeline, feed, results) = pipeline();
        pipeline.start().unwrap();
        feed.push(&vec![1; 100]);
        pipeline.stop();
        drain_one(&mut pipeline, &results).unwrap();

        pipeline.start().unwrap();
        feed.push(&vec![1; 100]);
        pipeline.stop();
        let entry = drain_one(&mut pipeline, &results).unwrap();
        assert_eq!(entry.sequence(), 0);
    }
}
