use crate::chunk::AudioChunk;
use crate::constants::worker::HANDOVER_CAPACITY;
use crate::engine::SpeechEngine;
use std::sync::mpsc::{channel, sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Outcome of transcribing one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionOutcome {
    /// Concatenated segment text in the engine's reported order.
    Text(String),
    /// The engine failed on this chunk; processing continues with the next.
    Failed(String),
}

/// Posted back to the control loop when a chunk finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub session: u64,
    pub sequence: u64,
    pub outcome: TranscriptionOutcome,
}

/// Handle for the worker thread that runs the slow inference calls.
///
/// Chunks come in over a hand-over channel and results go back over an
/// unbounded result channel polled by the control loop. The engine mutex is
/// held only around the inference call itself, never while posting results,
/// so a completion can never deadlock against queue bookkeeping.
pub struct TranscriptionWorker {
    task_sender: SyncSender<AudioChunk>,
}

impl TranscriptionWorker {
    pub fn new<E>(engine: Arc<Mutex<E>>) -> (Self, Receiver<TranscriptionResult>)
    where
        E: SpeechEngine + 'static,
    {
        // Single-flight admission means at most one chunk is ever handed over
        let (task_tx, task_rx) = sync_channel::<AudioChunk>(HANDOVER_CAPACITY);
        let (result_tx, result_rx) = channel();

        thread::spawn(move || {
            log::debug!("transcription worker thread started");

            for chunk in task_rx {
                let session = chunk.session;
                let sequence = chunk.sequence;
                let samples = chunk.samples();

                let outcome = {
                    let mut engine = engine.lock().unwrap();
                    match engine.transcribe(&samples) {
                        Ok(segments) => {
                            TranscriptionOutcome::Text(segments.concat().trim().to_string())
                        }
                        Err(e) => TranscriptionOutcome::Failed(format!(
                            "transcription failed for chunk {}: {:#}",
                            sequence, e
                        )),
                    }
                }; // engine gate released before the result is posted

                let result = TranscriptionResult {
                    session,
                    sequence,
                    outcome,
                };
                if result_tx.send(result).is_err() {
                    log::debug!("result receiver dropped, stopping worker");
                    break;
                }
            }

            log::debug!("transcription worker thread stopped");
        });

        (TranscriptionWorker { task_sender: task_tx }, result_rx)
    }

    /// Hand an admitted chunk to the worker. With single-flight admission the
    /// channel always has room; a failed send means the worker thread died.
    pub fn submit(&self, chunk: AudioChunk) {
        if self.task_sender.send(chunk).is_err() {
            log::error!("transcription worker disconnected, chunk dropped");
        }
    }
}
