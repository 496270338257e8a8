//! Speech-output seam and an in-process queue implementation.

use crate::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// How an utterance joins the synthesis queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Append after anything already queued.
    Queue,
    /// Drop the queue and speak immediately.
    Flush,
}

/// External speech-synthesis capability. `speak` is fire-and-forget:
/// the session does not wait for playback.
pub trait SpeechSynthesizer: Send {
    /// One-time startup of the underlying speech service.
    fn initialize(&mut self) -> Result<()>;

    fn speak(&mut self, text: &str, mode: QueueMode) -> Result<()>;
}

/// Shared queue of pending utterances, readable by whatever drives the
/// actual audio output.
#[derive(Debug, Clone, Default)]
pub struct SpeechQueue {
    utterances: Arc<Mutex<VecDeque<String>>>,
}

impl SpeechQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, text: String) {
        self.utterances.lock().push_back(text);
    }

    pub fn dequeue(&self) -> Option<String> {
        self.utterances.lock().pop_front()
    }

    pub fn clear(&self) {
        self.utterances.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.utterances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.lock().is_empty()
    }
}

/// Synthesizer that hands utterances to a [`SpeechQueue`]. Used by the
/// REPL binary and by tests; platform back ends replace it wholesale.
pub struct QueuedSynthesizer {
    queue: SpeechQueue,
}

impl QueuedSynthesizer {
    pub fn new(queue: SpeechQueue) -> Self {
        Self { queue }
    }
}

impl SpeechSynthesizer for QueuedSynthesizer {
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn speak(&mut self, text: &str, mode: QueueMode) -> Result<()> {
        if mode == QueueMode::Flush {
            self.queue.clear();
        }
        debug!(chars = text.len(), ?mode, "queueing utterance for synthesis");
        self.queue.enqueue(text.to_string());
        Ok(())
    }
}
