//! The session controller: the one stateful orchestration path.
//!
//! A dedicated worker thread owns the conversation log and the
//! interaction gate. Commands arrive on a bounded channel; every
//! mutation publishes an immutable snapshot through a watch channel.
//! Nothing outside the worker can touch the log or the gate, so there
//! is no locking discipline to get wrong.

use crate::chat::{Author, ChatMessage, ConversationLog, MessageStatus};
use crate::gate::{GateEvent, GateSource, GateState, InteractionGate};
use crate::generate::TextGenerator;
use crate::prompt::build_prompt;
use crate::session::assembler::ResponseAssembler;
use crate::speech::{best_transcript, QueueMode, RecognitionCandidate, SpeechSynthesizer};
use crate::{ParleyError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use futures::StreamExt;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// When false the gate starts open and no synthesizer is initialized.
    pub speech_enabled: bool,

    /// Capacity of the command channel.
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speech_enabled: true,
            command_buffer: 100,
        }
    }
}

impl SessionConfig {
    pub fn without_speech(mut self) -> Self {
        self.speech_enabled = false;
        self
    }
}

/// Commands marshaled onto the session worker. All mutation of the log
/// and gate happens through these.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// A typed utterance from the input surface.
    SubmitText(String),

    /// A transcript already selected from recognition results.
    SubmitRecognized(String),

    /// The recognizer began listening.
    RecognitionStarted,

    /// The recognizer finished with ranked candidates.
    RecognitionCompleted(Vec<RecognitionCandidate>),

    /// The recognizer reported an error.
    RecognitionFailed(String),

    /// Stop the worker.
    Shutdown,
}

/// Immutable view of the session published to observers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Conversation log, insertion order (oldest first).
    pub messages: Vec<ChatMessage>,
    pub gate: GateState,
    pub gate_source: GateSource,
    /// Whether speech output initialized successfully.
    pub speech_available: bool,
}

impl SessionSnapshot {
    pub fn is_ready(&self) -> bool {
        self.gate == GateState::Ready
    }

    /// Messages ordered for rendering (newest first).
    pub fn messages_newest_first(&self) -> Vec<ChatMessage> {
        let mut messages = self.messages.clone();
        messages.reverse();
        messages
    }
}

/// Result of offering an utterance at the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// The gate was busy; the utterance was not queued.
    RejectedBusy,
}

/// Cloneable handle for feeding the session and observing it.
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: Sender<SessionCommand>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Submit a typed utterance. Rejected without queueing when the gate
    /// is busy; the worker re-checks to close the race.
    pub fn submit_text(&self, text: impl Into<String>) -> Result<SubmitOutcome> {
        if self.snapshot_rx.borrow().gate == GateState::Busy {
            debug!("gate busy; text submission rejected at input surface");
            return Ok(SubmitOutcome::RejectedBusy);
        }
        self.send(SessionCommand::SubmitText(text.into()))?;
        Ok(SubmitOutcome::Accepted)
    }

    /// Submit a transcript the recognition layer already selected.
    pub fn submit_from_recognized_speech(&self, transcript: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::SubmitRecognized(transcript.into()))
    }

    /// Recognizer callback: listening began.
    pub fn notify_recognition_started(&self) -> Result<()> {
        self.send(SessionCommand::RecognitionStarted)
    }

    /// Recognizer callback: ranked candidates are in. The session picks
    /// the highest-confidence transcript itself.
    pub fn submit_recognition_results(
        &self,
        candidates: Vec<RecognitionCandidate>,
    ) -> Result<()> {
        self.send(SessionCommand::RecognitionCompleted(candidates))
    }

    /// Recognizer callback: recognition errored out.
    pub fn notify_recognition_failed(&self, reason: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::RecognitionFailed(reason.into()))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }

    /// Subscribe to snapshot updates. The receiver always holds the
    /// latest published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| ParleyError::Channel(format!("failed to send session command: {}", e)))
    }
}

/// Where an utterance entered the system. Recognized speech arrives
/// while the recognizer itself holds the gate busy, so its gate handling
/// differs from the input surface's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    InputSurface,
    Recognizer,
}

pub struct SessionController {
    log: ConversationLog,
    gate: InteractionGate,
    speech_available: bool,
    generator: Box<dyn TextGenerator>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Spawn the session worker and return its handle.
    pub fn start(
        config: SessionConfig,
        generator: Box<dyn TextGenerator>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Result<SessionHandle> {
        let (command_tx, command_rx) = bounded(config.command_buffer);

        let gate = if config.speech_enabled {
            InteractionGate::new()
        } else {
            InteractionGate::new_ready()
        };

        let initial = SessionSnapshot {
            messages: Vec::new(),
            gate: gate.state(),
            gate_source: gate.last_changed_by(),
            speech_available: false,
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        std::thread::Builder::new()
            .name("parley-session".into())
            .spawn(move || {
                let runtime = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("failed to create session runtime: {}", e);
                        return;
                    }
                };

                let controller = SessionController {
                    log: ConversationLog::new(),
                    gate,
                    speech_available: false,
                    generator,
                    synthesizer,
                    snapshot_tx,
                };
                controller.run(&runtime, command_rx, config);
            })
            .map_err(|e| ParleyError::Channel(format!("failed to spawn session worker: {}", e)))?;

        Ok(SessionHandle {
            command_tx,
            snapshot_rx,
        })
    }

    fn run(mut self, runtime: &Runtime, command_rx: Receiver<SessionCommand>, config: SessionConfig) {
        info!("session worker starting");

        if config.speech_enabled {
            match self.synthesizer.initialize() {
                Ok(()) => {
                    self.speech_available = true;
                    self.gate.apply(GateEvent::SynthesisInitialized);
                }
                Err(e) => {
                    // Text input stays usable; only speech output is lost.
                    warn!("speech output unavailable: {}", e);
                    self.gate.apply(GateEvent::SynthesisUnavailable);
                }
            }
        }
        self.publish();
        info!("session worker ready");

        loop {
            match command_rx.recv() {
                Ok(SessionCommand::SubmitText(text)) => {
                    self.handle_utterance(runtime, text, Origin::InputSurface);
                }
                Ok(SessionCommand::SubmitRecognized(transcript)) => {
                    self.handle_utterance(runtime, transcript, Origin::Recognizer);
                }
                Ok(SessionCommand::RecognitionStarted) => {
                    if self.gate.apply(GateEvent::RecognitionStarted) {
                        self.publish();
                    }
                }
                Ok(SessionCommand::RecognitionCompleted(candidates)) => {
                    match best_transcript(&candidates) {
                        Some(transcript) => {
                            let transcript = transcript.to_string();
                            self.handle_utterance(runtime, transcript, Origin::Recognizer);
                        }
                        None => {
                            debug!("recognizer produced no usable transcript");
                            if self.gate.apply(GateEvent::RecognitionEmpty) {
                                self.publish();
                            }
                        }
                    }
                }
                Ok(SessionCommand::RecognitionFailed(reason)) => {
                    warn!("recognition failed: {}", reason);
                    if self.gate.apply(GateEvent::RecognitionFailed) {
                        self.publish();
                    }
                }
                Ok(SessionCommand::Shutdown) => {
                    info!("session worker shutting down");
                    break;
                }
                Err(e) => {
                    warn!("command channel closed: {}", e);
                    break;
                }
            }
        }

        info!("session worker stopped");
    }

    fn handle_utterance(&mut self, runtime: &Runtime, text: String, origin: Origin) {
        let text = text.trim().to_string();
        if text.is_empty() {
            if origin == Origin::Recognizer && self.gate.apply(GateEvent::RecognitionEmpty) {
                self.publish();
            }
            return;
        }

        match origin {
            Origin::InputSurface => {
                if !self.gate.is_ready() {
                    debug!("gate busy; utterance rejected");
                    return;
                }
            }
            Origin::Recognizer => {
                if !self.gate.is_ready() {
                    if self.gate.last_changed_by() == GateSource::Recognizer {
                        // Listening phase ends; the turn re-takes the gate
                        // below, before the next snapshot goes out.
                        self.gate.apply(GateEvent::RecognitionEmpty);
                    } else {
                        debug!("turn in flight; recognized utterance dropped");
                        return;
                    }
                }
            }
        }

        self.run_turn(runtime, &text);
    }

    /// One full turn: prompt, generation stream, assembly, speech
    /// handoff. All faults are absorbed here and surfaced as state.
    fn run_turn(&mut self, runtime: &Runtime, text: &str) {
        debug!(chars = text.len(), "turn started");

        // Prompt is built from the log as it stood at submission plus
        // the new open user turn, so the turn appears exactly once.
        let prompt = build_prompt(self.log.messages(), text);

        self.log.append(Author::User, text, MessageStatus::Complete);
        let target = match self.log.begin_model_message() {
            Ok(id) => id,
            Err(e) => {
                // Unreachable under correct gate enforcement.
                error!("failed to begin model message: {}", e);
                self.log
                    .append(Author::Model, e.user_message(), MessageStatus::Complete);
                self.publish();
                return;
            }
        };
        self.gate.apply(GateEvent::SubmitAccepted);
        self.publish();

        match runtime.block_on(self.consume_stream(&prompt, target)) {
            Ok(()) => {
                let spoken = self
                    .log
                    .get(target)
                    .map(|m| m.display_text())
                    .unwrap_or_default();
                if self.speech_available && !spoken.is_empty() {
                    // Fire-and-forget: the gate reopens once the handoff
                    // is dispatched, not when playback ends.
                    if let Err(e) = self.synthesizer.speak(&spoken, QueueMode::Queue) {
                        warn!("speech handoff failed: {}", e);
                    }
                }
                self.gate.apply(GateEvent::TurnFinished);
                self.publish();
                debug!("turn finished");
            }
            Err(fault) => {
                warn!("turn failed: {}", fault);
                self.log.finalize(target);
                self.log
                    .append(Author::Model, fault.user_message(), MessageStatus::Complete);
                self.gate.apply(GateEvent::TurnFailed);
                self.publish();
            }
        }
    }

    async fn consume_stream(&mut self, prompt: &str, target: Uuid) -> Result<()> {
        let mut stream = self.generator.generate(prompt);
        let mut assembler = ResponseAssembler::new(target);

        while let Some(item) = stream.next().await {
            let fragment = item?;
            let is_final = fragment.is_final;
            assembler.apply(&mut self.log, &fragment);
            self.publish();
            if is_final {
                return Ok(());
            }
        }

        // Stream exhausted without a final marker.
        if assembler.received_any() {
            assembler.finish(&mut self.log);
            self.publish();
            Ok(())
        } else {
            Err(ParleyError::Generation("stream produced no output".into()))
        }
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            messages: self.log.snapshot(),
            gate: self.gate.state(),
            gate_source: self.gate.last_changed_by(),
            speech_available: self.speech_available,
        };
        // Send only fails with no receivers; the session keeps running.
        let _ = self.snapshot_tx.send(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = SessionConfig::default();
        assert!(config.speech_enabled);
        assert!(config.command_buffer > 0);
    }

    #[test]
    fn without_speech_disables_speech() {
        let config = SessionConfig::default().without_speech();
        assert!(!config.speech_enabled);
    }

    #[test]
    fn snapshot_newest_first_reverses() {
        let snapshot = SessionSnapshot {
            messages: vec![
                ChatMessage::new(Author::User, "first", MessageStatus::Complete),
                ChatMessage::new(Author::Model, "second", MessageStatus::Complete),
            ],
            gate: GateState::Ready,
            gate_source: GateSource::Controller,
            speech_available: false,
        };
        let newest_first = snapshot.messages_newest_first();
        assert_eq!(newest_first[0].raw_content, "second");
    }
}
