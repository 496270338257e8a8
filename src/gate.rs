//! Interaction gate: the serialization flag preventing overlapping turns.
//!
//! The gate is a passive flag. It records whether new input is being
//! accepted and which subsystem last changed that; enforcement happens
//! where input enters the system, not here.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    /// Accepting new input.
    Ready,
    /// A turn, listening phase, or startup is holding the gate.
    Busy,
}

/// The subsystem that last changed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateSource {
    Startup,
    Controller,
    Recognizer,
    Synthesizer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// The controller accepted an utterance and a turn is starting.
    SubmitAccepted,
    /// The final fragment was processed and the speech handoff dispatched.
    TurnFinished,
    /// Generation faulted; the turn is over.
    TurnFailed,
    /// The recognizer started listening.
    RecognitionStarted,
    /// The recognizer reported an error.
    RecognitionFailed,
    /// The recognizer produced no usable result.
    RecognitionEmpty,
    /// Speech output finished initializing.
    SynthesisInitialized,
    /// Speech output failed to initialize; text input stays usable.
    SynthesisUnavailable,
}

#[derive(Debug, Clone, Copy)]
pub struct InteractionGate {
    state: GateState,
    last_changed_by: GateSource,
}

impl InteractionGate {
    /// Gate for a session with speech output: closed until the
    /// synthesizer finishes initializing.
    pub fn new() -> Self {
        Self {
            state: GateState::Busy,
            last_changed_by: GateSource::Startup,
        }
    }

    /// Gate for a session with speech features disabled entirely:
    /// accepting input from the start.
    pub fn new_ready() -> Self {
        Self {
            state: GateState::Ready,
            last_changed_by: GateSource::Startup,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == GateState::Ready
    }

    pub fn last_changed_by(&self) -> GateSource {
        self.last_changed_by
    }

    /// Apply an event, returning whether the state changed. Events that
    /// are not valid in the current state are ignored.
    pub fn apply(&mut self, event: GateEvent) -> bool {
        let (target, source) = match event {
            GateEvent::SubmitAccepted => (GateState::Busy, GateSource::Controller),
            GateEvent::TurnFinished | GateEvent::TurnFailed => {
                (GateState::Ready, GateSource::Controller)
            }
            GateEvent::RecognitionStarted => (GateState::Busy, GateSource::Recognizer),
            GateEvent::RecognitionFailed | GateEvent::RecognitionEmpty => {
                (GateState::Ready, GateSource::Recognizer)
            }
            GateEvent::SynthesisInitialized | GateEvent::SynthesisUnavailable => {
                (GateState::Ready, GateSource::Synthesizer)
            }
        };

        if self.state == target {
            debug!(?event, state = ?self.state, "gate event ignored in current state");
            return false;
        }

        self.state = target;
        self.last_changed_by = source;
        true
    }
}

impl Default for InteractionGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_busy_until_synthesis_initializes() {
        let mut gate = InteractionGate::new();
        assert_eq!(gate.state(), GateState::Busy);
        assert!(gate.apply(GateEvent::SynthesisInitialized));
        assert_eq!(gate.state(), GateState::Ready);
        assert_eq!(gate.last_changed_by(), GateSource::Synthesizer);
    }

    #[test]
    fn starts_ready_when_speech_disabled() {
        let gate = InteractionGate::new_ready();
        assert!(gate.is_ready());
        assert_eq!(gate.last_changed_by(), GateSource::Startup);
    }

    #[test]
    fn submit_closes_and_turn_end_reopens() {
        let mut gate = InteractionGate::new_ready();
        assert!(gate.apply(GateEvent::SubmitAccepted));
        assert_eq!(gate.state(), GateState::Busy);
        assert_eq!(gate.last_changed_by(), GateSource::Controller);
        assert!(gate.apply(GateEvent::TurnFinished));
        assert!(gate.is_ready());
    }

    #[test]
    fn turn_failure_reopens() {
        let mut gate = InteractionGate::new_ready();
        gate.apply(GateEvent::SubmitAccepted);
        assert!(gate.apply(GateEvent::TurnFailed));
        assert!(gate.is_ready());
    }

    #[test]
    fn recognition_lifecycle() {
        let mut gate = InteractionGate::new_ready();
        assert!(gate.apply(GateEvent::RecognitionStarted));
        assert_eq!(gate.last_changed_by(), GateSource::Recognizer);
        assert!(gate.apply(GateEvent::RecognitionEmpty));
        assert!(gate.is_ready());

        gate.apply(GateEvent::RecognitionStarted);
        assert!(gate.apply(GateEvent::RecognitionFailed));
        assert!(gate.is_ready());
    }

    #[test]
    fn double_submit_is_a_noop() {
        let mut gate = InteractionGate::new_ready();
        assert!(gate.apply(GateEvent::SubmitAccepted));
        assert!(!gate.apply(GateEvent::SubmitAccepted));
        assert_eq!(gate.state(), GateState::Busy);
    }

    #[test]
    fn reopen_when_already_ready_is_a_noop() {
        let mut gate = InteractionGate::new_ready();
        assert!(!gate.apply(GateEvent::TurnFinished));
        assert_eq!(gate.last_changed_by(), GateSource::Startup);
    }
}
