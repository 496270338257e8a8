//! Folds an ordered fragment stream into the single in-progress message.

use crate::chat::{ConversationLog, FragmentOutcome};
use crate::generate::Fragment;
use uuid::Uuid;

/// Accumulates one response stream against a target message id.
///
/// The first fragment replaces the placeholder content outright (the
/// runtime's first fragment may carry leading context that must be set,
/// not concatenated); later fragments append. A final fragment completes
/// the message, after which everything else is ignored.
#[derive(Debug)]
pub struct ResponseAssembler {
    target: Uuid,
    received_any: bool,
    finished: bool,
}

impl ResponseAssembler {
    pub fn new(target: Uuid) -> Self {
        Self {
            target,
            received_any: false,
            finished: false,
        }
    }

    pub fn target(&self) -> Uuid {
        self.target
    }

    /// Whether a final fragment has been processed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether any fragment has been applied.
    pub fn received_any(&self) -> bool {
        self.received_any
    }

    /// Apply one stream element to the log.
    pub fn apply(&mut self, log: &mut ConversationLog, fragment: &Fragment) -> FragmentOutcome {
        if self.finished {
            return FragmentOutcome::Stale;
        }

        let outcome = if !self.received_any {
            self.received_any = true;
            match log.replace_content(self.target, &fragment.text) {
                FragmentOutcome::Applied if fragment.is_final => log.finalize(self.target),
                other => other,
            }
        } else {
            log.append_fragment(self.target, &fragment.text, fragment.is_final)
        };

        if fragment.is_final || outcome == FragmentOutcome::Stale {
            self.finished = true;
        }
        outcome
    }

    /// Close out a stream that ended without a final marker, completing
    /// the message with whatever content accumulated.
    pub fn finish(&mut self, log: &mut ConversationLog) -> FragmentOutcome {
        if self.finished {
            return FragmentOutcome::Stale;
        }
        self.finished = true;
        log.finalize(self.target)
    }
}
