//! Speech-recognition results as the session consumes them.
//!
//! Platform recognizers report many callbacks; only three matter here:
//! recognition started, recognition completed with ranked candidates,
//! and recognition failed. Adapters forward those through the
//! [`SessionHandle`](crate::session::SessionHandle); volume levels,
//! buffers, and partial hypotheses are diagnostic and dropped.

use serde::{Deserialize, Serialize};

/// One ranked hypothesis from the recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionCandidate {
    pub transcript: String,
    pub confidence: f32,
}

impl RecognitionCandidate {
    pub fn new(transcript: impl Into<String>, confidence: f32) -> Self {
        Self {
            transcript: transcript.into(),
            confidence,
        }
    }
}

/// Pick the highest-confidence non-blank transcript, if any.
pub fn best_transcript(candidates: &[RecognitionCandidate]) -> Option<&str> {
    candidates
        .iter()
        .filter(|c| !c.transcript.trim().is_empty())
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|c| c.transcript.as_str())
}
