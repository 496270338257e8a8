//! Seams for the platform speech services.
//!
//! Recognition and synthesis are external capabilities: platform
//! adapters translate their callback surfaces into the session's
//! semantic events and consume the synthesizer trait. No audio samples
//! cross this boundary.

pub mod recognizer;
pub mod synthesizer;

pub use recognizer::{best_transcript, RecognitionCandidate};
pub use synthesizer::{QueueMode, QueuedSynthesizer, SpeechQueue, SpeechSynthesizer};
