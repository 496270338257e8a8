//! The generation capability seam: a prompt in, an ordered finite
//! stream of text fragments out.

pub mod config;
#[cfg(feature = "local-llm")]
pub mod engine;

pub use config::{LlmConfig, Quantization};
#[cfg(feature = "local-llm")]
pub use engine::LlmEngine;

use crate::Result;
use futures::Stream;
use std::pin::Pin;

/// An incremental piece of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    /// Set on the last element of the stream.
    pub is_final: bool,
}

impl Fragment {
    pub fn piece(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn last(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// In-order, finite, non-restartable fragment stream. May yield a fault,
/// after which no further elements are meaningful.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// External text-generation capability.
///
/// Implementations wrap a model runtime; the session controller only
/// depends on this trait.
pub trait TextGenerator: Send {
    fn generate(&self, prompt: &str) -> FragmentStream;
}
