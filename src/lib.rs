pub mod chat;
pub mod gate;
pub mod generate;
pub mod prompt;
pub mod session;
pub mod speech;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParleyError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Synthesis initialization error: {0}")]
    SynthesisInit(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ParleyError {
    /// Human-readable text surfaced as a model-authored message when a
    /// turn fails.
    pub fn user_message(&self) -> String {
        match self {
            ParleyError::Generation(detail) => {
                format!("Response generation failed: {}", detail)
            }
            ParleyError::InvariantViolation(_) => {
                "Internal error. Please try again.".to_string()
            }
            ParleyError::Recognition(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            ParleyError::SynthesisInit(_) => {
                "Speech output is unavailable. Responses will be shown as text.".to_string()
            }
            ParleyError::Synthesis(_) => {
                "Text-to-speech failed. Response will be shown as text.".to_string()
            }
            ParleyError::ModelLoad(_) => {
                "Failed to load the language model.".to_string()
            }
            ParleyError::Channel(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            ParleyError::Config(_) => {
                "Configuration error. Please check settings.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
