//! Configuration for the local LLM engine.

/// In-situ quantization applied at model load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantization {
    None,
    Q4K,
    Q8_0,
    Q4_0,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Hugging Face model id or local path.
    pub model_id: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum tokens to generate per response.
    pub max_tokens: usize,

    /// Quantization applied at load time.
    pub quantization: Quantization,

    /// Forward mistral.rs internal logging.
    pub enable_logging: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_id: "google/gemma-2-2b-it".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            quantization: Quantization::Q4K,
            enable_logging: false,
        }
    }
}

impl LlmConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}
