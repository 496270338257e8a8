//! Local LLM engine backed by mistral.rs.
//!
//! Adapts the model runtime to the [`TextGenerator`] seam: chunk deltas
//! become non-final fragments, and stream end is marked with one empty
//! final fragment.

use super::config::{LlmConfig, Quantization};
use super::{Fragment, FragmentStream, TextGenerator};
use crate::{ParleyError, Result};
use async_stream::stream;
use futures::StreamExt;
use mistralrs::{
    IsqType, Model, PagedAttentionMetaBuilder, RequestBuilder, Response, TextMessageRole,
    TextMessages, TextModelBuilder,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LlmEngine {
    config: LlmConfig,
    model: Arc<Model>,
}

impl LlmEngine {
    /// Load the model. Downloads weights on first use; slow.
    pub async fn new(config: LlmConfig) -> Result<Self> {
        info!("initializing LLM engine with model: {}", config.model_id);

        let isq_type = match config.quantization {
            Quantization::None => None,
            Quantization::Q4K => Some(IsqType::Q4K),
            Quantization::Q8_0 => Some(IsqType::Q8_0),
            Quantization::Q4_0 => Some(IsqType::Q4_0),
        };

        let mut builder = TextModelBuilder::new(&config.model_id);

        if let Some(isq) = isq_type {
            builder = builder.with_isq(isq);
        }

        if config.enable_logging {
            builder = builder.with_logging();
        }

        let model = builder
            .with_paged_attn(|| {
                PagedAttentionMetaBuilder::default()
                    .with_block_size(32)
                    .build()
            })
            .map_err(|e| {
                ParleyError::Config(format!("paged attention config failed: {}", e))
            })?
            .build()
            .await
            .map_err(|e| ParleyError::ModelLoad(format!("failed to load LLM model: {}", e)))?;

        info!("LLM engine initialized");

        Ok(Self {
            config,
            model: Arc::new(model),
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

impl TextGenerator for LlmEngine {
    fn generate(&self, prompt: &str) -> FragmentStream {
        let model = Arc::clone(&self.model);
        let prompt = prompt.to_string();
        let temperature = self.config.temperature;
        let max_tokens = self.config.max_tokens;

        Box::pin(stream! {
            let messages =
                TextMessages::new().add_message(TextMessageRole::User, &prompt);
            let request = RequestBuilder::from(messages)
                .set_sampler_temperature(temperature)
                .set_sampler_max_len(max_tokens);

            // The stream borrows the model, so both live in this block.
            let mut upstream = match model.stream_chat_request(request).await {
                Ok(s) => s,
                Err(e) => {
                    yield Err(ParleyError::Generation(format!(
                        "stream request failed: {}",
                        e
                    )));
                    return;
                }
            };

            let mut fragments = 0usize;
            while let Some(response) = upstream.next().await {
                match response {
                    Response::Chunk(chunk) => {
                        if let Some(choice) = chunk.choices.first() {
                            if let Some(content) = &choice.delta.content {
                                if !content.is_empty() {
                                    fragments += 1;
                                    yield Ok(Fragment::piece(content.clone()));
                                }
                            }
                        }
                    }
                    Response::Done(_) => break,
                    Response::ModelError(message, _) => {
                        warn!("model error mid-stream: {}", message);
                        yield Err(ParleyError::Generation(message));
                        return;
                    }
                    Response::InternalError(e) | Response::ValidationError(e) => {
                        yield Err(ParleyError::Generation(e.to_string()));
                        return;
                    }
                    _ => {}
                }
            }

            debug!("generation stream ended after {} fragments", fragments);
            yield Ok(Fragment::last(""));
        })
    }
}
