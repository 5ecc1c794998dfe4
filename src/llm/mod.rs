pub mod openai;

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{GenerationParams, LlmResponse},
};

pub use openai::OpenAiBackend;

/// A single opaque completion call against an LLM service.
///
/// Implementations perform exactly one round trip and report failures as
/// [`AppError::LlmInvocation`], classified as transient or fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> AppResult<String>;
}

/// Validating, timing wrapper around an [`LlmBackend`]. Cheap to clone and
/// safe to share between concurrent pipelines. Never retries.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn LlmBackend>,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub async fn invoke(&self, prompt: &str, params: &GenerationParams) -> AppResult<LlmResponse> {
        if prompt.trim().is_empty() {
            return Err(AppError::ValidationError("prompt text is empty".to_string()));
        }
        params.ensure_valid()?;

        let started = Instant::now();
        let result = self.backend.complete(prompt, params).await;
        let elapsed = started.elapsed();

        match result {
            Ok(text) => {
                log::debug!(
                    "LLM call finished in {:.3}s ({} chars, temperature {})",
                    elapsed.as_secs_f64(),
                    text.len(),
                    params.temperature
                );
                Ok(LlmResponse { text, elapsed })
            }
            Err(err) => {
                log::warn!(
                    "LLM call failed after {:.3}s: {}",
                    elapsed.as_secs_f64(),
                    err
                );
                Err(err)
            }
        }
    }
}
