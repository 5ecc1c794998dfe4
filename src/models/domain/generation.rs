use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};

pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TOP_P: f32 = 0.9;
pub const DEFAULT_GENERATION_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_REASONING_TEMPERATURE: f32 = 0.2;
pub const FORMATTING_TEMPERATURE: f32 = 0.0;

/// Sampling parameters sent with every LLM call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationParams {
    #[validate(range(min = 1))]
    pub max_tokens: u32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f32,

    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub top_p: f32,
}

impl GenerationParams {
    pub fn new(max_tokens: u32, temperature: f32, top_p: f32) -> Self {
        Self {
            max_tokens,
            temperature,
            top_p,
        }
    }

    pub fn question_generation() -> Self {
        Self::new(DEFAULT_MAX_TOKENS, DEFAULT_GENERATION_TEMPERATURE, DEFAULT_TOP_P)
    }

    pub fn reasoning() -> Self {
        Self::new(DEFAULT_MAX_TOKENS, DEFAULT_REASONING_TEMPERATURE, DEFAULT_TOP_P)
    }

    pub fn formatting() -> Self {
        Self::new(DEFAULT_MAX_TOKENS, FORMATTING_TEMPERATURE, DEFAULT_TOP_P)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn ensure_valid(&self) -> AppResult<()> {
        // NaN slips through range checks
        if !self.temperature.is_finite() || !self.top_p.is_finite() {
            return Err(AppError::ValidationError(
                "temperature and top_p must be finite".to_string(),
            ));
        }
        self.validate()?;
        Ok(())
    }
}

/// Prompt text plus the parameters it is sent with. Built fresh for each call.
#[derive(Clone, Debug, PartialEq)]
pub struct PromptEnvelope {
    pub system_text: String,
    pub params: GenerationParams,
}

impl PromptEnvelope {
    pub fn new(system_text: String, params: GenerationParams) -> Self {
        Self {
            system_text,
            params,
        }
    }
}

/// Raw text returned by one LLM round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub elapsed: Duration,
}

/// Questions generated from a knowledge document, in generation order.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationResult {
    pub elapsed: Duration,
    pub questions: Vec<String>,
}
