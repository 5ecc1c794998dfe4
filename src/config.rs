use std::{env, str::FromStr, time::Duration};

use secrecy::{ExposeSecret, SecretString};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        generation::{
            DEFAULT_GENERATION_TEMPERATURE, DEFAULT_MAX_TOKENS, DEFAULT_REASONING_TEMPERATURE,
            DEFAULT_TOP_P,
        },
        MissingFieldPolicy, RatingRangePolicy,
    },
};

#[derive(Debug)]
pub struct Config {
    pub llm_api_key: SecretString,
    pub llm_api_base: Option<String>,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub llm_top_p: f32,
    pub generation_temperature: f32,
    pub reasoning_temperature: f32,
    /// Overrides every stage's own timeout when set.
    pub llm_timeout_seconds: Option<u64>,
    pub llm_max_retries: u32,
    pub llm_retry_backoff_ms: u64,
    pub question_count: usize,
    pub knowledge_base_dir: String,
    /// When set, knowledge is fetched over HTTP instead of from `knowledge_base_dir`.
    pub knowledge_base_url: Option<String>,
    pub formatting_missing_fields: MissingFieldPolicy,
    pub rating_range_policy: RatingRangePolicy,
    /// Variables that were set but could not be parsed and fell back to defaults.
    pub invalid_settings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for
    /// absent or unparsable values. Unparsable ones are logged and kept in
    /// `invalid_settings`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut invalid = Vec::new();

        Self {
            llm_api_key: SecretString::from(lookup("LLM_API_KEY").unwrap_or_default()),
            llm_api_base: non_empty("LLM_API_BASE"),
            llm_model: non_empty("LLM_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            llm_max_tokens: parse_var(&lookup, "LLM_MAX_TOKENS", &mut invalid).unwrap_or(DEFAULT_MAX_TOKENS),
            llm_top_p: parse_var(&lookup, "LLM_TOP_P", &mut invalid).unwrap_or(DEFAULT_TOP_P),
            generation_temperature: parse_var(&lookup, "GENERATION_TEMPERATURE", &mut invalid)
                .unwrap_or(DEFAULT_GENERATION_TEMPERATURE),
            reasoning_temperature: parse_var(&lookup, "REASONING_TEMPERATURE", &mut invalid)
                .unwrap_or(DEFAULT_REASONING_TEMPERATURE),
            llm_timeout_seconds: parse_var(&lookup, "LLM_TIMEOUT_SECONDS", &mut invalid),
            llm_max_retries: parse_var(&lookup, "LLM_MAX_RETRIES", &mut invalid).unwrap_or(2),
            llm_retry_backoff_ms: parse_var(&lookup, "LLM_RETRY_BACKOFF_MS", &mut invalid).unwrap_or(500),
            question_count: parse_var(&lookup, "QUESTION_COUNT", &mut invalid).unwrap_or(5),
            knowledge_base_dir: non_empty("KNOWLEDGE_BASE_DIR").unwrap_or_else(|| "kb".to_string()),
            knowledge_base_url: non_empty("KNOWLEDGE_BASE_URL"),
            formatting_missing_fields: parse_var(&lookup, "FORMATTING_MISSING_FIELDS", &mut invalid).unwrap_or_default(),
            rating_range_policy: parse_var(&lookup, "RATING_RANGE_POLICY", &mut invalid).unwrap_or_default(),
            invalid_settings: invalid,
        }
    }

    pub fn llm_timeout(&self) -> Option<Duration> {
        self.llm_timeout_seconds.map(Duration::from_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.llm_retry_backoff_ms)
    }

    /// Fails if settings needed to talk to a real LLM service are missing
    /// or were given values that could not be used.
    pub fn validate_for_production(&self) -> AppResult<()> {
        if !self.invalid_settings.is_empty() {
            return Err(AppError::ValidationError(format!(
                "invalid values for {}",
                self.invalid_settings.join(", ")
            )));
        }
        if self.llm_api_key.expose_secret().trim().is_empty() {
            return Err(AppError::ValidationError(
                "LLM_API_KEY is not set".to_string(),
            ));
        }
        if self.question_count == 0 {
            return Err(AppError::ValidationError(
                "QUESTION_COUNT must be at least 1".to_string(),
            ));
        }
        if self.generation_temperature <= 0.0 {
            return Err(AppError::ValidationError(
                "GENERATION_TEMPERATURE must be greater than 0".to_string(),
            ));
        }
        if self.llm_timeout_seconds == Some(0) {
            return Err(AppError::ValidationError(
                "LLM_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            llm_api_key: SecretString::from("sk-test".to_string()),
            llm_api_base: None,
            llm_model: "gpt-4o".to_string(),
            llm_max_tokens: DEFAULT_MAX_TOKENS,
            llm_top_p: DEFAULT_TOP_P,
            generation_temperature: DEFAULT_GENERATION_TEMPERATURE,
            reasoning_temperature: DEFAULT_REASONING_TEMPERATURE,
            llm_timeout_seconds: None,
            llm_max_retries: 0,
            llm_retry_backoff_ms: 1,
            question_count: 3,
            knowledge_base_dir: "kb".to_string(),
            knowledge_base_url: None,
            formatting_missing_fields: MissingFieldPolicy::Degrade,
            rating_range_policy: RatingRangePolicy::Clamp,
            invalid_settings: Vec::new(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, invalid: &mut Vec<String>) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).filter(|v| !v.trim().is_empty())?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring unparsable {}='{}', using the default", key, value);
            invalid.push(key.to_string());
            None
        }
    }
}

impl FromStr for MissingFieldPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(MissingFieldPolicy::Degrade),
            "reject" => Ok(MissingFieldPolicy::Reject),
            other => Err(AppError::ValidationError(format!(
                "unknown missing field policy '{}'",
                other
            ))),
        }
    }
}

impl FromStr for RatingRangePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(RatingRangePolicy::Clamp),
            "reject" => Ok(RatingRangePolicy::Reject),
            other => Err(AppError::ValidationError(format!(
                "unknown rating range policy '{}'",
                other
            ))),
        }
    }
}
