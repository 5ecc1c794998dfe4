use serde_json::Value;
use uuid::Uuid;

use crate::{
    constants::prompts::{render_prompt, strict_json_prompt, RATING_FORMATTING_PROMPT},
    errors::{AppError, AppResult},
    llm::LlmClient,
    models::domain::{
        generation::FORMATTING_TEMPERATURE,
        rating::round_rating,
        FormattedRating, GenerationParams, MissingFieldPolicy, PromptEnvelope,
    },
    services::{
        orchestrator_steps::formatting_policy,
        response_parsing::{parse_json_object, type_name},
        stage_policy::StagePolicy,
    },
};

/// Second rating stage: extracts `{"rating", "explanation"}` from the
/// reasoning text. Always sampled at temperature 0.
pub struct FormattingService {
    llm: LlmClient,
    params: GenerationParams,
    policy: StagePolicy,
    missing_fields: MissingFieldPolicy,
}

impl FormattingService {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            params: GenerationParams::formatting(),
            policy: formatting_policy(),
            missing_fields: MissingFieldPolicy::default(),
        }
    }

    /// Token and top-p limits are taken from `params`; temperature stays 0.
    pub fn with_params(mut self, params: GenerationParams) -> AppResult<Self> {
        let params = params.with_temperature(FORMATTING_TEMPERATURE);
        params.ensure_valid()?;
        self.params = params;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_missing_field_policy(mut self, missing_fields: MissingFieldPolicy) -> Self {
        self.missing_fields = missing_fields;
        self
    }

    pub fn build_prompt(&self, rationale: &str) -> PromptEnvelope {
        let system_text = render_prompt(RATING_FORMATTING_PROMPT, &[("rationale", rationale)]);
        PromptEnvelope::new(system_text, self.params)
    }

    pub async fn extract(&self, rationale: &str) -> AppResult<FormattedRating> {
        let cid = Uuid::new_v4().to_string();
        self.extract_traced(&cid, rationale).await
    }

    pub(crate) async fn extract_traced(&self, cid: &str, rationale: &str) -> AppResult<FormattedRating> {
        if rationale.trim().is_empty() {
            return Err(AppError::ValidationError("rationale text is empty".to_string()));
        }

        let envelope = self.build_prompt(rationale);
        let strict_text = strict_json_prompt(&envelope.system_text);
        let llm = &self.llm;
        let envelope = &envelope;
        let strict_text = &strict_text;
        let missing_fields = self.missing_fields;
        let formatted = self
            .policy
            .execute(cid, |reprompts| async move {
                let prompt = if reprompts == 0 { &envelope.system_text } else { strict_text };
                let response = llm.invoke(prompt, &envelope.params).await?;
                parse_formatted_rating(&response.text, missing_fields)
            })
            .await?;

        log::info!(
            "[{}] Formatted rating {} ({} chars of explanation)",
            cid,
            formatted.rating,
            formatted.explanation.len()
        );
        Ok(formatted)
    }
}

/// Validates `{"rating": number, "explanation": string}`.
///
/// Under [`MissingFieldPolicy::Degrade`] an absent or null `rating` becomes 0
/// and an absent or null `explanation` becomes empty. Present fields of the
/// wrong type are always rejected.
pub fn parse_formatted_rating(raw: &str, missing_fields: MissingFieldPolicy) -> AppResult<FormattedRating> {
    let malformed = |reason: String| AppError::MalformedFormattingResponse {
        reason,
        raw: raw.to_string(),
    };

    let object = parse_json_object(raw).map_err(malformed)?;

    let rating = match object.get("rating") {
        Some(Value::Number(number)) => match number.as_f64() {
            Some(value) if value.is_finite() => round_rating(value),
            _ => return Err(malformed(format!("'rating' {} is not a finite number", number))),
        },
        None | Some(Value::Null) => match missing_fields {
            MissingFieldPolicy::Degrade => {
                log::warn!("Formatted rating has no 'rating', defaulting to 0");
                0.0
            }
            MissingFieldPolicy::Reject => {
                return Err(malformed("missing 'rating' field".to_string()))
            }
        },
        Some(other) => {
            return Err(malformed(format!(
                "'rating' must be a number, got {}",
                type_name(other)
            )))
        }
    };

    let explanation = match object.get("explanation") {
        Some(Value::String(text)) => text.trim().to_string(),
        None | Some(Value::Null) => match missing_fields {
            MissingFieldPolicy::Degrade => {
                log::warn!("Formatted rating has no 'explanation', defaulting to empty");
                String::new()
            }
            MissingFieldPolicy::Reject => {
                return Err(malformed("missing 'explanation' field".to_string()))
            }
        },
        Some(other) => {
            return Err(malformed(format!(
                "'explanation' must be a string, got {}",
                type_name(other)
            )))
        }
    };

    Ok(FormattedRating { rating, explanation })
}
