use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult, RatingStage},
    llm::LlmClient,
    models::domain::{
        rating::{clamp_rating, is_in_range},
        FormattedRating, RatingRangePolicy, RatingScore,
    },
    services::{formatting_service::FormattingService, reasoning_service::ReasoningService},
};

/// Runs reasoning then formatting for one answer and returns a bounded score.
///
/// A failure in either stage is wrapped in [`AppError::RatingPipeline`]; when
/// formatting fails the rationale already produced is carried in the error.
pub struct RatingOrchestrator {
    reasoning: ReasoningService,
    formatting: FormattingService,
    range_policy: RatingRangePolicy,
}

impl RatingOrchestrator {
    pub fn new(llm: LlmClient) -> Self {
        Self::from_stages(ReasoningService::new(llm.clone()), FormattingService::new(llm))
    }

    pub fn from_stages(reasoning: ReasoningService, formatting: FormattingService) -> Self {
        Self {
            reasoning,
            formatting,
            range_policy: RatingRangePolicy::default(),
        }
    }

    pub fn with_range_policy(mut self, range_policy: RatingRangePolicy) -> Self {
        self.range_policy = range_policy;
        self
    }

    pub async fn rate(&self, knowledge_text: &str, question: &str, answer: &str) -> AppResult<RatingScore> {
        let cid = Uuid::new_v4().to_string();
        log::info!("[{}] Rating answer ({} chars)", cid, answer.trim().len());

        let rationale = self
            .reasoning
            .reason_traced(&cid, knowledge_text, question, answer)
            .await
            .map_err(|err| AppError::RatingPipeline {
                stage: RatingStage::Reasoning,
                rationale: None,
                source: Box::new(err),
            })?;

        let formatted = match self.formatting.extract_traced(&cid, &rationale).await {
            Ok(formatted) => formatted,
            Err(err) => {
                return Err(AppError::RatingPipeline {
                    stage: RatingStage::Formatting,
                    rationale: Some(rationale),
                    source: Box::new(err),
                })
            }
        };

        let score = self.assemble(&cid, formatted, rationale)?;
        log::info!(
            "[{}] Rated answer {}/{}{}",
            cid,
            score.rating,
            score.max_rating,
            if score.clamped { " (clamped)" } else { "" }
        );
        Ok(score)
    }

    fn assemble(&self, cid: &str, formatted: FormattedRating, rationale: String) -> AppResult<RatingScore> {
        let FormattedRating { rating, explanation } = formatted;

        if is_in_range(rating) {
            return Ok(RatingScore::new(rating, explanation, rationale));
        }

        match self.range_policy {
            RatingRangePolicy::Clamp => {
                let bounded = clamp_rating(rating);
                log::warn!(
                    "[{}] Formatted rating {} is out of range, clamped to {}",
                    cid,
                    rating,
                    bounded
                );
                let mut score = RatingScore::new(bounded, explanation, rationale);
                score.clamped = true;
                Ok(score)
            }
            RatingRangePolicy::Reject => Err(AppError::RatingPipeline {
                stage: RatingStage::Formatting,
                rationale: Some(rationale),
                source: Box::new(AppError::OutOfRangeRating(rating)),
            }),
        }
    }
}
