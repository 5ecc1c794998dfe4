use std::time::Duration;

use crate::services::stage_policy::StagePolicy;

pub const QUESTION_GENERATION_STAGE: &str = "question_generation";
pub const REASONING_STAGE: &str = "rating_reasoning";
pub const FORMATTING_STAGE: &str = "rating_formatting";

const QUESTION_GENERATION_TIMEOUT: u64 = 120;
const REASONING_TIMEOUT: u64 = 90;
const FORMATTING_TIMEOUT: u64 = 30;

const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_REPROMPTS: u32 = 1;

pub fn question_generation_policy() -> StagePolicy {
    StagePolicy::new(QUESTION_GENERATION_STAGE)
        .with_description("Generate quiz questions from the knowledge document")
        .with_max_retries(DEFAULT_RETRIES)
        .with_malformed_retries(DEFAULT_REPROMPTS)
        .with_timeout(Duration::from_secs(QUESTION_GENERATION_TIMEOUT))
}

pub fn reasoning_policy() -> StagePolicy {
    StagePolicy::new(REASONING_STAGE)
        .with_description("Rate the answer with free-text chain of thought")
        .with_max_retries(DEFAULT_RETRIES)
        .with_timeout(Duration::from_secs(REASONING_TIMEOUT))
}

pub fn formatting_policy() -> StagePolicy {
    StagePolicy::new(FORMATTING_STAGE)
        .with_description("Extract rating and explanation as JSON from the rationale")
        .with_max_retries(DEFAULT_RETRIES)
        .with_malformed_retries(DEFAULT_REPROMPTS)
        .with_timeout(Duration::from_secs(FORMATTING_TIMEOUT))
}
