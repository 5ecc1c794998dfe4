use serde::Serialize;

use crate::models::domain::{GenerationResult, RatingScore};

/// Generated questions in the shape quiz clients already consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestionsDto {
    pub questions: Vec<String>,
    pub generated_in: f64,
    pub generated_in_unit: String,
}

impl From<GenerationResult> for GeneratedQuestionsDto {
    fn from(result: GenerationResult) -> Self {
        GeneratedQuestionsDto {
            questions: result.questions,
            generated_in: result.elapsed.as_secs_f64(),
            generated_in_unit: "seconds".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRatingDto {
    pub rating: f64,
    pub max_rating: u8,
    pub explanations: String,
    pub detailed_explanations: String,
}

impl From<RatingScore> for AnswerRatingDto {
    fn from(score: RatingScore) -> Self {
        AnswerRatingDto {
            rating: score.rating,
            max_rating: score.max_rating,
            explanations: score.summary,
            detailed_explanations: score.detail,
        }
    }
}
