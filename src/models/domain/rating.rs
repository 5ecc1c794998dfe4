use serde::{Deserialize, Serialize};

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: u8 = 5;

/// Final, bounded rating of one answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingScore {
    pub rating: f64,
    pub max_rating: u8,
    pub summary: String,
    pub detail: String,
    /// Set when the formatted rating was outside [1.0, 5.0] and was clamped.
    pub clamped: bool,
}

impl RatingScore {
    pub fn new(rating: f64, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rating,
            max_rating: MAX_RATING,
            summary: summary.into(),
            detail: detail.into(),
            clamped: false,
        }
    }
}

/// Output of the formatting stage, before range enforcement.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedRating {
    pub rating: f64,
    pub explanation: String,
}

/// What to do when the formatter omits `rating` or `explanation`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Substitute 0 / empty string and continue.
    #[default]
    Degrade,
    Reject,
}

/// What to do with a formatted rating outside [1.0, 5.0].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingRangePolicy {
    #[default]
    Clamp,
    Reject,
}

/// Rounds to one decimal place.
pub fn round_rating(rating: f64) -> f64 {
    (rating * 10.0).round() / 10.0
}

pub fn is_in_range(rating: f64) -> bool {
    (MIN_RATING..=f64::from(MAX_RATING)).contains(&rating)
}

pub fn clamp_rating(rating: f64) -> f64 {
    rating.clamp(MIN_RATING, f64::from(MAX_RATING))
}
