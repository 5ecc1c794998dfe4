pub mod generation;
pub mod knowledge;
pub mod rating;
pub use generation::{GenerationParams, GenerationResult, LlmResponse, PromptEnvelope};
pub use knowledge::{KnowledgeCoordinates, KnowledgeDocument};
pub use rating::{FormattedRating, MissingFieldPolicy, RatingRangePolicy, RatingScore};
