pub mod response;
pub use response::{AnswerRatingDto, GeneratedQuestionsDto};
