pub mod pipeline_policies;

pub use pipeline_policies::{formatting_policy, question_generation_policy, reasoning_policy};
