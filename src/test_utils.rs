#[cfg(test)]
pub mod fixtures {
    use std::time::Duration;

    use mockall::Sequence;

    use crate::{errors::AppResult, llm::MockLlmBackend, services::stage_policy::StagePolicy};

    pub const CORTES_KB: &str = "Hernán Cortés landed in 1519.";

    pub const QUESTION: &str = "When did Cortés land and what followed?";

    pub const ANSWER: &str = "He landed in 1519 on the Gulf coast.";

    pub const RATIONALE: &str = "Covers all key points. Rating: 5";

    /// Policy without timeout or meaningful backoff, for tests.
    pub fn fast_policy(name: &str) -> StagePolicy {
        StagePolicy::new(name).with_backoff(Duration::from_millis(1))
    }

    /// Backend that answers each call with the next scripted result, in order.
    pub fn scripted_backend(responses: Vec<AppResult<String>>) -> MockLlmBackend {
        let mut backend = MockLlmBackend::new();
        let mut sequence = Sequence::new();
        for response in responses {
            backend
                .expect_complete()
                .times(1)
                .in_sequence(&mut sequence)
                .return_once(move |_, _| response);
        }
        backend
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fixtures::*;
    use crate::{errors::AppError, llm::LlmClient, models::domain::GenerationParams};

    #[tokio::test]
    async fn test_scripted_backend_replays_in_order() {
        let client = LlmClient::new(Arc::new(scripted_backend(vec![
            Ok("first".to_string()),
            Err(AppError::transient("busy")),
        ])));
        let params = GenerationParams::reasoning();

        assert_eq!(client.invoke("a", &params).await.unwrap().text, "first");
        assert!(client.invoke("b", &params).await.unwrap_err().is_transient());
    }

    #[test]
    fn test_fast_policy_has_no_timeout() {
        let policy = fast_policy("x");
        assert!(policy.timeout.is_none());
        assert_eq!(policy.max_retries, 0);
    }
}
