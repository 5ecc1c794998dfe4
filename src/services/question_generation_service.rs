use uuid::Uuid;

use crate::{
    constants::prompts::{render_prompt, strict_json_prompt, QUESTION_GENERATION_PROMPT},
    errors::{AppError, AppResult},
    llm::LlmClient,
    models::domain::{GenerationParams, GenerationResult, PromptEnvelope},
    services::{
        orchestrator_steps::question_generation_policy,
        response_parsing::{parse_json_object, type_name},
        stage_policy::StagePolicy,
    },
};

pub const MAX_QUESTION_COUNT: usize = 50;

/// Generates comprehension questions grounded in a knowledge document.
pub struct QuestionGenerationService {
    llm: LlmClient,
    params: GenerationParams,
    policy: StagePolicy,
}

impl QuestionGenerationService {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            params: GenerationParams::question_generation(),
            policy: question_generation_policy(),
        }
    }

    /// Zero temperature is refused: it yields the same questions on every
    /// call for a given document.
    pub fn with_params(mut self, params: GenerationParams) -> AppResult<Self> {
        params.ensure_valid()?;
        if params.temperature <= 0.0 {
            return Err(AppError::ValidationError(
                "question generation temperature must be greater than 0".to_string(),
            ));
        }
        self.params = params;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn build_prompt(&self, knowledge_text: &str, question_count: usize) -> PromptEnvelope {
        let count = question_count.to_string();
        let system_text = render_prompt(
            QUESTION_GENERATION_PROMPT,
            &[("knowledge_base", knowledge_text), ("question_count", &count)],
        );
        PromptEnvelope::new(system_text, self.params)
    }

    pub async fn generate(
        &self,
        knowledge_text: &str,
        question_count: usize,
    ) -> AppResult<GenerationResult> {
        if knowledge_text.trim().is_empty() {
            return Err(AppError::ValidationError(
                "knowledge text is empty".to_string(),
            ));
        }
        if question_count == 0 || question_count > MAX_QUESTION_COUNT {
            return Err(AppError::ValidationError(format!(
                "question count must be between 1 and {}, got {}",
                MAX_QUESTION_COUNT, question_count
            )));
        }

        let cid = Uuid::new_v4().to_string();
        log::info!(
            "[{}] Generating {} questions from {} chars of knowledge",
            cid,
            question_count,
            knowledge_text.len()
        );

        let envelope = self.build_prompt(knowledge_text, question_count);
        let strict_text = strict_json_prompt(&envelope.system_text);
        let llm = &self.llm;
        let envelope = &envelope;
        let strict_text = &strict_text;
        let (elapsed, questions) = self
            .policy
            .execute(&cid, |reprompts| async move {
                let prompt = if reprompts == 0 { &envelope.system_text } else { strict_text };
                let response = llm.invoke(prompt, &envelope.params).await?;
                let questions = parse_questions(&response.text, question_count)?;
                Ok::<_, AppError>((response.elapsed, questions))
            })
            .await?;

        log::info!(
            "[{}] Generated {} questions in {:.2}s",
            cid,
            questions.len(),
            elapsed.as_secs_f64()
        );

        Ok(GenerationResult { elapsed, questions })
    }
}

/// Validates `{"questions": [string, ...]}`. Extra questions beyond
/// `expected` are dropped; fewer is an error.
pub fn parse_questions(raw: &str, expected: usize) -> AppResult<Vec<String>> {
    let malformed = |reason: String| AppError::MalformedGenerationResponse {
        reason,
        raw: raw.to_string(),
    };

    let mut object = parse_json_object(raw).map_err(malformed)?;
    let items = match object.remove("questions") {
        Some(serde_json::Value::Array(items)) => items,
        Some(other) => {
            return Err(malformed(format!(
                "'questions' must be an array, got {}",
                type_name(&other)
            )))
        }
        None => return Err(malformed("missing 'questions' field".to_string())),
    };

    let mut questions = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            serde_json::Value::String(text) if !text.trim().is_empty() => {
                questions.push(text.trim().to_string())
            }
            serde_json::Value::String(_) => {
                return Err(malformed(format!("question {} is blank", index + 1)))
            }
            other => {
                return Err(malformed(format!(
                    "question {} must be a string, got {}",
                    index + 1,
                    type_name(&other)
                )))
            }
        }
    }

    if questions.len() < expected {
        return Err(malformed(format!(
            "expected {} questions, got {}",
            expected,
            questions.len()
        )));
    }
    if questions.len() > expected {
        log::warn!(
            "Model returned {} questions, keeping the first {}",
            questions.len(),
            expected
        );
        questions.truncate(expected);
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{constants::prompts::STRICT_JSON_REMINDER, llm::MockLlmBackend, test_utils::fixtures};

    fn service(backend: MockLlmBackend) -> QuestionGenerationService {
        QuestionGenerationService::new(LlmClient::new(Arc::new(backend)))
            .with_policy(fixtures::fast_policy("generation"))
    }

    #[test]
    fn prompt_embeds_knowledge_and_count() {
        let service = service(MockLlmBackend::new());
        let envelope = service.build_prompt(fixtures::CORTES_KB, 7);

        assert!(envelope.system_text.contains(fixtures::CORTES_KB));
        assert!(envelope.system_text.contains("Generate 7 questions"));
        assert!(envelope.system_text.contains("only one field called questions"));
        assert_eq!(envelope.params, GenerationParams::question_generation());
    }

    #[test]
    fn zero_temperature_is_refused() {
        let result = service(MockLlmBackend::new())
            .with_params(GenerationParams::question_generation().with_temperature(0.0));
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let tuned = service(MockLlmBackend::new())
            .with_params(GenerationParams::question_generation().with_temperature(0.7))
            .unwrap();
        assert_eq!(tuned.params().temperature, 0.7);
    }

    #[tokio::test]
    async fn generate_returns_questions_in_order() {
        let mut backend = MockLlmBackend::new();
        backend
            .expect_complete()
            .withf(|prompt: &str, params: &GenerationParams| {
                prompt.contains("Generate 3 questions") && params.temperature > 0.0
            })
            .times(1)
            .returning(|_, _| Ok(r#"{"questions": ["Q1", "Q2", "Q3"]}"#.to_string()));

        let result = service(backend)
            .generate(fixtures::CORTES_KB, 3)
            .await
            .unwrap();

        assert_eq!(result.questions, vec!["Q1", "Q2", "Q3"]);
        assert!(result.elapsed >= Duration::ZERO);
    }

    #[tokio::test]
    async fn malformed_reply_is_reprompted_once_then_reported() {
        let backend = fixtures::scripted_backend(vec![
            Ok("Sure! Here are your questions: 1. Why?".to_string()),
            Ok("still not json".to_string()),
        ]);

        let err = service(backend)
            .with_policy(fixtures::fast_policy("generation").with_malformed_retries(1))
            .generate(fixtures::CORTES_KB, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MalformedGenerationResponse { .. }));
    }

    #[tokio::test]
    async fn reprompt_recovers_from_one_malformed_reply() {
        let mut backend = MockLlmBackend::new();
        let mut sequence = mockall::Sequence::new();
        backend
            .expect_complete()
            .withf(|prompt: &str, _: &GenerationParams| !prompt.contains(STRICT_JSON_REMINDER))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok("not json".to_string()));
        backend
            .expect_complete()
            .withf(|prompt: &str, _: &GenerationParams| {
                prompt.contains(fixtures::CORTES_KB) && prompt.ends_with(STRICT_JSON_REMINDER)
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(r#"{"questions": ["Q1"]}"#.to_string()));

        let result = service(backend)
            .with_policy(fixtures::fast_policy("generation").with_malformed_retries(1))
            .generate(fixtures::CORTES_KB, 1)
            .await
            .unwrap();

        assert_eq!(result.questions, vec!["Q1"]);
    }

    #[tokio::test]
    async fn adapter_failure_is_not_reported_as_malformed() {
        let backend = fixtures::scripted_backend(vec![Err(AppError::fatal("invalid model"))]);

        let err = service(backend)
            .generate(fixtures::CORTES_KB, 2)
            .await
            .unwrap_err();

        assert!(!err.is_malformed());
        assert!(matches!(err, AppError::LlmInvocation { .. }));
    }

    #[tokio::test]
    async fn invalid_inputs_never_reach_the_model() {
        let mut backend = MockLlmBackend::new();
        backend.expect_complete().never();
        let service = service(backend);

        assert!(matches!(
            service.generate("  ", 3).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.generate(fixtures::CORTES_KB, 0).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.generate(fixtures::CORTES_KB, MAX_QUESTION_COUNT + 1).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn parse_questions_shape_errors() {
        let cases = [
            r#"{"items": ["Q1"]}"#,
            r#"{"questions": "Q1"}"#,
            r#"{"questions": ["Q1", 2]}"#,
            r#"{"questions": ["Q1", "  "]}"#,
            r#"{"questions": []}"#,
            r#"["Q1", "Q2"]"#,
        ];
        for raw in cases {
            let err = parse_questions(raw, 2).unwrap_err();
            assert!(
                matches!(err, AppError::MalformedGenerationResponse { .. }),
                "{} should be malformed",
                raw
            );
        }
    }

    #[test]
    fn parse_questions_trims_extras_and_fences() {
        let raw = "```json\n{\"questions\": [\" Q1 \", \"Q2\", \"Q3\"]}\n```";
        assert_eq!(parse_questions(raw, 2).unwrap(), vec!["Q1", "Q2"]);
    }

    #[test]
    fn parse_questions_keeps_raw_reply_in_error() {
        match parse_questions("no json here", 1) {
            Err(AppError::MalformedGenerationResponse { raw, .. }) => {
                assert_eq!(raw, "no json here")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
