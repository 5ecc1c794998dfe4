use uuid::Uuid;

use crate::{
    constants::prompts::{render_prompt, RATING_REASONING_PROMPT},
    errors::{AppError, AppResult},
    llm::LlmClient,
    models::domain::{GenerationParams, PromptEnvelope},
    services::{orchestrator_steps::reasoning_policy, stage_policy::StagePolicy},
};

/// First rating stage: free-text chain of thought over knowledge, question
/// and answer. The reply is deliberately left unstructured.
pub struct ReasoningService {
    llm: LlmClient,
    params: GenerationParams,
    policy: StagePolicy,
}

impl ReasoningService {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            params: GenerationParams::reasoning(),
            policy: reasoning_policy(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> AppResult<Self> {
        params.ensure_valid()?;
        self.params = params;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Question and answer are trimmed, so surrounding whitespace never
    /// changes what the model sees.
    pub fn build_prompt(&self, knowledge_text: &str, question: &str, answer: &str) -> PromptEnvelope {
        let system_text = render_prompt(
            RATING_REASONING_PROMPT,
            &[
                ("knowledge_base", knowledge_text),
                ("question", question.trim()),
                ("answer", answer.trim()),
            ],
        );
        PromptEnvelope::new(system_text, self.params)
    }

    pub async fn reason(&self, knowledge_text: &str, question: &str, answer: &str) -> AppResult<String> {
        let cid = Uuid::new_v4().to_string();
        self.reason_traced(&cid, knowledge_text, question, answer)
            .await
    }

    pub(crate) async fn reason_traced(
        &self,
        cid: &str,
        knowledge_text: &str,
        question: &str,
        answer: &str,
    ) -> AppResult<String> {
        // A blank answer is still rated; the rubric scores it at the floor.
        for (name, value) in [("knowledge text", knowledge_text), ("question", question)] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{} is empty", name)));
            }
        }

        let envelope = self.build_prompt(knowledge_text, question, answer);
        let llm = &self.llm;
        let envelope = &envelope;
        let rationale = self
            .policy
            .execute(cid, |_| async move {
                let response = llm.invoke(&envelope.system_text, &envelope.params).await?;
                Ok::<_, AppError>(response.text)
            })
            .await?;

        log::debug!("[{}] Reasoning produced {} chars", cid, rationale.len());
        Ok(rationale)
    }
}
