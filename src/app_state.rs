use std::sync::Arc;

use crate::{
    config::Config,
    errors::AppResult,
    llm::{LlmBackend, LlmClient, OpenAiBackend},
    models::domain::{GenerationParams, GenerationResult, KnowledgeCoordinates, RatingScore},
    repositories::{FileKnowledgeRepository, HttpKnowledgeRepository, KnowledgeRepository},
    services::{
        formatting_service::FormattingService,
        knowledge_service::KnowledgeService,
        orchestrator_steps::{formatting_policy, question_generation_policy, reasoning_policy},
        question_generation_service::QuestionGenerationService,
        rating_orchestrator_service::RatingOrchestrator,
        reasoning_service::ReasoningService,
        stage_policy::StagePolicy,
    },
};

/// Wires the quiz agent together from configuration. Holds no per-call state.
#[derive(Clone)]
pub struct AppState {
    pub knowledge_service: Arc<KnowledgeService>,
    pub question_service: Arc<QuestionGenerationService>,
    pub rating_orchestrator: Arc<RatingOrchestrator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let backend = Arc::new(OpenAiBackend::new(
            &config.llm_api_key,
            config.llm_api_base.as_deref(),
            config.llm_model.clone(),
        ));

        let repository: Arc<dyn KnowledgeRepository> = match &config.knowledge_base_url {
            Some(url) => Arc::new(HttpKnowledgeRepository::new(url.clone())),
            None => Arc::new(FileKnowledgeRepository::new(config.knowledge_base_dir.clone())),
        };

        Self::with_components(config, backend, repository)
    }

    /// Builds the services around caller-supplied collaborators.
    pub fn with_components(
        config: Config,
        backend: Arc<dyn LlmBackend>,
        repository: Arc<dyn KnowledgeRepository>,
    ) -> AppResult<Self> {
        let llm = LlmClient::new(backend);
        let base_params = GenerationParams::question_generation()
            .with_max_tokens(config.llm_max_tokens)
            .with_top_p(config.llm_top_p);

        let question_service = QuestionGenerationService::new(llm.clone())
            .with_params(base_params.with_temperature(config.generation_temperature))?
            .with_policy(apply_overrides(question_generation_policy(), &config));

        let reasoning = ReasoningService::new(llm.clone())
            .with_params(base_params.with_temperature(config.reasoning_temperature))?
            .with_policy(apply_overrides(reasoning_policy(), &config));

        let formatting = FormattingService::new(llm)
            .with_params(base_params)?
            .with_policy(apply_overrides(formatting_policy(), &config))
            .with_missing_field_policy(config.formatting_missing_fields);

        let rating_orchestrator = RatingOrchestrator::from_stages(reasoning, formatting)
            .with_range_policy(config.rating_range_policy);

        log::info!(
            "Quiz agent ready (model {}, knowledge from {})",
            config.llm_model,
            config
                .knowledge_base_url
                .as_deref()
                .unwrap_or(&config.knowledge_base_dir)
        );

        Ok(Self {
            knowledge_service: Arc::new(KnowledgeService::new(repository)),
            question_service: Arc::new(question_service),
            rating_orchestrator: Arc::new(rating_orchestrator),
            config: Arc::new(config),
        })
    }

    /// Fetches the section's knowledge and generates the quiz questions.
    pub async fn start_quiz(
        &self,
        coordinates: &KnowledgeCoordinates,
        question_count: Option<usize>,
    ) -> AppResult<GenerationResult> {
        let document = self.knowledge_service.get_knowledge(coordinates).await?;
        let count = question_count.unwrap_or(self.config.question_count);
        self.question_service.generate(&document.text, count).await
    }

    /// Fetches the section's knowledge and rates one answer against it.
    pub async fn rate_answer(
        &self,
        coordinates: &KnowledgeCoordinates,
        question: &str,
        answer: &str,
    ) -> AppResult<RatingScore> {
        let document = self.knowledge_service.get_knowledge(coordinates).await?;
        self.rating_orchestrator
            .rate(&document.text, question, answer)
            .await
    }
}

fn apply_overrides(policy: StagePolicy, config: &Config) -> StagePolicy {
    let policy = policy
        .with_max_retries(config.llm_max_retries)
        .with_backoff(config.retry_backoff());
    match config.llm_timeout() {
        Some(timeout) => policy.with_timeout(timeout),
        None => policy,
    }
}
