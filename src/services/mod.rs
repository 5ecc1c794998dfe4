pub mod formatting_service;
pub mod knowledge_service;
pub mod orchestrator_steps;
pub mod question_generation_service;
pub mod rating_orchestrator_service;
pub mod reasoning_service;
pub mod response_parsing;
pub mod stage_policy;

pub use formatting_service::FormattingService;
pub use knowledge_service::KnowledgeService;
pub use question_generation_service::QuestionGenerationService;
pub use rating_orchestrator_service::RatingOrchestrator;
pub use reasoning_service::ReasoningService;
pub use stage_policy::StagePolicy;
