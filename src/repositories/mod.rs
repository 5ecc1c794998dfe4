pub mod knowledge_repository;

pub use knowledge_repository::{FileKnowledgeRepository, HttpKnowledgeRepository, KnowledgeRepository};
