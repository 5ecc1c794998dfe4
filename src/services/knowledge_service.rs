use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{KnowledgeCoordinates, KnowledgeDocument},
    repositories::KnowledgeRepository,
};

pub struct KnowledgeService {
    repository: Arc<dyn KnowledgeRepository>,
}

impl KnowledgeService {
    pub fn new(repository: Arc<dyn KnowledgeRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_knowledge(&self, coordinates: &KnowledgeCoordinates) -> AppResult<KnowledgeDocument> {
        coordinates.validate()?;

        let text = self
            .repository
            .find_by_coordinates(coordinates)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Knowledge document '{}' not found", coordinates))
            })?;

        Ok(KnowledgeDocument {
            coordinates: coordinates.clone(),
            text,
        })
    }
}
