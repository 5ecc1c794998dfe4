use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    errors::{AppError, AppResult},
    models::domain::KnowledgeCoordinates,
};

pub const KNOWLEDGE_BASE_FOLDER: &str = "kb";

/// Read-only access to knowledge documents. `Ok(None)` means no document
/// exists at the coordinates; `Err` means the store could not be reached.
#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    async fn find_by_coordinates(&self, coordinates: &KnowledgeCoordinates) -> AppResult<Option<String>>;
}

/// Documents stored as `{root}/{topic}/{section}.txt`.
pub struct FileKnowledgeRepository {
    root: PathBuf,
}

impl FileKnowledgeRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, coordinates: &KnowledgeCoordinates) -> PathBuf {
        self.root
            .join(&coordinates.topic_code)
            .join(format!("{}.txt", coordinates.section_code))
    }
}

#[async_trait]
impl KnowledgeRepository for FileKnowledgeRepository {
    async fn find_by_coordinates(&self, coordinates: &KnowledgeCoordinates) -> AppResult<Option<String>> {
        let path = self.path_for(coordinates);
        log::info!("Reading knowledge base file {}", path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::UpstreamUnavailable(format!(
                "failed to read {}: {}",
                path.display(),
                err
            ))),
        }
    }
}

/// Documents served over HTTP as `{base_url}/kb/{topic}/{section}.txt`,
/// e.g. a public object-storage bucket.
pub struct HttpKnowledgeRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpKnowledgeRepository {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, coordinates: &KnowledgeCoordinates) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            KNOWLEDGE_BASE_FOLDER,
            coordinates.relative_path()
        )
    }
}

#[async_trait]
impl KnowledgeRepository for HttpKnowledgeRepository {
    async fn find_by_coordinates(&self, coordinates: &KnowledgeCoordinates) -> AppResult<Option<String>> {
        let url = self.url_for(coordinates);
        log::info!("Fetching knowledge base document {}", url);

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await?)),
            status => Err(AppError::UpstreamUnavailable(format!(
                "GET {} returned {}",
                url, status
            ))),
        }
    }
}
