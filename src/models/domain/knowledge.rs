use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Location of a knowledge document: `kb/{topic_code}/{section_code}.txt`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeCoordinates {
    pub topic_code: String,
    pub section_code: String,
}

impl KnowledgeCoordinates {
    pub fn new(topic_code: impl Into<String>, section_code: impl Into<String>) -> Self {
        Self {
            topic_code: topic_code.into(),
            section_code: section_code.into(),
        }
    }

    /// Rejects codes that are empty or could escape the knowledge folder.
    pub fn validate(&self) -> AppResult<()> {
        for (name, code) in [("topic", &self.topic_code), ("section", &self.section_code)] {
            if code.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{} code is empty", name)));
            }
            if code.contains('/') || code.contains('\\') || code.contains("..") {
                return Err(AppError::ValidationError(format!(
                    "{} code '{}' contains path characters",
                    name, code
                )));
            }
        }
        Ok(())
    }

    /// Path relative to the knowledge folder.
    pub fn relative_path(&self) -> String {
        format!("{}/{}.txt", self.topic_code, self.section_code)
    }
}

impl fmt::Display for KnowledgeCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic_code, self.section_code)
    }
}

/// Knowledge text as supplied by the source. Never modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnowledgeDocument {
    pub coordinates: KnowledgeCoordinates,
    pub text: String,
}
