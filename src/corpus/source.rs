use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Question;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read question file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse question file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loader seam for the question corpus.
pub trait QuestionSource: Send + Sync {
    fn load(&self) -> Result<Vec<Question>, CorpusError>;
}

/// Reads a JSON array of questions from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl QuestionSource for JsonFileSource {
    fn load(&self) -> Result<Vec<Question>, CorpusError> {
        let path_str = self.path.display().to_string();
        let raw = std::fs::read(&self.path).map_err(|source| CorpusError::Io {
            path: path_str.clone(),
            source,
        })?;
        let questions: Vec<Question> =
            serde_json::from_slice(&raw).map_err(|source| CorpusError::Parse {
                path: path_str.clone(),
                source,
            })?;
        tracing::info!(path = %path_str, count = questions.len(), "Loaded question corpus");
        Ok(questions)
    }
}

/// In-memory corpus, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    questions: Vec<Question>,
}

impl StaticSource {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

impl QuestionSource for StaticSource {
    fn load(&self) -> Result<Vec<Question>, CorpusError> {
        Ok(self.questions.clone())
    }
}
