use std::path::{Path, PathBuf};

use thiserror::Error;

use super::extraction_result::ExtractionResult;

#[derive(Error, Debug)]
pub enum ResultLoadError {
    #[error("result file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read result file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed result file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("unsupported result format: {0}")]
    UnsupportedFormat(String),
}

impl ResultLoadError {
    pub fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Loads a persisted source-extraction result.
pub trait ResultLoader: Send {
    fn load(&self, path: &Path) -> Result<ExtractionResult, ResultLoadError>;
}
