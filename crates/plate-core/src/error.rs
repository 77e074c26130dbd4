use crate::document::Path;

/// Structural failures raised by the document model.
///
/// These indicate a bug in a command or a caller holding a stale path; they
/// are never produced by well-formed editing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid structure at {path:?}: {reason}")]
    InvalidStructure { path: Path, reason: String },

    #[error("no node at {path:?}")]
    DetachedNode { path: Path },

    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl DocumentError {
    pub(crate) fn invalid(path: &[usize], reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            path: path.to_vec(),
            reason: reason.into(),
        }
    }

    pub(crate) fn detached(path: &[usize]) -> Self {
        Self::DetachedNode {
            path: path.to_vec(),
        }
    }
}

/// Malformed markup reported by the HTML tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("html parse failure at byte {offset}: {reason}")]
pub struct ParseFailure {
    pub offset: usize,
    pub reason: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}
