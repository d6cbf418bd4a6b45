use crate::DocId;
use thiserror::Error;

/// Input that cannot take part in a matching run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("student at position {position} has no identity fields")]
    MissingIdentity { position: usize },
    #[error("student key {key:?} already used by an earlier profile")]
    DuplicateIdentity { key: String },
    #[error("student at position {position} is malformed: {reason}")]
    MalformedStudent { position: usize, reason: String },
    #[error("job record is missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Misuse of the relevance index. Not recoverable by the caller at this layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("document {doc_id} is outside an index of {num_docs} documents")]
    UnknownDocument { doc_id: DocId, num_docs: u32 },
    #[error("index was built from corpus {expected} but is used with corpus {found}")]
    CorpusMismatch { expected: String, found: String },
    #[error("index was built with different tokenization settings (stopwords or stemming)")]
    NormalizerMismatch,
    #[error("index snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { expected: u32, found: u32 },
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),
}

impl MatchError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        MatchError::Io { path: path.as_ref().display().to_string(), source }
    }
}

pub type Result<T, E = MatchError> = std::result::Result<T, E>;
