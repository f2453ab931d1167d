use std::path::PathBuf;

/// Errors raised while loading catalogs, fitting vector spaces and ranking.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("schema error in {source_name}: {message}")]
    Schema { source_name: String, message: String },

    #[error("corpus has no usable content")]
    EmptyCorpus,

    #[error("unknown corpus: {0}")]
    UnknownCorpus(String),

    #[error("corpus already loaded: {0}")]
    DuplicateCorpus(String),

    #[error("vectorizer used before fit")]
    NotFitted,

    #[error("top_n must be at least 1, got {0}")]
    InvalidTopN(usize),

    #[error("anchor position {position} outside corpus of {len} items")]
    AnchorOutOfRange { position: usize, len: usize },

    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Schema { source_name: source_name.into(), message: message.into() }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
