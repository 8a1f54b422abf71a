use thiserror::Error;

/// Errors raised by the pipeline itself.
///
/// Everything else (missing fields, empty sets, unknown sort keys) is
/// handled permissively and never surfaces here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The query cannot be evaluated as given, e.g. a zero page size.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The textual query form could not be parsed.
    #[error("cannot parse query: {0}")]
    Parse(String),
}

/// Failures reported by a [`RecordSource`](crate::host::RecordSource).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("fetch failed: {0}")]
    Fetch(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
