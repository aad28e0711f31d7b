use thiserror::Error;

/// Error taxonomy of spec §7.
///
/// `Io` is transient: the caller should record `failureTime`, request a
/// backoff, and retry the same state on the next `write()`. The other
/// three variants are fatal: they break the exactly-once contract and
/// must surface to terminate the owning task.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("transient I/O error: {0}")]
    Io(#[source] anyhow::Error),

    #[error("schema projection failed: {0}")]
    Schema(#[source] anyhow::Error),

    #[error("catalog operation failed: {0}")]
    Catalog(#[source] anyhow::Error),

    #[error("illegal writer state: {0}")]
    IllegalState(String),
}

impl SinkError {
    /// Fatal errors break the exactly-once contract and must surface;
    /// transient errors are recoverable via backoff and retry.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SinkError::Io(_))
    }

    pub fn io(err: impl Into<anyhow::Error>) -> Self {
        SinkError::Io(err.into())
    }

    pub fn schema(err: impl Into<anyhow::Error>) -> Self {
        SinkError::Schema(err.into())
    }

    pub fn catalog(err: impl Into<anyhow::Error>) -> Self {
        SinkError::Catalog(err.into())
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;
