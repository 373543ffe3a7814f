use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed transport error returned by a [`crate::source::MealSource`].
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// The local store is unreachable or corrupt. Never retried.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("network error: {0}")]
    Network(#[source] SourceError),
    /// Cold cache and the refresh failed: nothing to show.
    #[error("data unavailable: {0}")]
    Unavailable(String),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Payload(err.to_string())
    }
}
