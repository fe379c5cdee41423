use crate::models::{Visit, VisitsParams};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read visits: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed visits payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("visits request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Where a report gets its visits from
#[async_trait]
pub trait VisitsSource: Send + Sync {
    /// Load every visit matching `params`
    async fn load_visits(&self, params: &VisitsParams) -> LoadResult<Vec<Visit>>;
}
