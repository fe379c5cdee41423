//! Visits read from a JSON export

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use super::api::{self, VisitsResponse};
use super::source::{LoadResult, VisitsSource};
use crate::models::{Visit, VisitsParams};

/// Accepted file layouts: a bare list of normalized visits, or a page
/// saved straight from the API
#[derive(Deserialize)]
#[serde(untagged)]
enum VisitsFile {
    List(Vec<Visit>),
    Envelope(VisitsResponse),
}

impl VisitsFile {
    fn into_visits(self) -> Vec<Visit> {
        match self {
            VisitsFile::List(visits) => visits,
            VisitsFile::Envelope(response) => api::normalize(response.visits.data),
        }
    }
}

pub struct FileVisitsSource {
    path: PathBuf,
}

impl FileVisitsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VisitsSource for FileVisitsSource {
    async fn load_visits(&self, params: &VisitsParams) -> LoadResult<Vec<Visit>> {
        let bytes = tokio::fs::read(&self.path).await?;
        let file: VisitsFile = serde_json::from_slice(&bytes)?;

        let visits: Vec<Visit> = file
            .into_visits()
            .into_iter()
            .filter(|visit| params.matches(visit))
            .collect();

        debug!(path = %self.path.display(), count = visits.len(), "Read visits file");
        Ok(visits)
    }
}
