//! Visits loaded page by page from the backend REST API

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::api::{self, VisitsPage, VisitsResponse};
use super::source::{LoadError, LoadResult, VisitsSource};
use crate::config::ServerConfig;
use crate::models::{Visit, VisitsParams};

/// The visits collections exposed by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitsEndpoint {
    ShortUrl(String),
    Tag(String),
    Orphan,
    NonOrphan,
}

impl VisitsEndpoint {
    fn segments(&self) -> Vec<&str> {
        match self {
            VisitsEndpoint::ShortUrl(code) => vec!["short-urls", code.as_str(), "visits"],
            VisitsEndpoint::Tag(tag) => vec!["tags", tag.as_str(), "visits"],
            VisitsEndpoint::Orphan => vec!["visits", "orphan"],
            VisitsEndpoint::NonOrphan => vec!["visits", "non-orphan"],
        }
    }
}

pub struct HttpVisitsSource {
    client: Client,
    base: Url,
    api_key: Option<String>,
    page_size: u32,
    endpoint: VisitsEndpoint,
}

impl HttpVisitsSource {
    pub fn new(server: &ServerConfig, endpoint: VisitsEndpoint) -> LoadResult<Self> {
        let base = Url::parse(&server.url)
            .map_err(|e| anyhow!("Invalid server URL '{}': {}", server.url, e))?;

        Ok(Self {
            client: Client::new(),
            base,
            api_key: server.api_key.clone(),
            page_size: server.page_size,
            endpoint,
        })
    }

    fn page_url(&self, params: &VisitsParams, page: u32) -> LoadResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Server URL '{}' cannot have a path", self.base))?
            .pop_if_empty()
            .extend(["rest", "v3"])
            .extend(self.endpoint.segments());

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("itemsPerPage", &self.page_size.to_string());
            if let Some(start) = params.start_date {
                query.append_pair("startDate", &start.to_rfc3339());
            }
            if let Some(end) = params.end_date {
                query.append_pair("endDate", &end.to_rfc3339());
            }
            if params.exclude_bots {
                query.append_pair("excludeBots", "true");
            }
        }

        Ok(url)
    }

    async fn fetch_page(&self, url: Url) -> LoadResult<VisitsPage> {
        let mut request = self.client.get(url);
        if let Some(ref key) = self.api_key {
            request = request.header("X-Api-Key", key.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        let body: VisitsResponse = response.json().await?;
        Ok(body.visits)
    }
}

#[async_trait]
impl VisitsSource for HttpVisitsSource {
    async fn load_visits(&self, params: &VisitsParams) -> LoadResult<Vec<Visit>> {
        let mut visits = Vec::new();
        let mut page = 1;

        loop {
            let url = self.page_url(params, page)?;
            let batch = self.fetch_page(url).await?;
            let fetched = batch.data.len();
            visits.extend(api::normalize(batch.data));

            let last_page = match &batch.pagination {
                Some(pagination) => {
                    debug!(page, pages = pagination.pages_count, fetched, "Fetched visits page");
                    pagination.current_page >= pagination.pages_count
                }
                None => true,
            };
            if fetched == 0 || last_page {
                break;
            }
            page += 1;
        }

        Ok(visits)
    }
}
