//! arXiv search API client.

mod atom;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ArxivError {
    #[error("arXiv query rejected: {0}")]
    Query(String),

    #[error("arXiv API error: status {0}")]
    Status(u16),

    #[error("invalid arXiv response: {0}")]
    Parse(#[from] quick_xml::DeError),

    #[error("invalid arXiv URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ArxivError {
    /// Transient failures worth another attempt.
    pub fn is_retriable(&self) -> bool {
        match self {
            ArxivError::Status(code) => *code == 429 || *code >= 500,
            ArxivError::Network(_) => true,
            _ => false,
        }
    }
}

/// A search hit: enough to fetch the paper later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperHandle {
    /// Versioned arXiv id, e.g. `1706.03762v7`.
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub pdf_url: String,
    pub abs_url: String,
}

#[derive(Clone)]
pub struct ArxivClient {
    http: Client,
    base_url: String,
}

impl ArxivClient {
    pub fn from_config(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.arxiv_url.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Relevance-ranked search. The query is passed through verbatim, so arXiv
    /// syntax such as `OR` and field prefixes (`ti:`, `au:`) works.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperHandle>, ArxivError> {
        let max_results_param = max_results.to_string();
        let url = url::Url::parse_with_params(
            &format!("{}/api/query", self.base_url),
            &[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results_param.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ],
        )?;

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "arXiv search failed");
            return Err(ArxivError::Status(status.as_u16()));
        }

        let xml = response.text().await?;
        let mut papers = atom::parse_feed(&xml)?;
        papers.truncate(max_results);
        debug!(query, results = papers.len(), "arXiv search complete");
        Ok(papers)
    }
}
