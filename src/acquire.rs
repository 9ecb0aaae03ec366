//! Document acquisition: relevance search plus per-paper text download with
//! bounded retry. Papers that keep failing are skipped, not waited on.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::arxiv::{ArxivClient, ArxivError, PaperHandle};
use crate::config::Config;
use crate::fetch::{self, FetchError};

const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("paper search failed: {0}")]
    Search(#[from] ArxivError),

    #[error("no paper could be downloaded")]
    NoDocuments,
}

/// Where papers come from. Implemented by `ArxivSource`; mocked in tests.
pub trait DocumentSource {
    async fn search(&self, query: &str, max_results: usize)
    -> Result<Vec<PaperHandle>, ArxivError>;

    async fn fetch_text(&self, paper: &PaperHandle) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct ArxivSource {
    arxiv: ArxivClient,
    http: Client,
}

impl ArxivSource {
    pub fn from_config(http: Client, config: &Config) -> Self {
        Self {
            arxiv: ArxivClient::from_config(http.clone(), config),
            http,
        }
    }
}

impl DocumentSource for ArxivSource {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperHandle>, ArxivError> {
        self.arxiv.search(query, max_results).await
    }

    async fn fetch_text(&self, paper: &PaperHandle) -> Result<String, FetchError> {
        fetch::fetch_text(&self.http, &paper.pdf_url).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Equal jitter backoff: base/2 + rand(0, base/2).
    fn backoff(&self, attempt: u32) -> Duration {
        let initial = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let base = initial.saturating_mul(2u64.saturating_pow(attempt));
        let half = base / 2;
        Duration::from_millis(half + fastrand::u64(..half.max(1)))
    }

    async fn run<T, E, F, Fut>(
        &self,
        what: &str,
        is_retriable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retriable(&e) && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    debug!(
                        what,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub id: String,
    pub reason: String,
}

/// Downloaded papers in ranked order, plus the ones that were skipped.
#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub failed: Vec<FailedDocument>,
}

impl Corpus {
    pub fn combined_text(&self) -> String {
        self.documents
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub async fn acquire(
    source: &impl DocumentSource,
    query: &str,
    max_results: usize,
    policy: &RetryPolicy,
) -> Result<Corpus, AcquireError> {
    let papers = policy
        .run("search", ArxivError::is_retriable, || {
            source.search(query, max_results)
        })
        .await?;
    info!(query, papers = papers.len(), "search complete");

    let mut corpus = Corpus::default();
    let mut seen = HashSet::new();
    for paper in papers {
        if !seen.insert(paper.id.clone()) {
            debug!(id = %paper.id, "duplicate search hit skipped");
            continue;
        }

        let result = policy
            .run(&paper.id, FetchError::is_retriable, || source.fetch_text(&paper))
            .await;
        match result {
            Ok(text) => {
                debug!(id = %paper.id, chars = text.chars().count(), "paper acquired");
                corpus.documents.push(Document {
                    id: paper.id,
                    title: paper.title,
                    text,
                });
            }
            Err(e) => {
                warn!(id = %paper.id, error = %e, "paper skipped");
                corpus.failed.push(FailedDocument {
                    id: paper.id,
                    reason: e.to_string(),
                });
            }
        }
    }

    if corpus.documents.is_empty() {
        return Err(AcquireError::NoDocuments);
    }
    Ok(corpus)
}


#[cfg(test)]
mod tests {
    use super::test_support::{MockSource, paper};
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::immediate(4)
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let source = MockSource::default()
            .with_search(Ok(vec![paper("1706.03762v7")]))
            .with_fetch("1706.03762v7", Err(FetchError::Status(503)))
            .with_fetch("1706.03762v7", Err(FetchError::Status(429)))
            .with_fetch("1706.03762v7", Ok("self-attention text".to_string()));

        let corpus = acquire(&source, "transformers", 5, &policy()).await.unwrap();

        assert_eq!(source.fetch_count("1706.03762v7"), 3);
        assert_eq!(corpus.documents.len(), 1);
        assert!(corpus.failed.is_empty());
        assert_eq!(corpus.combined_text(), "self-attention text");
    }

    #[tokio::test]
    async fn permanently_failing_paper_is_skipped() {
        let source = MockSource::default()
            .with_search(Ok(vec![paper("a"), paper("b")]))
            .with_fetch("a", Ok("text a".to_string()));

        let corpus = acquire(&source, "q", 5, &policy()).await.unwrap();

        assert_eq!(source.fetch_count("b"), 4);
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.failed.len(), 1);
        assert_eq!(corpus.failed[0].id, "b");
        assert!(corpus.failed[0].reason.contains("503"));
    }

    #[tokio::test]
    async fn non_retriable_failure_is_not_retried() {
        let source = MockSource::default()
            .with_search(Ok(vec![paper("img"), paper("ok")]))
            .with_fetch(
                "img",
                Err(FetchError::UnsupportedContentType("image/png".into())),
            )
            .with_fetch("ok", Ok("text".to_string()));

        let corpus = acquire(&source, "q", 5, &policy()).await.unwrap();
        assert_eq!(source.fetch_count("img"), 1);
        assert_eq!(corpus.failed[0].id, "img");
    }

    #[tokio::test]
    async fn paper_without_text_is_downloaded_once() {
        let source = MockSource::default()
            .with_search(Ok(vec![paper("scanned"), paper("ok")]))
            .with_fetch("scanned", Err(FetchError::EmptyText))
            .with_fetch("scanned", Ok("never reached".to_string()))
            .with_fetch("ok", Ok("text".to_string()));

        let corpus = acquire(&source, "q", 5, &policy()).await.unwrap();
        assert_eq!(source.fetch_count("scanned"), 1);
        assert_eq!(corpus.failed[0].id, "scanned");
        assert_eq!(corpus.combined_text(), "text");
    }

    #[tokio::test]
    async fn ranked_order_is_preserved() {
        let source = MockSource::default()
            .with_search(Ok(vec![paper("first"), paper("second"), paper("third")]))
            .with_fetch("first", Ok("one".to_string()))
            .with_fetch("second", Err(FetchError::Status(500)))
            .with_fetch("second", Ok("two".to_string()))
            .with_fetch("third", Ok("three".to_string()));

        let corpus = acquire(&source, "q", 5, &policy()).await.unwrap();
        let ids: Vec<&str> = corpus.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
        assert_eq!(corpus.combined_text(), "one\n\ntwo\n\nthree");
    }

    #[tokio::test]
    async fn duplicate_hits_contribute_once() {
        let source = MockSource::default()
            .with_search(Ok(vec![paper("a"), paper("a")]))
            .with_fetch("a", Ok("text a".to_string()))
            .with_fetch("a", Ok("text a".to_string()));

        let corpus = acquire(&source, "q", 5, &policy()).await.unwrap();
        assert_eq!(corpus.combined_text(), "text a");
        assert_eq!(source.fetch_count("a"), 1);
    }

    #[tokio::test]
    async fn all_papers_failing_is_no_documents() {
        let source = MockSource::default().with_search(Ok(vec![paper("a"), paper("b")]));
        let result = acquire(&source, "q", 5, &policy()).await;
        assert!(matches!(result, Err(AcquireError::NoDocuments)));
    }

    #[tokio::test]
    async fn empty_search_is_no_documents() {
        let source = MockSource::default().with_search(Ok(vec![]));
        let result = acquire(&source, "q", 5, &policy()).await;
        assert!(matches!(result, Err(AcquireError::NoDocuments)));
    }

    #[tokio::test]
    async fn transient_search_failure_is_retried() {
        let source = MockSource::default()
            .with_search(Err(ArxivError::Status(503)))
            .with_search(Ok(vec![paper("a")]))
            .with_fetch("a", Ok("text".to_string()));

        let corpus = acquire(&source, "attention", 5, &policy()).await.unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(*source.queries.lock().unwrap(), ["attention", "attention"]);
    }

    #[tokio::test]
    async fn rejected_query_is_search_error() {
        let source =
            MockSource::default().with_search(Err(ArxivError::Query("malformed".to_string())));
        let result = acquire(&source, "((", 5, &policy()).await;
        assert!(matches!(result, Err(AcquireError::Search(ArxivError::Query(_)))));
        assert_eq!(source.queries.lock().unwrap().len(), 1);
    }

    #[test]
    fn backoff_grows_with_equal_jitter() {
        let policy = RetryPolicy::default();
        for attempt in 0..3 {
            let base = 1000 * 2u64.pow(attempt);
            let delay = policy.backoff(attempt).as_millis() as u64;
            assert!(delay >= base / 2 && delay < base, "attempt {attempt}: {delay}ms");
        }
    }

    #[test]
    fn immediate_policy_never_waits() {
        assert_eq!(RetryPolicy::immediate(4).backoff(3), Duration::ZERO);
    }
}
