//! Paper download and text extraction.

mod extractor;

use reqwest::Client;
use tracing::debug;

const MAX_RESPONSE_BYTES: usize = 50_000_000;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("text extraction failed: {0}")]
    Extract(String),

    #[error("document contains no extractable text")]
    EmptyText,
}

impl FetchError {
    /// Whether another attempt could plausibly succeed. Extraction failures
    /// are not: the same bytes parse the same way every time.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Status(code) => *code == 408 || *code == 429 || *code >= 500,
            FetchError::Http(_) => true,
            FetchError::TooLarge
            | FetchError::UnsupportedContentType(_)
            | FetchError::Extract(_)
            | FetchError::EmptyText => false,
        }
    }
}

/// Download `url` and return all of its text.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let downloaded = download(client, url).await?;
    debug!(url = %downloaded.final_url, bytes = downloaded.body.len(), "document fetched");
    extractor::extract_text(
        downloaded.body,
        downloaded.content_type.as_deref(),
        &downloaded.final_url,
    )
    .await
}

struct Downloaded {
    final_url: String,
    content_type: Option<String>,
    body: Vec<u8>,
}

async fn download(client: &Client, url: &str) -> Result<Downloaded, FetchError> {
    let response = client
        .get(url)
        .header("User-Agent", crate::USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(FetchError::TooLarge);
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(FetchError::TooLarge);
        }
    }

    Ok(Downloaded {
        final_url,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retriable() {
        for code in [408, 429, 500, 502, 503] {
            assert!(FetchError::Status(code).is_retriable(), "{code}");
        }
        assert!(!FetchError::Status(404).is_retriable());
    }

    #[test]
    fn extraction_failures_are_not_retriable() {
        assert!(!FetchError::EmptyText.is_retriable());
        assert!(!FetchError::Extract("no text layer".into()).is_retriable());
        assert!(!FetchError::TooLarge.is_retriable());
    }
}

#[cfg(test)]
mod download_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_text_returns_plain_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain; charset=utf-8")
                    .set_body_string("Self-attention relates positions."),
            )
            .mount(&server)
            .await;

        let text = fetch_text(&Client::new(), &format!("{}/paper.txt", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "Self-attention relates positions.");
    }

    #[tokio::test]
    async fn download_keeps_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pdf/1706.03762"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.5".to_vec()),
            )
            .mount(&server)
            .await;

        let downloaded = download(&Client::new(), &format!("{}/pdf/1706.03762", server.uri()))
            .await
            .unwrap();
        assert_eq!(downloaded.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(downloaded.body, b"%PDF-1.5");
    }

    #[tokio::test]
    async fn download_404_returns_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = download(&Client::new(), &format!("{}/missing", server.uri())).await;
        let err = result.err().unwrap();
        assert!(matches!(err, FetchError::Status(404)));
        assert!(!err.is_retriable());
    }

    #[tokio::test]
    async fn download_503_is_retriable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetch_text(&Client::new(), &format!("{}/busy", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn download_too_large_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![b'x'; MAX_RESPONSE_BYTES + 1]),
            )
            .mount(&server)
            .await;

        let result = download(&Client::new(), &format!("{}/huge", server.uri())).await;
        assert!(matches!(result, Err(FetchError::TooLarge)));
    }
}
