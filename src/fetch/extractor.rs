use dom_smoothie::{Config, Readability};
use tracing::{debug, warn};

use super::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ContentKind {
    Pdf,
    Html,
    PlainText,
}

/// Decide how to read a body from its `Content-Type`, falling back to
/// sniffing the leading bytes when the header is missing or generic.
pub(super) fn detect_kind(content_type: Option<&str>, body: &[u8]) -> Result<ContentKind, FetchError> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match mime.as_str() {
        "application/pdf" | "application/x-pdf" => return Ok(ContentKind::Pdf),
        "text/html" | "application/xhtml+xml" => return Ok(ContentKind::Html),
        m if m.starts_with("text/") => return Ok(ContentKind::PlainText),
        _ => {}
    }

    if body.starts_with(b"%PDF-") {
        return Ok(ContentKind::Pdf);
    }
    let head = String::from_utf8_lossy(&body[..body.len().min(512)]).to_ascii_lowercase();
    if head.contains("<html") || head.contains("<!doctype html") {
        return Ok(ContentKind::Html);
    }
    if mime.is_empty() || mime == "application/octet-stream" {
        return Ok(ContentKind::PlainText);
    }
    Err(FetchError::UnsupportedContentType(mime))
}

/// Extract all readable text from a downloaded body.
pub(super) async fn extract_text(
    body: Vec<u8>,
    content_type: Option<&str>,
    url: &str,
) -> Result<String, FetchError> {
    let kind = detect_kind(content_type, &body)?;
    let text = match kind {
        ContentKind::Pdf => extract_pdf(body).await?,
        ContentKind::Html => extract_html(&decode(&body, content_type), url),
        ContentKind::PlainText => decode(&body, content_type),
    };

    if text.trim().is_empty() {
        return Err(FetchError::EmptyText);
    }
    debug!(?kind, chars = text.len(), "text extracted");
    Ok(text)
}

/// PDF parsing is CPU-bound and the parser can panic on malformed files, so it
/// runs on the blocking pool where a panic surfaces as a `JoinError`.
async fn extract_pdf(body: Vec<u8>) -> Result<String, FetchError> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&body))
        .await
        .map_err(|e| FetchError::Extract(format!("PDF parser aborted: {e}")))?
        .map_err(|e| FetchError::Extract(e.to_string()))
}

fn extract_html(html: &str, url: &str) -> String {
    let content_html = match Readability::new(html, Some(url), Some(Config::default())) {
        Ok(mut readability) => match readability.parse() {
            Ok(article) => article.content.to_string(),
            Err(e) => {
                warn!(%e, "readability parse failed, using raw HTML");
                html.to_string()
            }
        },
        Err(e) => {
            warn!(%e, "readability init failed, using raw HTML");
            html.to_string()
        }
    };
    html2md::rewrite_html(&content_html, false)
}

fn decode(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        debug!(encoding = encoding.name(), "lossy decode");
    }
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}
