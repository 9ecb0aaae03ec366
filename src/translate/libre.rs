use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::catalog::{LanguageEntry, PackageDescriptor, TranslationCatalog};
use super::{TranslateError, TranslationBackend};
use crate::config::{ApiKey, Config};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for a LibreTranslate-compatible service (Argos Translate models).
#[derive(Clone)]
pub struct LibreTranslateClient {
    http: Client,
    base_url: String,
    api_key: Option<ApiKey>,
}

impl LibreTranslateClient {
    pub fn from_config(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.translate_url.clone(),
            api_key: config.translate_api_key.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key: None,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TranslateError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("translation service rate limited");
            return Err(TranslateError::RateLimited);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| {
                let end = text.floor_char_boundary(200);
                format!("HTTP {status}: {}", &text[..end])
            });
        Err(TranslateError::Api {
            code: status.as_u16(),
            message,
        })
    }
}

impl TranslationBackend for LibreTranslateClient {
    async fn fetch_catalog(&self) -> Result<TranslationCatalog, TranslateError> {
        let url = format!("{}/languages", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let entries: Vec<LanguageEntry> = Self::check_status(response).await?.json().await?;
        let catalog = TranslationCatalog::from_languages(entries);
        debug!(packages = catalog.len(), "translation catalog fetched");
        Ok(catalog)
    }

    async fn run(&self, package: &PackageDescriptor, text: &str) -> Result<String, TranslateError> {
        let url = format!("{}/translate", self.base_url);
        let request = TranslateRequest {
            q: text,
            source: &package.source,
            target: &package.target,
            format: "text",
            api_key: self.api_key.as_ref().map(ApiKey::expose),
        };

        let response = self
            .http
            .post(&url)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: TranslateResponse = Self::check_status(response).await?.json().await?;
        if let Some(message) = body.error {
            return Err(TranslateError::Api { code: 200, message });
        }
        body.translated_text
            .filter(|t| !t.trim().is_empty())
            .ok_or(TranslateError::EmptyTranslation)
    }
}
