//! Runtime configuration read from the environment.
//!
//! - `GEMINI_API_KEY`: credential for answer synthesis (required to answer)
//! - `GEMINI_MODEL`: model name (default `gemini-2.5-flash`)
//! - `PAPERQA_TRANSLATE_URL` / `PAPERQA_TRANSLATE_API_KEY`: LibreTranslate-compatible service
//! - `PAPERQA_ARXIV_URL`: arXiv API base
//! - `PAPERQA_EMBEDDER`: `minilm` or `hash`

use std::env;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TRANSLATE_URL: &str = "https://libretranslate.com";
pub const DEFAULT_ARXIV_URL: &str = "https://export.arxiv.org";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PAPERQA_EMBEDDER '{0}': expected 'minilm' or 'hash'")]
    InvalidEmbedder(String),

    #[error("the minilm embedder requires building with `--features minilm`")]
    EmbedderUnavailable,
}

/// Secret that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank values.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EmbedderKind {
    /// all-MiniLM-L6-v2 sentence embeddings (local ONNX model)
    #[value(name = "minilm")]
    MiniLm,
    /// Deterministic feature hashing, no model download
    Hash,
}

impl EmbedderKind {
    pub fn platform_default() -> Self {
        if cfg!(feature = "minilm") {
            Self::MiniLm
        } else {
            Self::Hash
        }
    }
}

impl FromStr for EmbedderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minilm" => Ok(Self::MiniLm),
            "hash" => Ok(Self::Hash),
            _ => Err(ConfigError::InvalidEmbedder(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<ApiKey>,
    pub gemini_model: String,
    pub translate_url: String,
    pub translate_api_key: Option<ApiKey>,
    pub arxiv_url: String,
    pub embedder: EmbedderKind,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let embedder = match non_blank("PAPERQA_EMBEDDER") {
            Some(raw) => raw.parse()?,
            None => EmbedderKind::platform_default(),
        };

        Ok(Self {
            gemini_api_key: lookup("GEMINI_API_KEY").and_then(|k| ApiKey::new(&k)),
            gemini_model: non_blank("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            translate_url: non_blank("PAPERQA_TRANSLATE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TRANSLATE_URL.to_string()),
            translate_api_key: lookup("PAPERQA_TRANSLATE_API_KEY").and_then(|k| ApiKey::new(&k)),
            arxiv_url: non_blank("PAPERQA_ARXIV_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ARXIV_URL.to_string()),
            embedder,
        })
    }
}
