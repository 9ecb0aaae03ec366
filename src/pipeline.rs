//! Request orchestration: translate in, acquire, index, retrieve, synthesize,
//! translate out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, warn};

use crate::acquire::{self, AcquireError, ArxivSource, DocumentSource, RetryPolicy};
use crate::config::Config;
use crate::embed::{ConfiguredEmbedder, Embedder};
use crate::gemini::{GeminiClient, GeminiError, Generator};
use crate::index::{self, ChunkIndex, Chunker, IndexError, RetrievedChunk};
use crate::lang::Language;
use crate::synthesize::{self, SynthesisError};
use crate::translate::{LanguageNormalizer, LanguagePair, LibreTranslateClient, Translate};

/// The only failure text callers ever see.
pub const FIXED_ERROR_MESSAGE: &str = "Error, Please Try Again.";

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Client-wide ceiling; each API client sets a tighter per-request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub query: String,
    pub question: String,
    pub input_language: Language,
    pub output_language: Language,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub max_results: usize,
    pub top_k: usize,
    pub chunker: Chunker,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            top_k: 7,
            chunker: Chunker::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Which text a translation was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Query,
    Question,
    Answer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Query => "query",
            Stage::Question => "question",
            Stage::Answer => "answer",
        })
    }
}

/// Something went wrong but the request still produced an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// The text went on untranslated.
    Translation {
        stage: Stage,
        pair: LanguagePair,
        reason: String,
    },
    SkippedDocument { id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub title: String,
}

#[derive(Debug)]
pub struct Outcome {
    pub answer: String,
    pub degradations: Vec<Degradation>,
    pub sources: Vec<Source>,
    pub retrieved: Vec<RetrievedChunk>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Gemini(#[from] GeminiError),
}

/// Shared, read-only services plus per-request settings. Every request builds
/// its own corpus and index; nothing mutable is shared between requests.
pub struct Pipeline<S, T, E, G> {
    source: Arc<S>,
    translator: Arc<T>,
    embedder: Arc<E>,
    generator: Arc<G>,
    settings: PipelineSettings,
}

pub type ArxivPipeline =
    Pipeline<ArxivSource, LanguageNormalizer<LibreTranslateClient>, ConfiguredEmbedder, GeminiClient>;

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

impl ArxivPipeline {
    pub fn from_config(config: &Config, embedder: Arc<ConfiguredEmbedder>) -> Result<Self, SetupError> {
        let http = build_http_client()?;
        Ok(Self::new(
            Arc::new(ArxivSource::from_config(http.clone(), config)),
            Arc::new(LanguageNormalizer::new(LibreTranslateClient::from_config(
                http.clone(),
                config,
            ))),
            embedder,
            Arc::new(GeminiClient::from_config(http, config)?),
            PipelineSettings::default(),
        ))
    }
}

impl<S, T, E, G> Pipeline<S, T, E, G>
where
    S: DocumentSource,
    T: Translate,
    E: Embedder,
    G: Generator,
{
    pub fn new(
        source: Arc<S>,
        translator: Arc<T>,
        embedder: Arc<E>,
        generator: Arc<G>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            translator,
            embedder,
            generator,
            settings,
        }
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Answer text or [`FIXED_ERROR_MESSAGE`]. Never fails.
    pub async fn answer(&self, request: &Request) -> String {
        match self.run(request).await {
            Ok(outcome) => outcome.answer,
            Err(e) => {
                error!(error = %e, "request failed");
                FIXED_ERROR_MESSAGE.to_string()
            }
        }
    }

    pub async fn run(&self, request: &Request) -> Result<Outcome, PipelineError> {
        let mut degradations = Vec::new();
        let pivot = Language::PIVOT;

        let query = self
            .translate(Stage::Query, &request.query, request.input_language, pivot, &mut degradations)
            .await;

        let corpus = acquire::acquire(
            self.source.as_ref(),
            &query,
            self.settings.max_results,
            &self.settings.retry,
        )
        .await?;
        info!(
            stage = "acquire",
            documents = corpus.documents.len(),
            skipped = corpus.failed.len(),
            "documents acquired"
        );
        degradations.extend(corpus.failed.iter().map(|f| Degradation::SkippedDocument {
            id: f.id.clone(),
            reason: f.reason.clone(),
        }));
        let sources: Vec<Source> = corpus
            .documents
            .iter()
            .map(|d| Source {
                id: d.id.clone(),
                title: d.title.clone(),
            })
            .collect();

        let text = index::normalize_text(&corpus.combined_text());
        let chunk_index =
            ChunkIndex::build(&text, &self.settings.chunker, self.embedder.as_ref()).await?;
        info!(stage = "index", chunks = chunk_index.len(), "index ready");

        let question = self
            .translate(
                Stage::Question,
                &request.question,
                request.input_language,
                pivot,
                &mut degradations,
            )
            .await;

        let retrieved = index::retrieve(
            &chunk_index,
            self.embedder.as_ref(),
            &question,
            self.settings.top_k,
        )
        .await?;
        info!(stage = "retrieve", retrieved = retrieved.len(), "context retrieved");

        let answer = synthesize::synthesize(self.generator.as_ref(), &question, &retrieved).await?;
        info!(stage = "synthesize", chars = answer.chars().count(), "answer synthesized");

        let answer = self
            .translate(Stage::Answer, &answer, pivot, request.output_language, &mut degradations)
            .await;

        info!(degradations = degradations.len(), "request complete");
        Ok(Outcome {
            answer,
            degradations,
            sources,
            retrieved,
        })
    }

    /// Translate `text`, or pass it through unchanged and record why.
    async fn translate(
        &self,
        stage: Stage,
        text: &str,
        from: Language,
        to: Language,
        degradations: &mut Vec<Degradation>,
    ) -> String {
        if from == to {
            return text.to_string();
        }

        let pair = LanguagePair::new(from.code(), to.code());
        let reason = match self.translator.translate(text, from.code(), to.code()).await {
            Ok(translated) if !translated.trim().is_empty() => {
                info!(%stage, %pair, chars = translated.chars().count(), "translated");
                return translated;
            }
            Ok(_) => "empty translation".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(%stage, %pair, %reason, "continuing with untranslated text");
        degradations.push(Degradation::Translation {
            stage,
            pair,
            reason,
        });
        text.to_string()
    }
}
