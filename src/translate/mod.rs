//! Language normalization: moving text between a human language and the
//! working language through installable per-pair translation models.

pub mod catalog;
pub mod libre;

pub use catalog::{LanguagePair, PackageDescriptor, TranslationCatalog};
pub use libre::LibreTranslateClient;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("no translation model for {pair}")]
    NoModel { pair: LanguagePair },

    #[error("translation service rate limited")]
    RateLimited,

    #[error("translation API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("translation returned empty text")]
    EmptyTranslation,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// What the pipeline needs from a translator. Mocked in tests.
pub trait Translate {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError>;
}

/// Remote side of translation: the model catalog and model execution.
pub trait TranslationBackend {
    async fn fetch_catalog(&self) -> Result<TranslationCatalog, TranslateError>;

    async fn run(&self, package: &PackageDescriptor, text: &str) -> Result<String, TranslateError>;
}

/// A model materialized from a catalog descriptor, ready to invoke.
#[derive(Debug)]
pub struct InstalledModel {
    package: PackageDescriptor,
}

impl InstalledModel {
    pub fn pair(&self) -> &LanguagePair {
        &self.package.pair
    }

    async fn invoke(
        &self,
        backend: &impl TranslationBackend,
        text: &str,
    ) -> Result<String, TranslateError> {
        backend.run(&self.package, text).await
    }
}

/// Process-wide translator: the catalog is fetched lazily once, models are
/// installed on first use per pair and cached for the process lifetime.
pub struct LanguageNormalizer<B> {
    backend: B,
    catalog: OnceCell<TranslationCatalog>,
    installed: Mutex<HashMap<LanguagePair, Arc<InstalledModel>>>,
}

impl<B: TranslationBackend> LanguageNormalizer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            catalog: OnceCell::new(),
            installed: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the catalog now instead of on first translation.
    /// A failed fetch leaves the catalog unset so the next call retries.
    pub async fn preload(&self) -> Result<&TranslationCatalog, TranslateError> {
        self.catalog
            .get_or_try_init(|| async {
                let catalog = self.backend.fetch_catalog().await?;
                info!(packages = catalog.len(), "translation catalog loaded");
                Ok(catalog)
            })
            .await
    }

    /// Install the model for `pair`. Repeated installs return the cached model.
    pub async fn install(&self, pair: &LanguagePair) -> Result<Arc<InstalledModel>, TranslateError> {
        if let Some(model) = self.lock_installed().get(pair) {
            debug!(%pair, "translation model already installed");
            return Ok(Arc::clone(model));
        }

        let catalog = self.preload().await?;
        let package = catalog
            .find(pair)
            .cloned()
            .ok_or_else(|| TranslateError::NoModel { pair: pair.clone() })?;

        let mut installed = self.lock_installed();
        let model = installed
            .entry(pair.clone())
            .or_insert_with(|| {
                info!(%pair, "installing translation model");
                Arc::new(InstalledModel { package })
            });
        Ok(Arc::clone(model))
    }

    pub fn is_installed(&self, pair: &LanguagePair) -> bool {
        self.lock_installed().contains_key(pair)
    }

    fn lock_installed(&self) -> std::sync::MutexGuard<'_, HashMap<LanguagePair, Arc<InstalledModel>>> {
        self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: TranslationBackend> Translate for LanguageNormalizer<B> {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError> {
        let pair = LanguagePair::new(from, to);
        if pair.from == pair.to {
            return Ok(text.to_string());
        }

        let result = match self.install(&pair).await {
            Ok(model) => model.invoke(&self.backend, text).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(translated) => debug!(%pair, chars = translated.chars().count(), "translated"),
            Err(e) => warn!(%pair, error = %e, "translation failed"),
        }
        result
    }
}
