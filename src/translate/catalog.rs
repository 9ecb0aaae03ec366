use std::fmt;

use serde::Deserialize;

/// Directed translation route, by normalized language code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    pub from: String,
    pub to: String,
}

impl LanguagePair {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: normalize_code(from),
            to: normalize_code(to),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// An installable translation model as advertised by the service.
///
/// `source`/`target` keep the service's own codes (e.g. `zh-Hans`), which are
/// what the translate endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub pair: LanguagePair,
    pub source: String,
    pub target: String,
}

/// Entry of LibreTranslate's `GET /languages`.
#[derive(Debug, Deserialize)]
pub struct LanguageEntry {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Snapshot of the available translation models, refreshed once per process.
#[derive(Debug, Clone, Default)]
pub struct TranslationCatalog {
    packages: Vec<PackageDescriptor>,
}

impl TranslationCatalog {
    pub fn from_languages(entries: Vec<LanguageEntry>) -> Self {
        let mut packages: Vec<PackageDescriptor> = Vec::new();
        for entry in &entries {
            for target in &entry.targets {
                let pair = LanguagePair::new(&entry.code, target);
                if pair.from == pair.to || packages.iter().any(|p| p.pair == pair) {
                    continue;
                }
                packages.push(PackageDescriptor {
                    pair,
                    source: entry.code.clone(),
                    target: target.clone(),
                });
            }
        }
        Self { packages }
    }

    /// Exact-pair lookup. No chaining through a pivot language.
    pub fn find(&self, pair: &LanguagePair) -> Option<&PackageDescriptor> {
        self.packages.iter().find(|p| &p.pair == pair)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// `zh-Hans` -> `zh`, `EN` -> `en`.
fn normalize_code(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
