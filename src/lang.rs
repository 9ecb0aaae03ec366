use std::fmt;
use std::str::FromStr;

/// Human languages offered for questions and answers.
///
/// Closed set: every route between two of these passes through [`Language::PIVOT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    Korean,
    German,
    Hindi,
    Italian,
    Spanish,
    Russian,
    Chinese,
    #[default]
    English,
    Japanese,
    French,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown language: '{0}'")]
pub struct UnknownLanguage(pub String);

impl Language {
    /// Display order used by the presentation shell.
    pub const ALL: [Language; 10] = [
        Language::Korean,
        Language::German,
        Language::Hindi,
        Language::Italian,
        Language::Spanish,
        Language::Russian,
        Language::Chinese,
        Language::English,
        Language::Japanese,
        Language::French,
    ];

    /// Canonical working language.
    pub const PIVOT: Language = Language::English;

    pub fn name(self) -> &'static str {
        match self {
            Language::Korean => "Korean",
            Language::German => "German",
            Language::Hindi => "Hindi",
            Language::Italian => "Italian",
            Language::Spanish => "Spanish",
            Language::Russian => "Russian",
            Language::Chinese => "Chinese",
            Language::English => "English",
            Language::Japanese => "Japanese",
            Language::French => "French",
        }
    }

    /// ISO 639-1 code used by the translation service.
    pub fn code(self) -> &'static str {
        match self {
            Language::Korean => "ko",
            Language::German => "de",
            Language::Hindi => "hi",
            Language::Italian => "it",
            Language::Spanish => "es",
            Language::Russian => "ru",
            Language::Chinese => "zh",
            Language::English => "en",
            Language::Japanese => "ja",
            Language::French => "fr",
        }
    }

    pub fn from_name(name: &str) -> Option<Language> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(name))
    }

    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(code))
    }

    pub fn is_pivot(self) -> bool {
        self == Self::PIVOT
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the display name ("German") or the code ("de").
impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
            .or_else(|| Self::from_code(s))
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_unique() {
        let codes: HashSet<_> = Language::ALL.iter().map(|l| l.code()).collect();
        assert_eq!(codes.len(), Language::ALL.len());
    }

    #[test]
    fn name_and_code_map_one_to_one() {
        for lang in Language::ALL {
            assert_eq!(Language::from_name(lang.name()), Some(lang));
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("german".parse::<Language>().unwrap(), Language::German);
        assert_eq!(" French ".parse::<Language>().unwrap(), Language::French);
    }

    #[test]
    fn parses_codes() {
        assert_eq!("ja".parse::<Language>().unwrap(), Language::Japanese);
        assert_eq!("ZH".parse::<Language>().unwrap(), Language::Chinese);
    }

    #[test]
    fn rejects_unknown_language() {
        let err = "Klingon".parse::<Language>().unwrap_err();
        assert!(err.to_string().contains("Klingon"), "got: {err}");
    }

    #[test]
    fn english_is_the_pivot() {
        assert!(Language::English.is_pivot());
        assert_eq!(Language::default(), Language::English);
        assert_eq!(Language::PIVOT.code(), "en");
    }
}
