/*!
 * Translation unit model.
 *
 * A `TranslationUnit` is one input string plus its per-request translation
 * state. Units are created when a request is accepted, mutated in place by
 * backends and the cache decorator, and dropped when the response is built.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

/// One input string and its translation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Text to translate
    pub text: String,

    /// Source language code, if declared or detected
    pub source_lang: Option<String>,

    /// Target language code
    pub target_lang: String,

    /// Cache key, set by the cache decorator
    pub cache_key: Option<String>,

    /// Whether the translation was served from the cache
    pub retrieved_from_cache: bool,

    translation: Option<String>,

    translated: bool,
}

impl TranslationUnit {
    /// Create a new, untranslated unit
    pub fn new(text: impl Into<String>, source_lang: Option<&str>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.map(str::to_string),
            target_lang: target_lang.into(),
            cache_key: None,
            retrieved_from_cache: false,
            translation: None,
            translated: false,
        }
    }

    /// Build one unit per input text, all sharing the same language pair
    pub fn batch(texts: &[String], source_lang: Option<&str>, target_lang: &str) -> Vec<Self> {
        texts
            .iter()
            .map(|text| Self::new(text.as_str(), source_lang, target_lang))
            .collect()
    }

    /// The translation, if any
    pub fn translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    /// Whether a translation has been assigned
    pub fn is_translated(&self) -> bool {
        self.translated
    }

    /// Assign a translation. `None` leaves the unit untranslated.
    pub fn set_translation(&mut self, translation: Option<String>) {
        self.translated = translation.is_some();
        self.translation = translation;
    }

    /// Assign a translation served from the cache
    pub fn set_cached_translation(&mut self, translation: String) {
        self.set_translation(Some(translation));
        self.retrieved_from_cache = true;
    }

    /// Language pair of this unit
    pub fn language_pair(&self) -> LanguagePair {
        LanguagePair::new(self.source_lang.as_deref(), &self.target_lang)
    }
}

/// Source/target language pair. The source is optional when it will be detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: Option<String>,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: Option<&str>, target: &str) -> Self {
        Self {
            source: source.map(str::to_string),
            target: target.to_string(),
        }
    }

    /// Key used in language mapping tables, e.g. `de-en`
    pub fn key(source: &str, target: &str) -> String {
        format!("{}-{}", source, target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source.as_deref().unwrap_or("?"), self.target)
    }
}

/// Indices of units that still need a translation
pub fn pending_indices(units: &[TranslationUnit]) -> Vec<usize> {
    units
        .iter()
        .enumerate()
        .filter(|(_, unit)| !unit.is_translated())
        .map(|(index, _)| index)
        .collect()
}

/// Group unit indices by source language, keeping first-seen order
pub fn group_by_source_language(units: &[TranslationUnit], indices: &[usize]) -> Vec<(Option<String>, Vec<usize>)> {
    let mut groups: Vec<(Option<String>, Vec<usize>)> = Vec::new();
    for &index in indices {
        let source = units[index].source_lang.clone();
        match groups.iter_mut().find(|(lang, _)| *lang == source) {
            Some((_, members)) => members.push(index),
            None => groups.push((source, vec![index])),
        }
    }
    groups
}
