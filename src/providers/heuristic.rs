/*!
 * Local language detector based on scripts and stop words.
 *
 * Texts in Greek script are reported as Greek. Other texts are tokenized and
 * scored against small stop-word lists; the best language wins when enough
 * of the tokens are stop words of that language, otherwise the text stays
 * undetermined.
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::errors::TranslationError;
use crate::providers::LanguageDetector;

/// Share of stop-word tokens needed to accept a language
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.15;

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Alphabetic}+").unwrap());

static GREEK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Greek}").unwrap());

static STOP_WORDS: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    let lists: [(&str, &[&str]); 9] = [
        ("en", &["the", "and", "is", "of", "to", "in", "that", "it", "my", "this", "with", "for", "was", "are", "a"]),
        ("de", &["der", "die", "das", "und", "ist", "nicht", "ein", "eine", "mein", "ich", "mit", "zu", "den", "von", "im"]),
        ("fr", &["le", "la", "les", "et", "est", "un", "une", "des", "du", "je", "mon", "ce", "pas", "dans", "pour"]),
        ("es", &["el", "la", "los", "las", "y", "es", "un", "una", "mi", "que", "de", "en", "por", "con", "no"]),
        ("it", &["il", "lo", "la", "gli", "e", "è", "un", "una", "mio", "che", "di", "non", "per", "con", "sono"]),
        ("nl", &["de", "het", "een", "en", "is", "niet", "mijn", "ik", "van", "dat", "met", "op", "zijn", "voor", "te"]),
        ("pt", &["o", "a", "os", "as", "e", "é", "um", "uma", "meu", "não", "do", "da", "em", "com", "que"]),
        ("pl", &["i", "w", "nie", "jest", "to", "się", "na", "z", "że", "mój", "do", "jak", "ale", "co", "ten"]),
        ("sv", &["och", "är", "en", "ett", "det", "att", "inte", "min", "jag", "på", "med", "som", "för", "av", "den"]),
    ];
    lists
        .into_iter()
        .map(|(lang, words)| (lang, words.iter().copied().collect()))
        .collect()
});

/// Stop-word / script based detector
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    id: String,
    min_confidence: f64,
}

impl HeuristicDetector {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Detect the language of one text
    pub fn detect_one(&self, text: &str, hint: Option<&str>) -> Option<String> {
        if GREEK_REGEX.is_match(text) {
            return Some("el".to_string());
        }

        let tokens: Vec<String> = WORD_REGEX
            .find_iter(text)
            .map(|token| token.as_str().to_lowercase())
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&str, usize)> = None;
        for (lang, words) in STOP_WORDS.iter() {
            let score = tokens.iter().filter(|token| words.contains(token.as_str())).count();
            let better = match best {
                None => score > 0,
                Some((best_lang, best_score)) => {
                    score > best_score
                        || (score == best_score && (hint == Some(*lang) || (hint != Some(best_lang) && *lang < best_lang)))
                }
            };
            if better {
                best = Some((*lang, score));
            }
        }

        let (lang, score) = best?;
        let confidence = score as f64 / tokens.len() as f64;
        (confidence >= self.min_confidence).then(|| lang.to_string())
    }
}

#[async_trait]
impl LanguageDetector for HeuristicDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, lang: &str) -> bool {
        lang == "el" || STOP_WORDS.contains_key(lang)
    }

    async fn detect_lang(&self, texts: &[String], hint: Option<&str>) -> Result<Vec<Option<String>>, TranslationError> {
        Ok(texts.iter().map(|text| self.detect_one(text, hint)).collect())
    }
}
