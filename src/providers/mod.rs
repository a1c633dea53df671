/*!
 * Backend capabilities for the translation gateway.
 *
 * This module contains the two capability traits every backend implements,
 * and the concrete adapters:
 * - Google: Cloud Translation v3 REST API
 * - Pangeanic: scored translation and detection API
 * - Heuristic: local stop-word / script based language detector
 * - Hybrid: local detector for short texts, remote detector for the rest
 * - Mock: echo backends for tests and `dummy` configuration entries
 *
 * The asynchronous eTranslation backend lives in `crate::bridge`.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::TranslationError;
use crate::translation::unit::TranslationUnit;

/// Common trait for all translation backends
///
/// Backends translate the units they are given in place. A unit left without
/// a translation is reported as untranslated and may be handed to a fallback
/// backend by the router.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Service id, as used in requests and configuration
    fn id(&self) -> &str;

    /// Whether the backend can translate from `source` to `target`.
    /// `None` as source means the language will be detected by the backend.
    fn is_supported(&self, source: Option<&str>, target: &str) -> bool;

    /// Whether every call must carry a single language pair
    fn single_source_per_call(&self) -> bool {
        false
    }

    /// Translate the units in place
    async fn translate(&self, units: &mut [TranslationUnit]) -> Result<(), TranslationError>;
}

/// Common trait for all language detectors
#[async_trait]
pub trait LanguageDetector: Send + Sync + Debug {
    /// Service id, as used in requests and configuration
    fn id(&self) -> &str;

    /// Whether `lang` is among the languages the detector can report
    fn is_supported(&self, lang: &str) -> bool;

    /// Detect the language of each text. `None` means undetermined.
    ///
    /// # Arguments
    /// * `texts` - The texts to analyse
    /// * `hint` - Optional language hint from the caller
    ///
    /// # Returns
    /// * One entry per input text, in input order
    async fn detect_lang(&self, texts: &[String], hint: Option<&str>) -> Result<Vec<Option<String>>, TranslationError>;
}

pub mod google;
pub mod heuristic;
pub mod hybrid;
pub mod mock;
pub mod pangeanic;
