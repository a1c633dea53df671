/*!
 * Length-based hybrid language detector.
 *
 * Short texts carry too little signal to justify a remote call, so texts under
 * `min_remote_length` characters go to the local detector and the rest to the
 * remote one. Results are merged back in input order.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::providers::LanguageDetector;

/// Texts of at least this many characters go to the remote detector
pub const DEFAULT_MIN_REMOTE_LENGTH: usize = 40;

#[derive(Debug)]
pub struct HybridDetector {
    id: String,
    local: Arc<dyn LanguageDetector>,
    remote: Arc<dyn LanguageDetector>,
    min_remote_length: usize,
}

impl HybridDetector {
    pub fn new(id: impl Into<String>, local: Arc<dyn LanguageDetector>, remote: Arc<dyn LanguageDetector>) -> Self {
        Self {
            id: id.into(),
            local,
            remote,
            min_remote_length: DEFAULT_MIN_REMOTE_LENGTH,
        }
    }

    pub fn with_min_remote_length(mut self, min_remote_length: usize) -> Self {
        self.min_remote_length = min_remote_length;
        self
    }

    /// Run one detector on a subset of texts and place the results
    async fn detect_subset(
        detector: &dyn LanguageDetector,
        texts: &[String],
        indices: &[usize],
        hint: Option<&str>,
        results: &mut [Option<String>],
    ) -> Result<(), TranslationError> {
        if indices.is_empty() {
            return Ok(());
        }
        let subset: Vec<String> = indices.iter().map(|&index| texts[index].clone()).collect();
        let detected = detector.detect_lang(&subset, hint).await?;
        if detected.len() != subset.len() {
            return Err(TranslationError::LanguageDetection(format!(
                "{} returned {} languages for {} texts",
                detector.id(),
                detected.len(),
                subset.len()
            )));
        }
        for (&index, lang) in indices.iter().zip(detected) {
            results[index] = lang;
        }
        Ok(())
    }
}

#[async_trait]
impl LanguageDetector for HybridDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, lang: &str) -> bool {
        self.local.is_supported(lang) && self.remote.is_supported(lang)
    }

    async fn detect_lang(&self, texts: &[String], hint: Option<&str>) -> Result<Vec<Option<String>>, TranslationError> {
        let (remote, local): (Vec<usize>, Vec<usize>) =
            (0..texts.len()).partition(|&index| texts[index].chars().count() >= self.min_remote_length);
        debug!(
            "Hybrid detection: {} texts to {}, {} texts to {}",
            local.len(),
            self.local.id(),
            remote.len(),
            self.remote.id()
        );

        let mut results = vec![None; texts.len()];
        Self::detect_subset(self.local.as_ref(), texts, &local, hint, &mut results).await?;
        Self::detect_subset(self.remote.as_ref(), texts, &remote, hint, &mut results).await?;
        Ok(results)
    }
}
