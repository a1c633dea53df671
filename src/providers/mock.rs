/*!
 * Mock backend implementations for testing and `dummy` services.
 *
 * This module provides backends that simulate different behaviors:
 * - `MockBackend::working()` - Always translates every unit
 * - `MockBackend::partial(n)` - Translates every n-th unit only
 * - `MockBackend::intermittent(n)` - Fails every n-th call
 * - `MockBackend::failing()` - Always fails with an error
 * - `MockDetector` - Fixed-answer language detector
 *
 * Every call is recorded so tests can assert what reached the backend.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{ProviderError, TranslationError};
use crate::providers::{LanguageDetector, TranslationBackend};
use crate::translation::unit::TranslationUnit;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a translation for every unit
    Working,
    /// Succeeds but only translates every n-th unit of a call
    Partial { translate_every: usize },
    /// Fails intermittently (every Nth call)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub texts: Vec<String>,
    pub source_lang: Option<String>,
    pub target_lang: String,
}

/// Mock translation backend
#[derive(Debug, Clone)]
pub struct MockBackend {
    id: String,
    behavior: MockBehavior,
    /// Supported `(source, target)` pairs. Empty means everything.
    supported_pairs: Vec<(String, String)>,
    single_source: bool,
    /// Call counter for intermittent failures, shared between clones
    request_count: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    /// Custom translation generator (optional)
    custom_response: Option<fn(&TranslationUnit) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(id: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            id: id.into(),
            behavior,
            supported_pairs: Vec::new(),
            single_source: false,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock backend that always succeeds
    pub fn working() -> Self {
        Self::new("mock", MockBehavior::Working)
    }

    /// Create a backend translating every n-th unit only
    pub fn partial(translate_every: usize) -> Self {
        Self::new("mock", MockBehavior::Partial { translate_every })
    }

    /// Create an intermittently failing mock backend
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new("mock", MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock backend that always errors
    pub fn failing() -> Self {
        Self::new("mock", MockBehavior::Failing)
    }

    /// Create a backend that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new("mock", MockBehavior::Slow { delay_ms })
    }

    /// Set the service id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Restrict the backend to the given language pair (may be called repeatedly)
    pub fn with_supported_pair(mut self, source: &str, target: &str) -> Self {
        self.supported_pairs.push((source.to_string(), target.to_string()));
        self
    }

    /// Require one language pair per call
    pub fn with_single_source(mut self) -> Self {
        self.single_source = true;
        self
    }

    /// Set a custom translation generator
    pub fn with_custom_response(mut self, generator: fn(&TranslationUnit) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn render(&self, unit: &TranslationUnit) -> String {
        match self.custom_response {
            Some(generator) => generator(unit),
            None => format!("[TRANSLATED to {}] {}", unit.target_lang, unit.text),
        }
    }

    fn translate_all(&self, units: &mut [TranslationUnit], every: usize) {
        for (position, unit) in units.iter_mut().enumerate() {
            if position % every == 0 {
                let translation = self.render(unit);
                unit.set_translation(Some(translation));
            }
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, source: Option<&str>, target: &str) -> bool {
        if self.supported_pairs.is_empty() {
            return true;
        }
        self.supported_pairs
            .iter()
            .any(|(src, tgt)| tgt == target && source.is_none_or(|source| source == src))
    }

    fn single_source_per_call(&self) -> bool {
        self.single_source
    }

    async fn translate(&self, units: &mut [TranslationUnit]) -> Result<(), TranslationError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(RecordedCall {
            texts: units.iter().map(|unit| unit.text.clone()).collect(),
            source_lang: units.first().and_then(|unit| unit.source_lang.clone()),
            target_lang: units.first().map(|unit| unit.target_lang.clone()).unwrap_or_default(),
        });

        match self.behavior {
            MockBehavior::Working => {
                self.translate_all(units, 1);
                Ok(())
            }

            MockBehavior::Partial { translate_every } => {
                self.translate_all(units, translate_every.max(1));
                Ok(())
            }

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    }
                    .into())
                } else {
                    self.translate_all(units, 1);
                    Ok(())
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: format!("Simulated failure of {}", self.id),
                status_code: 500,
            }
            .into()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                self.translate_all(units, 1);
                Ok(())
            }
        }
    }
}

/// Mock language detector answering with a fixed language
#[derive(Debug, Clone)]
pub struct MockDetector {
    id: String,
    answer: Option<String>,
    /// Answer with the caller's hint when one is given
    use_hint: bool,
    supported: Vec<String>,
    failing: bool,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockDetector {
    /// Detector reporting `lang` for every text
    pub fn answering(id: impl Into<String>, lang: Option<&str>) -> Self {
        Self {
            id: id.into(),
            answer: lang.map(str::to_string),
            use_hint: false,
            supported: Vec::new(),
            failing: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Detector reporting the hint, or English without one
    pub fn dummy(id: impl Into<String>) -> Self {
        Self {
            use_hint: true,
            ..Self::answering(id, Some("en"))
        }
    }

    /// Detector that always fails
    pub fn failing(id: impl Into<String>) -> Self {
        Self {
            failing: true,
            ..Self::answering(id, None)
        }
    }

    /// Restrict the languages accepted as hint
    pub fn with_supported(mut self, langs: &[&str]) -> Self {
        self.supported = langs.iter().map(|lang| lang.to_string()).collect();
        self
    }

    /// Texts received so far, one entry per call
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LanguageDetector for MockDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, lang: &str) -> bool {
        self.supported.is_empty() || self.supported.iter().any(|supported| supported == lang)
    }

    async fn detect_lang(&self, texts: &[String], hint: Option<&str>) -> Result<Vec<Option<String>>, TranslationError> {
        self.calls.lock().push(texts.to_vec());
        if self.failing {
            return Err(TranslationError::LanguageDetection(format!("Simulated failure of {}", self.id)));
        }
        let answer = match hint.filter(|hint| self.use_hint && !hint.trim().is_empty()) {
            Some(hint) => Some(hint.to_string()),
            None => self.answer.clone(),
        };
        Ok(vec![answer; texts.len()])
    }
}
