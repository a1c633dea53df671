/*!
 * Service routing and execution.
 *
 * The router resolves an ordered list of candidate backends for a request
 * (explicit service, language mapping or default, then the optional
 * fallback) and runs them in order on the units that are still untranslated.
 * Detection requests are routed the same way, with the fallback detector
 * used only when the primary one fails.
 */

use log::{debug, info, warn};
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::providers::{LanguageDetector, TranslationBackend};
use crate::registry::ServiceRegistry;
use crate::store::CorrelationStore;
use crate::translation::cache::{CacheStats, CachedBackend};
use crate::translation::unit::{LanguagePair, TranslationUnit, group_by_source_language, pending_indices};

/// Parameter names reported in routing errors
const PARAM_SERVICE: &str = "service";
const PARAM_FALLBACK: &str = "fallback";
const PARAM_LANGUAGE_PAIR: &str = "source.target";
const PARAM_LANG: &str = "lang";

/// Routing inputs of a translation request
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub source: Option<&'a str>,
    pub target: &'a str,
    pub service: Option<&'a str>,
    pub fallback: Option<&'a str>,
    pub caching: bool,
}

/// One backend to try, in order
#[derive(Debug, Clone)]
pub struct Candidate {
    pub backend: Arc<dyn TranslationBackend>,
    pub is_fallback: bool,
}

/// Routes requests to the registered services
#[derive(Debug)]
pub struct ServiceRouter {
    registry: Arc<ServiceRegistry>,
    store: Option<Arc<dyn CorrelationStore>>,
    cache_stats: Arc<CacheStats>,
}

impl ServiceRouter {
    /// Create a router. Without a store, caching requests are served uncached.
    pub fn new(registry: Arc<ServiceRegistry>, store: Option<Arc<dyn CorrelationStore>>) -> Self {
        Self {
            registry,
            store,
            cache_stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Hit/miss counters shared by every cache-wrapped candidate
    pub fn cache_stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.cache_stats)
    }

    /// Remove every cached translation
    pub async fn clear_cache(&self) -> Result<(), TranslationError> {
        if let Some(store) = &self.store {
            store.delete_all().await?;
        }
        self.cache_stats.reset();
        info!("Translation cache cleared");
        Ok(())
    }

    /// Resolve the ordered candidates of a translation request
    pub fn route(&self, request: &RouteRequest<'_>) -> Result<Vec<Candidate>, TranslationError> {
        let primary_id = match request.service {
            Some(service) => service,
            None => request
                .source
                .and_then(|source| self.registry.mapped_translator(source, request.target))
                .unwrap_or_else(|| self.registry.default_translation()),
        };

        let mut candidates = vec![Candidate {
            backend: self.resolve_translator(primary_id, PARAM_SERVICE, request)?,
            is_fallback: false,
        }];
        if let Some(fallback) = request.fallback {
            candidates.push(Candidate {
                backend: self.resolve_translator(fallback, PARAM_FALLBACK, request)?,
                is_fallback: true,
            });
        }

        debug!(
            "Routing {} to {}",
            LanguagePair::new(request.source, request.target),
            candidates
                .iter()
                .map(|candidate| candidate.backend.id())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(candidates)
    }

    fn resolve_translator(
        &self,
        id: &str,
        param: &str,
        request: &RouteRequest<'_>,
    ) -> Result<Arc<dyn TranslationBackend>, TranslationError> {
        let descriptor = self
            .registry
            .translator(id)
            .ok_or_else(|| TranslationError::UnknownService {
                param: param.to_string(),
                service_id: id.to_string(),
                available: self.registry.translator_ids().join(", "),
            })?;

        if !descriptor.supports(request.source, request.target) {
            return Err(TranslationError::UnsupportedLanguagePair {
                param: PARAM_LANGUAGE_PAIR.to_string(),
                pair: LanguagePair::new(request.source, request.target).to_string(),
            });
        }

        let backend = Arc::clone(&descriptor.capability);
        let backend: Arc<dyn TranslationBackend> = match (&self.store, request.caching) {
            (Some(store), true) => {
                Arc::new(CachedBackend::new(backend, Arc::clone(store)).with_stats(self.cache_stats()))
            }
            _ => backend,
        };
        Ok(backend)
    }

    /// Run the candidates in order on the untranslated units
    ///
    /// # Returns
    /// * The id of the last candidate that succeeded, `None` if no call was needed
    pub async fn execute(
        &self,
        candidates: &[Candidate],
        units: &mut [TranslationUnit],
    ) -> Result<Option<String>, TranslationError> {
        let mut service_id = None;
        let mut first_error = None;

        for candidate in candidates {
            let pending = pending_indices(units);
            if pending.is_empty() {
                break;
            }
            if candidate.is_fallback {
                info!(
                    "Falling back to {} for {} untranslated texts",
                    candidate.backend.id(),
                    pending.len()
                );
            }

            let calls = if candidate.backend.single_source_per_call() {
                group_by_source_language(units, &pending)
                    .into_iter()
                    .map(|(_, indices)| indices)
                    .collect()
            } else {
                vec![pending]
            };

            let mut succeeded = false;
            for indices in calls {
                match invoke_subset(candidate.backend.as_ref(), units, &indices).await {
                    Ok(()) => succeeded = true,
                    Err(e) => {
                        warn!("Translation with {} failed: {}", candidate.backend.id(), e);
                        first_error.get_or_insert(e);
                    }
                }
            }
            if succeeded {
                service_id = Some(candidate.backend.id().to_string());
            }
        }

        match (service_id, first_error) {
            (None, Some(e)) => Err(e),
            (service_id, _) => Ok(service_id),
        }
    }

    /// Resolve and run the detectors of a detection request
    ///
    /// # Returns
    /// * One language per text and the id of the detector that answered
    pub async fn detect(
        &self,
        texts: &[String],
        hint: Option<&str>,
        service: Option<&str>,
        fallback: Option<&str>,
    ) -> Result<(Vec<Option<String>>, String), TranslationError> {
        let primary_id = service.unwrap_or_else(|| self.registry.default_detection());
        let primary = self.resolve_detector(primary_id, PARAM_SERVICE, hint)?;
        let fallback = fallback
            .map(|fallback| self.resolve_detector(fallback, PARAM_FALLBACK, hint))
            .transpose()?;

        let primary_error = match run_detector(primary.as_ref(), texts, hint).await {
            Ok(langs) => return Ok((langs, primary.id().to_string())),
            Err(e) => e,
        };
        let Some(fallback) = fallback else {
            return Err(primary_error);
        };

        warn!(
            "Language detection with {} failed, falling back to {}: {}",
            primary.id(),
            fallback.id(),
            primary_error
        );
        match run_detector(fallback.as_ref(), texts, hint).await {
            Ok(langs) => Ok((langs, fallback.id().to_string())),
            Err(e) => {
                warn!("Fallback language detection with {} failed: {}", fallback.id(), e);
                Err(primary_error)
            }
        }
    }

    fn resolve_detector(
        &self,
        id: &str,
        param: &str,
        hint: Option<&str>,
    ) -> Result<Arc<dyn LanguageDetector>, TranslationError> {
        let descriptor = self
            .registry
            .detector(id)
            .ok_or_else(|| TranslationError::UnknownService {
                param: param.to_string(),
                service_id: id.to_string(),
                available: self.registry.detector_ids().join(", "),
            })?;

        if let Some(lang) = hint {
            if !descriptor.supports(lang) {
                return Err(TranslationError::UnsupportedLanguage {
                    param: PARAM_LANG.to_string(),
                    lang: lang.to_string(),
                    service_id: id.to_string(),
                });
            }
        }
        Ok(Arc::clone(&descriptor.capability))
    }
}

/// Translate the units at `indices` and copy the results back
async fn invoke_subset(
    backend: &dyn TranslationBackend,
    units: &mut [TranslationUnit],
    indices: &[usize],
) -> Result<(), TranslationError> {
    let mut subset: Vec<TranslationUnit> = indices.iter().map(|&index| units[index].clone()).collect();
    let result = backend.translate(&mut subset).await;
    for (&index, unit) in indices.iter().zip(subset) {
        units[index] = unit;
    }
    result
}

async fn run_detector(
    detector: &dyn LanguageDetector,
    texts: &[String],
    hint: Option<&str>,
) -> Result<Vec<Option<String>>, TranslationError> {
    let langs = detector.detect_lang(texts, hint).await?;
    if langs.len() != texts.len() {
        return Err(TranslationError::LanguageDetection(format!(
            "{} returned {} languages for {} texts",
            detector.id(),
            langs.len(),
            texts.len()
        )));
    }
    Ok(langs)
}
