/*!
 * Translation caching functionality.
 *
 * This module provides the content-addressed cache keys shared by the cache
 * decorator and the asynchronous bridge, and `CachedBackend`, a decorator
 * that short-circuits already seen texts through the correlation store so
 * repeated inputs skip backend calls.
 */

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use log::{debug, warn};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::providers::TranslationBackend;
use crate::store::CorrelationStore;
use crate::translation::unit::{TranslationUnit, pending_indices};

/// 32-bit polynomial string hash, `h = 31 * h + unit` over UTF-16 code units
///
/// Keys built from it must stay stable across restarts and across instances
/// sharing one store, so the recurrence and the wrapping arithmetic are fixed.
pub fn java_string_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Build a cache key: `prefix + source + target + base64(hash(text))`
pub fn generate_key(text: &str, source_language: &str, target_language: &str, prefix: &str) -> String {
    let encoded = STANDARD_NO_PAD.encode(java_string_hash(text).to_be_bytes());
    format!("{}{}{}{}", prefix, source_language, target_language, encoded)
}

/// Cache hit/miss counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: RwLock<usize>,
    misses: RwLock<usize>,
}

impl CacheStats {
    fn record(&self, hits: usize, misses: usize) {
        *self.hits.write() += hits;
        *self.misses.write() += misses;
    }

    /// Returns `(hits, misses, hit_rate)`
    pub fn snapshot(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    pub fn reset(&self) {
        *self.hits.write() = 0;
        *self.misses.write() = 0;
    }
}

/// Cache decorator around any translation backend
pub struct CachedBackend {
    /// Decorated backend
    inner: Arc<dyn TranslationBackend>,

    /// Backing store for cache entries
    store: Arc<dyn CorrelationStore>,

    stats: Arc<CacheStats>,
}

impl CachedBackend {
    /// Wrap a backend with the translation cache
    pub fn new(inner: Arc<dyn TranslationBackend>, store: Arc<dyn CorrelationStore>) -> Self {
        Self {
            inner,
            store,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Record hits and misses into shared counters
    pub fn with_stats(mut self, stats: Arc<CacheStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Hit/miss statistics of this decorator
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Remove every cached entry from the store
    pub async fn delete_all(&self) -> Result<(), TranslationError> {
        self.store.delete_all().await?;
        self.stats.reset();
        debug!("Translation cache cleared");
        Ok(())
    }

    /// Assign keys and serve hits from the store. Returns `(hits, misses)`.
    async fn lookup(&self, units: &mut [TranslationUnit]) -> (usize, usize) {
        let mut hits = 0;
        let mut misses = 0;
        let mut store_available = true;

        for unit in units.iter_mut().filter(|unit| !unit.is_translated()) {
            let Some(source) = unit.source_lang.as_deref() else {
                continue;
            };
            let key = generate_key(&unit.text, source, &unit.target_lang, "");

            if store_available {
                match self.store.get(&key).await {
                    Ok(Some(translation)) => {
                        debug!("Cache hit for '{}' ({})", truncate_text(&unit.text, 30), key);
                        unit.set_cached_translation(translation);
                        hits += 1;
                    }
                    Ok(None) => misses += 1,
                    Err(e) => {
                        warn!("Cache lookup failed on {} store, continuing without cache: {}", self.store.name(), e);
                        store_available = false;
                        misses += 1;
                    }
                }
            } else {
                misses += 1;
            }
            unit.cache_key = Some(key);
        }

        (hits, misses)
    }

    /// Store fresh translations. Failures are logged, never returned.
    async fn write_back(&self, units: &[TranslationUnit]) {
        for unit in units.iter().filter(|unit| !unit.retrieved_from_cache) {
            let (Some(key), Some(translation)) = (unit.cache_key.as_deref(), unit.translation()) else {
                continue;
            };
            if let Err(e) = self.store.set(key, translation).await {
                warn!("Failed to cache translation under {}: {}", key, e);
                return;
            }
        }
    }
}

impl fmt::Debug for CachedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedBackend")
            .field("inner", &self.inner.id())
            .field("store", &self.store.name())
            .finish()
    }
}

#[async_trait]
impl TranslationBackend for CachedBackend {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn is_supported(&self, source: Option<&str>, target: &str) -> bool {
        self.inner.is_supported(source, target)
    }

    fn single_source_per_call(&self) -> bool {
        self.inner.single_source_per_call()
    }

    async fn translate(&self, units: &mut [TranslationUnit]) -> Result<(), TranslationError> {
        let (hits, misses) = self.lookup(units).await;
        self.stats.record(hits, misses);

        let pending = pending_indices(units);
        if pending.is_empty() {
            debug!("All {} texts served from cache for {}", units.len(), self.inner.id());
            return Ok(());
        }

        let result = if pending.len() == units.len() {
            self.inner.translate(units).await
        } else {
            let mut subset: Vec<TranslationUnit> = pending.iter().map(|&index| units[index].clone()).collect();
            let result = self.inner.translate(&mut subset).await;
            for (index, unit) in pending.into_iter().zip(subset) {
                units[index] = unit;
            }
            result
        };

        if result.is_ok() {
            self.write_back(units).await;
        }
        result
    }
}

/// Truncate text to a maximum number of characters with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
