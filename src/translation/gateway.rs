/*!
 * Request handling for the translation gateway.
 *
 * The gateway validates and normalizes incoming requests, applies the
 * pre-processor, hands the work to the router and shapes the responses.
 * Every translation response carries one entry per input text, in input
 * order; texts that no backend could translate are reported as `null`.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::language_utils::normalize_language_code;
use crate::translation::preprocess;
use crate::translation::router::{RouteRequest, ServiceRouter};
use crate::translation::unit::TranslationUnit;

fn default_true() -> bool {
    true
}

/// Inbound translation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default = "default_true")]
    pub caching: bool,
}

impl TranslateRequest {
    pub fn new(text: Vec<String>, target: impl Into<String>) -> Self {
        Self {
            source: None,
            target: Some(target.into()),
            text,
            service: None,
            fallback: None,
            caching: true,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.caching = false;
        self
    }
}

/// Inbound language detection request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub text: Vec<String>,
    /// Language hint
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
}

impl DetectRequest {
    pub fn new(text: Vec<String>) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }

    pub fn with_hint(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateResponse {
    /// One entry per input text, `null` when untranslated
    pub translations: Vec<Option<String>>,
    /// Source language, as declared or detected by the backend
    pub lang: Option<String>,
    /// Service that produced the translations
    pub service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    /// One entry per input text, `null` when undetermined
    pub langs: Vec<Option<String>>,
    /// The language hint of the request
    pub lang: Option<String>,
    pub service: String,
}

/// Entry point for translation and detection requests
#[derive(Debug, Clone)]
pub struct TranslationGateway {
    router: Arc<ServiceRouter>,
    preprocess_translation: bool,
    preprocess_detection: bool,
}

impl TranslationGateway {
    pub fn new(router: Arc<ServiceRouter>) -> Self {
        Self {
            router,
            preprocess_translation: true,
            preprocess_detection: true,
        }
    }

    pub fn with_preprocessing(mut self, translation: bool, detection: bool) -> Self {
        self.preprocess_translation = translation;
        self.preprocess_detection = detection;
        self
    }

    pub fn router(&self) -> &ServiceRouter {
        &self.router
    }

    /// Translate a batch of texts
    pub async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, TranslationError> {
        let target = match non_blank(request.target.as_deref()) {
            Some(target) => normalize_code("target", target)?,
            None => return Err(TranslationError::invalid_param("target", "The target language must be provided")),
        };
        if request.text.is_empty() {
            return Err(TranslationError::invalid_param("text", "At least one text must be provided"));
        }
        let source = non_blank(request.source.as_deref())
            .map(|source| normalize_code("source", source))
            .transpose()?;

        let route = RouteRequest {
            source: source.as_deref(),
            target: &target,
            service: non_blank(request.service.as_deref()),
            fallback: non_blank(request.fallback.as_deref()),
            caching: request.caching,
        };
        let candidates = self.router.route(&route)?;

        let mut units = TranslationUnit::batch(&request.text, source.as_deref(), &target);
        if self.preprocess_translation {
            preprocess::mark_ineligible(&mut units);
        }
        let service = self.router.execute(&candidates, &mut units).await?;

        let untranslated = units.iter().filter(|unit| !unit.is_translated()).count();
        info!(
            "Translated {} of {} texts to {} with {}",
            units.len() - untranslated,
            units.len(),
            target,
            service.as_deref().unwrap_or("no service")
        );

        let lang = source.or_else(|| units.iter().find_map(|unit| unit.source_lang.clone()));
        Ok(TranslateResponse {
            translations: units
                .iter()
                .map(|unit| unit.translation().map(str::to_string))
                .collect(),
            lang,
            service,
        })
    }

    /// Detect the language of a batch of texts
    pub async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, TranslationError> {
        if request.text.is_empty() {
            return Err(TranslationError::invalid_param("text", "At least one text must be provided"));
        }
        let hint = non_blank(request.lang.as_deref())
            .map(|lang| normalize_code("lang", lang))
            .transpose()?;
        let service = non_blank(request.service.as_deref());
        let fallback = non_blank(request.fallback.as_deref());

        let indices: Vec<usize> = if self.preprocess_detection {
            preprocess::eligible_indices(&request.text)
        } else {
            (0..request.text.len()).collect()
        };

        let mut langs = vec![None; request.text.len()];
        if indices.is_empty() {
            debug!("No text eligible for language detection");
            return Ok(DetectResponse {
                langs,
                lang: hint,
                service: service
                    .unwrap_or_else(|| self.router.registry().default_detection())
                    .to_string(),
            });
        }

        let texts: Vec<String> = indices.iter().map(|&index| request.text[index].clone()).collect();
        let (detected, service_id) = self
            .router
            .detect(&texts, hint.as_deref(), service, fallback)
            .await?;
        for (&index, lang) in indices.iter().zip(detected) {
            langs[index] = lang;
        }

        Ok(DetectResponse {
            langs,
            lang: hint,
            service: service_id,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn normalize_code(param: &str, code: &str) -> Result<String, TranslationError> {
    normalize_language_code(code).map_err(|e| TranslationError::invalid_param(param, e.to_string()))
}
