/*!
 * Pangeanic translation and language detection client.
 *
 * Both APIs answer with a score per text:
 * - a translation is accepted only when its score exceeds the threshold
 *   configured for the source language
 * - a detected language is accepted only with a score of at least 0.5
 *
 * When no source language is given, the translator detects it first and then
 * sends one request per detected language.
 */

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ProviderError, TranslationError};
use crate::providers::{LanguageDetector, TranslationBackend};
use crate::translation::unit::{TranslationUnit, group_by_source_language};

/// Minimum score for a detected language to be accepted
pub const DETECTION_THRESHOLD: f64 = 0.5;

/// Languages Pangeanic can detect, and translate from into English
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "sk", "ro", "bg", "pl", "hr", "sv", "fr", "it", "es", "cs", "de", "lv", "nl", "el", "fi", "da", "sl", "hu",
    "pt", "et", "lt", "ga", "en",
];

/// Pangeanic translates into English only
pub const TARGET_LANGUAGE: &str = "en";

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub src: String,
    pub tgt: String,
    pub text: Vec<String>,
    pub apikey: String,
    pub mode: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoredTranslation {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub tgt: Option<String>,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    #[serde(default)]
    pub src_lang: Option<String>,
    pub translations: Option<Vec<ScoredTranslation>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectRequest {
    pub text: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    pub apikey: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScoredLanguage {
    #[serde(default)]
    pub src_detected: Option<String>,
    #[serde(default)]
    pub src_lang_score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detected_langs: Option<Vec<ScoredLanguage>>,
}

fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(3600))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_default()
}

/// Pangeanic language detector
#[derive(Debug)]
pub struct PangeanicDetector {
    id: String,
    client: Client,
    endpoint: String,
}

impl PangeanicDetector {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        info!("Pangeanic language detection initialized with endpoint {}", endpoint);
        Self {
            id: id.into(),
            client: http_client(),
            endpoint,
        }
    }
}

/// Keep the languages whose score reaches the detection threshold
pub fn accepted_languages(response: DetectResponse) -> Result<Vec<Option<String>>, TranslationError> {
    let detected = response.detected_langs.ok_or_else(|| {
        TranslationError::LanguageDetection("Language detect response doesn't have detected_langs".to_string())
    })?;

    Ok(detected
        .into_iter()
        .map(|lang| match (lang.src_detected, lang.src_lang_score) {
            (Some(code), Some(score)) if score >= DETECTION_THRESHOLD => Some(code),
            _ => None,
        })
        .collect())
}

#[async_trait]
impl LanguageDetector for PangeanicDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, lang: &str) -> bool {
        SUPPORTED_LANGUAGES.contains(&lang)
    }

    async fn detect_lang(&self, texts: &[String], hint: Option<&str>) -> Result<Vec<Option<String>>, TranslationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = DetectRequest {
            text: texts.to_vec(),
            src: hint.map(str::to_string),
            apikey: String::new(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from)?;

        // A 400 may still carry a usable answer
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::BAD_REQUEST {
            error!("Pangeanic language detection error: {}", status);
            return Err(TranslationError::LanguageDetection(format!(
                "Error from Pangeanic Language Detect API: {}",
                status
            )));
        }

        let body = response.text().await.map_err(ProviderError::from)?;
        if body.trim().is_empty() {
            return Err(TranslationError::LanguageDetection(
                "Language detect returned an empty response".to_string(),
            ));
        }
        let parsed: DetectResponse = serde_json::from_str(&body)
            .map_err(|e| TranslationError::LanguageDetection(format!("Cannot read Pangeanic response: {}", e)))?;

        let languages = accepted_languages(parsed)?;
        debug!("Pangeanic detected languages: {:?}", languages);
        Ok(languages)
    }
}

/// Pangeanic translation backend
#[derive(Debug)]
pub struct PangeanicTranslator {
    id: String,
    client: Client,
    endpoint: String,
    /// Minimum score per source language; missing languages use 0
    thresholds: HashMap<String, f64>,
    detector: Option<Arc<dyn LanguageDetector>>,
}

impl PangeanicTranslator {
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        thresholds: HashMap<String, f64>,
        detector: Option<Arc<dyn LanguageDetector>>,
    ) -> Self {
        let endpoint = endpoint.into();
        info!("Pangeanic translation initialized with endpoint {}", endpoint);
        Self {
            id: id.into(),
            client: http_client(),
            endpoint,
            thresholds,
            detector,
        }
    }

    fn threshold(&self, source: &str) -> f64 {
        self.thresholds.get(source).copied().unwrap_or(0.0)
    }

    /// Fill in the source language of every unit, or fail
    async fn detect_sources(&self, units: &mut [TranslationUnit]) -> Result<(), TranslationError> {
        let detector = self.detector.as_ref().ok_or_else(|| {
            TranslationError::LanguageDetection(format!("No language detector configured for {}", self.id))
        })?;

        let texts: Vec<String> = units.iter().map(|unit| unit.text.clone()).collect();
        let detected = detector.detect_lang(&texts, None).await?;
        if detected.len() != units.len() || detected.iter().any(Option::is_none) {
            return Err(TranslationError::LanguageDetection(
                "The translation cannot be performed. The detected languages are incomplete".to_string(),
            ));
        }

        for (unit, lang) in units.iter_mut().zip(detected) {
            unit.source_lang = lang;
        }
        Ok(())
    }

    /// Apply scored translations to units of one source language
    pub fn apply_scored(
        &self,
        units: &mut [TranslationUnit],
        indices: &[usize],
        source: &str,
        response: TranslateResponse,
    ) -> Result<(), TranslationError> {
        let translations = response.translations.ok_or_else(|| {
            TranslationError::MalformedResponse("Pangeanic Translation API returned empty response".to_string())
        })?;
        if translations.len() != indices.len() {
            return Err(TranslationError::MalformedResponse(format!(
                "The translation is incomplete for text with language: {}. Expected {} but received: {}",
                source,
                indices.len(),
                translations.len()
            )));
        }

        let threshold = self.threshold(source);
        for (&index, translation) in indices.iter().zip(translations) {
            if let (Some(_), Some(target)) = (translation.src, translation.tgt) {
                if translation.score > threshold {
                    units[index].set_translation(Some(target));
                }
            }
        }
        Ok(())
    }

    async fn translate_group(
        &self,
        units: &mut [TranslationUnit],
        indices: &[usize],
        source: &str,
        target: &str,
    ) -> Result<(), TranslationError> {
        let request = TranslateRequest {
            src: source.to_string(),
            tgt: target.to_string(),
            text: indices.iter().map(|&index| units[index].text.clone()).collect(),
            apikey: String::new(),
            mode: "EUROPEANA".to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from)?;
        if status != StatusCode::OK {
            error!("Pangeanic translation error ({}): {}", status, body);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            }
            .into());
        }

        let parsed: TranslateResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::ParseError(format!("Cannot read Pangeanic response: {}", e)))?;
        self.apply_scored(units, indices, source, parsed)
    }
}

#[async_trait]
impl TranslationBackend for PangeanicTranslator {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, source: Option<&str>, target: &str) -> bool {
        if target != TARGET_LANGUAGE {
            return false;
        }
        source.is_none_or(|source| source != TARGET_LANGUAGE && SUPPORTED_LANGUAGES.contains(&source))
    }

    async fn translate(&self, units: &mut [TranslationUnit]) -> Result<(), TranslationError> {
        let Some(first) = units.first() else {
            return Ok(());
        };
        let target = first.target_lang.clone();

        if first.source_lang.is_none() {
            self.detect_sources(units).await?;
        }

        let all: Vec<usize> = (0..units.len()).collect();
        for (source, indices) in group_by_source_language(units, &all) {
            // not declared and not detected
            let Some(source) = source else {
                continue;
            };
            self.translate_group(units, &indices, &source, &target).await?;
        }
        Ok(())
    }
}
