/*!
 * Google Cloud Translation v3 REST client.
 *
 * One `GoogleClient` is shared by the translation backend and the language
 * detector. Authentication uses a bearer access token.
 */

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ProviderError, TranslationError};
use crate::providers::{LanguageDetector, TranslationBackend};
use crate::translation::unit::TranslationUnit;

pub const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/v3";

const MIME_TYPE_TEXT: &str = "text/plain";

/// translateText request body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTextRequest {
    pub contents: Vec<String>,
    pub target_language_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language_code: Option<String>,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated_text: String,
    #[serde(default)]
    pub detected_language_code: Option<String>,
}

/// translateText response body
#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateTextResponse {
    #[serde(default)]
    pub translations: Vec<Translation>,
}

/// detectLanguage request body, one text per request
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectLanguageRequest {
    pub content: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    pub language_code: String,
    #[serde(default)]
    pub confidence: f64,
}

/// detectLanguage response body
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectLanguageResponse {
    #[serde(default)]
    pub languages: Vec<DetectedLanguage>,
}

/// HTTP client for a Google Cloud project
#[derive(Debug)]
pub struct GoogleClient {
    client: Client,
    endpoint: String,
    project_id: String,
    access_token: String,
}

impl GoogleClient {
    pub fn new(endpoint: impl Into<String>, project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        let project_id = project_id.into();
        info!("Google translation client initialized for project {} at {}", project_id, endpoint);

        Self {
            client,
            endpoint: if endpoint.is_empty() { DEFAULT_ENDPOINT.to_string() } else { endpoint },
            project_id,
            access_token: access_token.into(),
        }
    }

    /// Url of a method on the global location, e.g. `translateText`
    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/projects/{}/locations/global:{}",
            self.endpoint.trim_end_matches('/'),
            self.project_id,
            method
        )
    }

    async fn post<Req: Serialize + Sync, Resp: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &Req,
    ) -> Result<Resp, ProviderError> {
        let response = self
            .client
            .post(self.method_url(method))
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthenticationError(format!("Google API refused the access token ({})", status)));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google API error ({}): {}", status, error_text);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Google API response: {}", e)))
    }

    pub async fn translate_text(&self, request: &TranslateTextRequest) -> Result<TranslateTextResponse, ProviderError> {
        self.post("translateText", request).await
    }

    pub async fn detect_language(&self, text: &str) -> Result<DetectLanguageResponse, ProviderError> {
        let request = DetectLanguageRequest {
            content: text.to_string(),
            mime_type: MIME_TYPE_TEXT.to_string(),
        };
        self.post("detectLanguage", &request).await
    }
}

/// Google translation backend
#[derive(Debug)]
pub struct GoogleTranslator {
    id: String,
    client: Arc<GoogleClient>,
}

impl GoogleTranslator {
    pub fn new(id: impl Into<String>, client: Arc<GoogleClient>) -> Self {
        Self { id: id.into(), client }
    }
}

/// Copy translations onto the units; the response must cover every unit
pub fn apply_translations(units: &mut [TranslationUnit], response: TranslateTextResponse) -> Result<(), TranslationError> {
    if response.translations.len() != units.len() {
        return Err(TranslationError::MalformedResponse(format!(
            "The translation is not completed successfully. Expected {} but received: {}",
            units.len(),
            response.translations.len()
        )));
    }

    for (unit, translation) in units.iter_mut().zip(response.translations) {
        if unit.source_lang.is_none() {
            unit.source_lang = translation.detected_language_code;
        }
        unit.set_translation(Some(translation.translated_text));
    }
    Ok(())
}

#[async_trait]
impl TranslationBackend for GoogleTranslator {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, _source: Option<&str>, _target: &str) -> bool {
        true
    }

    fn single_source_per_call(&self) -> bool {
        true
    }

    async fn translate(&self, units: &mut [TranslationUnit]) -> Result<(), TranslationError> {
        let Some(first) = units.first() else {
            return Ok(());
        };

        let request = TranslateTextRequest {
            contents: units.iter().map(|unit| unit.text.clone()).collect(),
            target_language_code: first.target_lang.clone(),
            source_language_code: first.source_lang.clone(),
            mime_type: MIME_TYPE_TEXT.to_string(),
        };
        debug!("Google translateText request with {} texts", request.contents.len());

        let response = self.client.translate_text(&request).await?;
        apply_translations(units, response)
    }
}

/// Google language detector
#[derive(Debug)]
pub struct GoogleDetector {
    id: String,
    client: Arc<GoogleClient>,
}

impl GoogleDetector {
    pub fn new(id: impl Into<String>, client: Arc<GoogleClient>) -> Self {
        Self { id: id.into(), client }
    }
}

#[async_trait]
impl LanguageDetector for GoogleDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, _lang: &str) -> bool {
        true
    }

    async fn detect_lang(&self, texts: &[String], _hint: Option<&str>) -> Result<Vec<Option<String>>, TranslationError> {
        let mut languages = Vec::with_capacity(texts.len());
        for text in texts {
            let response = self.client.detect_language(text).await?;
            languages.push(response.languages.into_iter().next().map(|lang| lang.language_code));
        }
        Ok(languages)
    }
}
