/*!
 * Outbound submission to the eTranslation API.
 *
 * The request body comes in two shapes:
 * - inline: the joint text travels in `textToTranslate`, the result comes back
 *   through the success/error callback URLs
 * - document: the joint text is sent base64 encoded as a `txt` document, the
 *   result comes back as a document to the http destination
 */

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::{ProviderError, TranslationError};

/// Shape of the submitted payload, picked from the joint text length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Inline,
    Document,
}

impl PayloadShape {
    /// Inline below the snippet limit, document at or above it.
    /// The length is counted in UTF-16 code units, as the remote API does.
    pub fn for_text(text: &str, snippet_limit: usize) -> Self {
        if text.encode_utf16().count() >= snippet_limit {
            Self::Document
        } else {
            Self::Inline
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerInformation {
    pub application: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destinations {
    pub http_destinations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub content: String,
    pub format: String,
}

/// eTranslation request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_callback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_callback: Option<String>,
    pub external_reference: String,
    pub caller_information: CallerInformation,
    pub source_language: String,
    pub target_languages: Vec<String>,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_to_translate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Destinations>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_to_translate_base64: Option<DocumentPayload>,
}

/// Fields shared by both payload shapes
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    pub external_reference: &'a str,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    pub domain: &'a str,
    pub username: &'a str,
    pub callback_url: &'a str,
    pub error_callback_url: &'a str,
}

impl SubmissionRequest {
    /// Build the request body for `joint_text` in the given shape
    pub fn build(context: &RequestContext<'_>, joint_text: &str, shape: PayloadShape) -> Self {
        let mut request = Self {
            priority: 0,
            requester_callback: None,
            error_callback: None,
            external_reference: context.external_reference.to_string(),
            caller_information: CallerInformation {
                application: context.username.to_string(),
                username: context.username.to_string(),
            },
            source_language: context.source_lang.to_uppercase(),
            target_languages: vec![context.target_lang.to_uppercase()],
            domain: context.domain.to_string(),
            text_to_translate: None,
            destinations: None,
            document_to_translate_base64: None,
        };

        match shape {
            PayloadShape::Inline => {
                request.requester_callback = Some(context.callback_url.to_string());
                request.error_callback = Some(context.error_callback_url.to_string());
                request.text_to_translate = Some(joint_text.to_string());
            }
            PayloadShape::Document => {
                request.destinations = Some(Destinations {
                    http_destinations: vec![context.callback_url.to_string()],
                });
                request.document_to_translate_base64 = Some(DocumentPayload {
                    content: STANDARD.encode(joint_text.as_bytes()),
                    format: "txt".to_string(),
                });
            }
        }

        request
    }
}

/// Submits a request to the asynchronous backend
///
/// Returns the remote request id. The id is informational only; the result
/// is correlated through the external reference.
#[async_trait]
pub trait SubmissionClient: Send + Sync + Debug {
    async fn submit(&self, request: &SubmissionRequest) -> Result<i64, TranslationError>;
}

/// Parse the registration answer: a non-negative request id
pub fn parse_request_id(body: &str) -> Result<i64, TranslationError> {
    match body.trim().parse::<i64>() {
        Ok(id) if id >= 0 => Ok(id),
        _ => Err(TranslationError::RemoteRegistrationFailed(format!(
            "eTranslation error response: {}",
            body
        ))),
    }
}

/// Basic-auth HTTP client for the eTranslation API
#[derive(Debug)]
pub struct HttpSubmissionClient {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
}

impl HttpSubmissionClient {
    pub fn new(endpoint: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Serialized body with credentials masked, for logging
    fn sanitized_body(&self, request: &SubmissionRequest) -> String {
        let mut body = serde_json::to_string(request).unwrap_or_default();
        for secret in [&self.password, &self.username] {
            if !secret.is_empty() {
                body = body.replace(secret.as_str(), "*****");
            }
        }
        body
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(&self, request: &SubmissionRequest) -> Result<i64, TranslationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from)?;

        if status != StatusCode::OK {
            error!("eTranslation rejected the request with status {}: {}", status, body);
            return Err(TranslationError::RemoteRegistrationFailed(format!(
                "eTranslation response: {}, response body: {}",
                status.as_u16(),
                body
            )));
        }

        let request_id = parse_request_id(&body)?;
        debug!(
            "eTranslation request sent with the request-id: {} and body: {}",
            request_id,
            self.sanitized_body(request)
        );
        Ok(request_id)
    }
}
