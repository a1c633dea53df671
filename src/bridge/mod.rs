/*!
 * Synchronous-over-asynchronous bridge for the eTranslation backend.
 *
 * eTranslation never answers a request directly: it accepts a submission and
 * later calls a webhook with the result. The bridge makes it look like a
 * synchronous backend:
 *
 * 1. join the batch texts with a reserved delimiter
 * 2. derive the external reference from the joint text and language pair
 * 3. subscribe to the store channel named after the reference
 * 4. submit the request (inline or as a document, by size)
 * 5. wait for the webhook ingress to publish the result, within a budget
 * 6. decode and split the result back onto the units
 *
 * The subscription is released on every exit path.
 */

use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};

use crate::errors::{AppError, StoreError, TranslationError};
use crate::providers::TranslationBackend;
use crate::store::{CorrelationStore, Subscription};
use crate::translation::cache::generate_key;
use crate::translation::unit::TranslationUnit;

pub mod submission;
pub mod webhook;

pub use submission::{HttpSubmissionClient, PayloadShape, SubmissionClient, SubmissionRequest};
pub use webhook::CallbackIngress;

/// Joins the texts of a batch; the marker inside cannot occur in natural text
pub const TEXT_DELIMITER: &str = "\n[notranslate]deenPVsaOg[/notranslate]\n";

/// The delimiter without its newlines, used to split the result
pub const DELIMITER_MARKER: &str = "[notranslate]deenPVsaOg[/notranslate]";

/// Marks a message published by the error callback
pub const ERROR_CALLBACK_MARKER: &str = "eTranslationErrorCallback";

pub const PATH_CALLBACK: &str = "/etranslation/callback";
pub const PATH_ERROR_CALLBACK: &str = "/etranslation/error-callback";

/// Prefix of external references, keeps them apart from cache keys
pub const EXTERNAL_REFERENCE_PREFIX: &str = "et:";

pub const DEFAULT_SNIPPET_LIMIT: usize = 4990;

/// Decoder for translated documents: padding is optional and trailing bits
/// are tolerated, since callbacks may carry unpadded or line-wrapped base64
const DOCUMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Connection and behaviour settings of the bridge
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    /// eTranslation submission endpoint
    pub base_url: String,
    /// eTranslation domain, e.g. `GEN`
    pub domain: String,
    /// Public base URL of this gateway, callback paths are appended to it
    pub callback_base_url: String,
    /// Wait budget for the callback
    pub max_wait_ms: u64,
    pub username: String,
    pub password: String,
    /// Joint texts at or above this UTF-16 length are sent as documents
    pub snippet_limit: usize,
}

impl BridgeSettings {
    /// Names of the parameters that are missing or invalid
    pub fn missing_params(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.trim().is_empty() {
            missing.push("base_url");
        }
        if self.domain.trim().is_empty() {
            missing.push("domain");
        }
        if self.callback_base_url.trim().is_empty() {
            missing.push("callback_base_url");
        }
        if self.max_wait_ms == 0 {
            missing.push("max_wait_ms (must be >0)");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.password.trim().is_empty() {
            missing.push("password");
        }
        missing
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let missing = self.missing_params();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!(
                "Invalid eTranslation config parameters: [{}]",
                missing.join(", ")
            )))
        }
    }

    pub fn callback_url(&self) -> String {
        format!("{}{}", self.callback_base_url.trim_end_matches('/'), PATH_CALLBACK)
    }

    pub fn error_callback_url(&self) -> String {
        format!("{}{}", self.callback_base_url.trim_end_matches('/'), PATH_ERROR_CALLBACK)
    }
}

/// eTranslation backend bridged through the correlation store
pub struct AsyncCorrelationBridge<C: SubmissionClient = HttpSubmissionClient> {
    id: String,
    settings: BridgeSettings,
    client: C,
    store: Arc<dyn CorrelationStore>,
}

impl AsyncCorrelationBridge<HttpSubmissionClient> {
    /// Create a bridge submitting over HTTP
    pub fn connect(
        id: impl Into<String>,
        settings: BridgeSettings,
        store: Arc<dyn CorrelationStore>,
    ) -> Result<Self, AppError> {
        let client = HttpSubmissionClient::new(&settings.base_url, &settings.username, &settings.password);
        Self::new(id, settings, client, store)
    }
}

impl<C: SubmissionClient> AsyncCorrelationBridge<C> {
    /// Create a bridge with a custom submission client
    pub fn new(
        id: impl Into<String>,
        settings: BridgeSettings,
        client: C,
        store: Arc<dyn CorrelationStore>,
    ) -> Result<Self, AppError> {
        settings.validate()?;
        Ok(Self {
            id: id.into(),
            settings,
            client,
            store,
        })
    }

    /// Submit and wait for the published result
    async fn submit_and_wait(
        &self,
        request: &SubmissionRequest,
        subscription: &mut Subscription,
    ) -> Result<String, TranslationError> {
        let request_id = self.client.submit(request).await?;
        info!(
            "eTranslation request {} registered for external reference {}",
            request_id, request.external_reference
        );
        self.wait_for_message(subscription).await
    }

    /// Wait on the subscription until a non-blank message arrives or the budget runs out
    async fn wait_for_message(&self, subscription: &mut Subscription) -> Result<String, TranslationError> {
        let budget = Duration::from_millis(self.settings.max_wait_ms);
        let started = Instant::now();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= budget {
                debug!(
                    "No eTranslation response on {} after waiting {} ms",
                    subscription.channel(),
                    elapsed.as_millis()
                );
                return Err(TranslationError::GatewayTimeout {
                    waited_ms: self.settings.max_wait_ms,
                });
            }

            match timeout(budget - elapsed, subscription.recv()).await {
                Ok(Some(message)) if message.trim().is_empty() => {
                    debug!("Spurious wakeup on {}, waiting again", subscription.channel());
                }
                Ok(Some(message)) => return Ok(message),
                Ok(None) => {
                    return Err(StoreError::SubscriptionClosed(subscription.channel().to_string()).into());
                }
                // budget exhausted, reported at the top of the loop
                Err(_) => {}
            }
        }
    }
}

impl<C: SubmissionClient> fmt::Debug for AsyncCorrelationBridge<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCorrelationBridge")
            .field("id", &self.id)
            .field("base_url", &self.settings.base_url)
            .field("max_wait_ms", &self.settings.max_wait_ms)
            .finish()
    }
}

#[async_trait]
impl<C: SubmissionClient> TranslationBackend for AsyncCorrelationBridge<C> {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_supported(&self, source: Option<&str>, _target: &str) -> bool {
        source.is_some()
    }

    fn single_source_per_call(&self) -> bool {
        true
    }

    async fn translate(&self, units: &mut [TranslationUnit]) -> Result<(), TranslationError> {
        let Some(first) = units.first() else {
            return Ok(());
        };
        let source = first
            .source_lang
            .clone()
            .ok_or_else(|| TranslationError::MissingSourceLanguage(self.id.clone()))?;
        let target = first.target_lang.clone();
        if units
            .iter()
            .any(|unit| unit.source_lang.as_deref() != Some(source.as_str()) || unit.target_lang != target)
        {
            return Err(TranslationError::MixedLanguageBatch(self.id.clone()));
        }

        let joint_text = join_texts(units);
        let external_reference = generate_key(&joint_text, &source, &target, EXTERNAL_REFERENCE_PREFIX);
        let shape = PayloadShape::for_text(&joint_text, self.settings.snippet_limit);

        let callback_url = self.settings.callback_url();
        let error_callback_url = self.settings.error_callback_url();
        let request = SubmissionRequest::build(
            &submission::RequestContext {
                external_reference: &external_reference,
                source_lang: &source,
                target_lang: &target,
                domain: &self.settings.domain,
                username: &self.settings.username,
                callback_url: &callback_url,
                error_callback_url: &error_callback_url,
            },
            &joint_text,
            shape,
        );

        // Subscribe first: a fast callback must find a listener
        let mut subscription = self.store.subscribe(&external_reference).await?;
        let outcome = self.submit_and_wait(&request, &mut subscription).await;
        subscription.unsubscribe();

        let message = outcome?;
        debug!("eTranslation response received on {}: {}", external_reference, message);

        let translations = decode_response(&message, shape, units.len())?;
        for (unit, translation) in units.iter_mut().zip(translations) {
            unit.set_translation(Some(translation));
        }
        Ok(())
    }
}

/// Join the unit texts with the reserved delimiter
pub fn join_texts(units: &[TranslationUnit]) -> String {
    units
        .iter()
        .map(|unit| unit.text.as_str())
        .collect::<Vec<_>>()
        .join(TEXT_DELIMITER)
}

/// Undo the escaping of an inline callback payload: one leading and one
/// trailing double quote are removed and literal `\n` sequences become newlines
pub fn normalize_inline_payload(message: &str) -> String {
    let message = message.strip_prefix('"').unwrap_or(message);
    let message = message.strip_suffix('"').unwrap_or(message);
    message.replace("\\n", "\n")
}

/// Turn a published message into one translation per unit
pub fn decode_response(message: &str, shape: PayloadShape, expected: usize) -> Result<Vec<String>, TranslationError> {
    if message.contains(ERROR_CALLBACK_MARKER) {
        return Err(TranslationError::RemoteProcessingError(message.to_string()));
    }

    let payload = match shape {
        PayloadShape::Inline => normalize_inline_payload(message),
        PayloadShape::Document => {
            let compact: String = message.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = DOCUMENT_ENGINE
                .decode(compact)
                .map_err(|e| TranslationError::MalformedResponse(format!("invalid base64 document: {}", e)))?;
            String::from_utf8(bytes)
                .map_err(|e| TranslationError::MalformedResponse(format!("document is not UTF-8: {}", e)))?
        }
    };

    let pieces: Vec<String> = payload
        .split(DELIMITER_MARKER)
        .map(|piece| piece.trim().to_string())
        .collect();
    if pieces.len() != expected {
        return Err(TranslationError::ResponseSizeMismatch {
            expected,
            received: pieces.len(),
        });
    }
    Ok(pieces)
}
