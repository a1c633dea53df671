/*!
 * Common test utilities for the babelgate test suite
 */

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use std::time::Duration;

use babelgate::bridge::submission::{SubmissionClient, SubmissionRequest};
use babelgate::bridge::{AsyncCorrelationBridge, BridgeSettings, CallbackIngress, DEFAULT_SNIPPET_LIMIT, TEXT_DELIMITER};
use babelgate::errors::{StoreError, TranslationError};
use babelgate::store::{CorrelationStore, Subscription};

static INIT: Once = Once::new();

/// Initialize env_logger once for the whole test binary
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Helper to build a list of owned strings
pub fn texts(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Bridge settings pointing at an unreachable remote, for simulated submissions
pub fn bridge_settings(max_wait_ms: u64) -> BridgeSettings {
    BridgeSettings {
        base_url: "https://remote.example/translation/api".to_string(),
        domain: "GEN".to_string(),
        callback_base_url: "https://gateway.example".to_string(),
        max_wait_ms,
        username: "gateway".to_string(),
        password: "secret".to_string(),
        snippet_limit: DEFAULT_SNIPPET_LIMIT,
    }
}

/// How the simulated remote answers a submission
#[derive(Debug, Clone)]
pub enum RemoteAnswer {
    /// Translate through the dictionary and deliver the success callback
    Translate,
    /// Deliver the error callback with the given code and message
    Fail { code: String, message: String },
    /// Accept the request and never call back
    Silent,
}

/// Submission client simulating the remote eTranslation service
///
/// Every accepted request is answered asynchronously through the webhook
/// ingress after `delay_ms`, the way the real service calls the gateway back.
/// Clones share the record of submitted requests.
#[derive(Debug, Clone)]
pub struct SimulatedRemote {
    ingress: CallbackIngress,
    dictionary: HashMap<String, String>,
    answer: RemoteAnswer,
    delay_ms: u64,
    submitted: Arc<Mutex<Vec<SubmissionRequest>>>,
}

impl SimulatedRemote {
    pub fn new(store: Arc<dyn CorrelationStore>, answer: RemoteAnswer, delay_ms: u64) -> Self {
        Self {
            ingress: CallbackIngress::new(store),
            dictionary: HashMap::new(),
            answer,
            delay_ms,
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Remote translating German sentences about a dog and a tree
    pub fn german(store: Arc<dyn CorrelationStore>, delay_ms: u64) -> Self {
        Self::new(store, RemoteAnswer::Translate, delay_ms)
            .with_translation("Das ist mein Hund.", "That is my dog.")
            .with_translation("Das ist mein Baum.", "That is my tree.")
            .with_translation("Guten Morgen", "Good morning")
    }

    pub fn with_translation(mut self, source: &str, translation: &str) -> Self {
        self.dictionary.insert(source.to_string(), translation.to_string());
        self
    }

    /// Requests received so far
    pub fn submitted(&self) -> Vec<SubmissionRequest> {
        self.submitted.lock().clone()
    }

    fn translate_joint(&self, joint: &str) -> String {
        joint
            .split(TEXT_DELIMITER)
            .map(|text| self.dictionary.get(text).cloned().unwrap_or_else(|| text.to_string()))
            .collect::<Vec<_>>()
            .join(TEXT_DELIMITER)
    }
}

#[async_trait]
impl SubmissionClient for SimulatedRemote {
    async fn submit(&self, request: &SubmissionRequest) -> Result<i64, TranslationError> {
        self.submitted.lock().push(request.clone());
        let reference = request.external_reference.clone();
        let ingress = self.ingress.clone();
        let delay = Duration::from_millis(self.delay_ms);

        match &self.answer {
            RemoteAnswer::Translate => {
                if let Some(text) = &request.text_to_translate {
                    // Inline answers arrive quoted, with escaped newlines
                    let payload = format!("\"{}\"", self.translate_joint(text).replace('\n', "\\n"));
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = ingress.on_translation_callback(Some(&reference), Some(&payload), None).await;
                    });
                } else if let Some(document) = &request.document_to_translate_base64 {
                    let joint = String::from_utf8(STANDARD.decode(&document.content).unwrap()).unwrap();
                    let body = STANDARD.encode(self.translate_joint(&joint).as_bytes());
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = ingress.on_translation_callback(Some(&reference), None, Some(&body)).await;
                    });
                }
            }
            RemoteAnswer::Fail { code, message } => {
                let (code, message) = (code.clone(), message.clone());
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = ingress
                        .on_error_callback(Some(&reference), Some(&code), Some(&message))
                        .await;
                });
            }
            RemoteAnswer::Silent => {}
        }

        Ok(self.submitted.lock().len() as i64)
    }
}

/// Bridge over a simulated remote; keep a clone of the remote for assertions
pub fn simulated_bridge(
    store: Arc<dyn CorrelationStore>,
    remote: SimulatedRemote,
    settings: BridgeSettings,
) -> AsyncCorrelationBridge<SimulatedRemote> {
    AsyncCorrelationBridge::new("etranslation", settings, remote, store).unwrap()
}

/// Store whose every operation fails, to exercise degraded paths
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl CorrelationStore for UnavailableStore {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn subscribe(&self, _channel: &str) -> Result<Subscription, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn publish(&self, _channel: &str, _message: &str) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
