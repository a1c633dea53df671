/*!
 * Tests for gateway request handling
 */

use std::sync::Arc;

use babelgate::errors::TranslationError;
use babelgate::providers::mock::{MockBackend, MockDetector};
use babelgate::registry::ServiceRegistry;
use babelgate::store::{CorrelationStore, InMemoryStore};
use babelgate::translation::{DetectRequest, ServiceRouter, TranslateRequest, TranslationGateway};

use crate::common::texts;

fn gateway_with(backend: MockBackend, store: Option<Arc<dyn CorrelationStore>>) -> TranslationGateway {
    let registry = ServiceRegistry::new("mock", "detector")
        .register_translator(Arc::new(backend))
        .register_detector(Arc::new(MockDetector::answering("detector", Some("en")).with_supported(&["en", "de"])))
        .register_detector(Arc::new(MockDetector::failing("broken")));
    TranslationGateway::new(Arc::new(ServiceRouter::new(Arc::new(registry), store)))
}

fn assert_invalid_param(result: Result<impl std::fmt::Debug, TranslationError>, expected: &str) {
    match result {
        Err(error @ TranslationError::ParameterValidation { .. }) => {
            assert!(error.is_client_error());
            assert_eq!(error.status_code(), 400);
            if let TranslationError::ParameterValidation { param, .. } = error {
                assert_eq!(param, expected);
            }
        }
        other => panic!("Expected a validation error on {}, got {:?}", expected, other),
    }
}

#[tokio::test]
async fn test_translate_withMissingTarget_shouldFailValidation() {
    let gateway = gateway_with(MockBackend::working(), None);
    let request = TranslateRequest {
        target: None,
        ..TranslateRequest::new(texts(&["Hallo"]), "en")
    };

    assert_invalid_param(gateway.translate(&request).await, "target");
}

#[tokio::test]
async fn test_translate_withEmptyTexts_shouldFailValidation() {
    let gateway = gateway_with(MockBackend::working(), None);
    let request = TranslateRequest::new(Vec::new(), "en");

    assert_invalid_param(gateway.translate(&request).await, "text");
}

#[tokio::test]
async fn test_translate_withUnknownFallback_shouldFailBeforeTranslating() {
    let backend = MockBackend::working();
    let gateway = gateway_with(backend.clone(), None);
    let request = TranslateRequest::new(texts(&["Hallo"]), "en").with_fallback("nowhere");

    let error = gateway.translate(&request).await.unwrap_err();
    assert!(matches!(error, TranslationError::UnknownService { ref param, .. } if param == "fallback"));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_translate_shouldKeepInputOrderAndLength() {
    let gateway = gateway_with(MockBackend::partial(2), None);
    let request = TranslateRequest::new(texts(&["eins", "zwei", "drei"]), "en").with_source("de");

    let response = gateway.translate(&request).await.unwrap();

    assert_eq!(response.translations.len(), 3);
    assert_eq!(response.translations[0].as_deref(), Some("[TRANSLATED to en] eins"));
    assert_eq!(response.translations[1], None);
    assert_eq!(response.translations[2].as_deref(), Some("[TRANSLATED to en] drei"));
}

#[tokio::test]
async fn test_translate_withOnlyIneligibleTexts_shouldNotCallBackend() {
    let backend = MockBackend::working();
    let gateway = gateway_with(backend.clone(), None);
    let request = TranslateRequest::new(texts(&["12", "-", "a"]), "en").with_source("de");

    let response = gateway.translate(&request).await.unwrap();

    assert_eq!(response.translations, vec![Some("12".to_string()), Some("-".to_string()), Some("a".to_string())]);
    assert_eq!(response.service, None);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withPreprocessingDisabled_shouldSendEveryText() {
    let backend = MockBackend::working();
    let gateway = gateway_with(backend.clone(), None).with_preprocessing(false, false);
    let request = TranslateRequest::new(texts(&["12"]), "en").with_source("de");

    gateway.translate(&request).await.unwrap();
    assert_eq!(backend.calls()[0].texts, texts(&["12"]));
}

#[tokio::test]
async fn test_translate_withCachingDisabled_shouldNotTouchStore() {
    let backend = MockBackend::working();
    let store = Arc::new(InMemoryStore::new());
    let gateway = gateway_with(backend.clone(), Some(store.clone() as Arc<dyn CorrelationStore>));
    let request = TranslateRequest::new(texts(&["Hallo Welt"]), "en")
        .with_source("de")
        .without_cache();

    gateway.translate(&request).await.unwrap();
    gateway.translate(&request).await.unwrap();

    assert!(store.is_empty());
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_detect_withUnsupportedHint_shouldFail() {
    let gateway = gateway_with(MockBackend::working(), None);
    let request = DetectRequest::new(texts(&["Hallo Welt"])).with_hint("fr");

    let error = gateway.detect(&request).await.unwrap_err();
    assert!(matches!(error, TranslationError::UnsupportedLanguage { ref lang, .. } if lang == "fr"));
}

#[tokio::test]
async fn test_detect_withInvalidHint_shouldFailValidation() {
    let gateway = gateway_with(MockBackend::working(), None);
    let request = DetectRequest::new(texts(&["Hallo Welt"])).with_hint("zz");

    assert_invalid_param(gateway.detect(&request).await, "lang");
}

#[tokio::test]
async fn test_detect_withFallback_shouldReportAnsweringService() {
    let gateway = gateway_with(MockBackend::working(), None);
    let request = DetectRequest::new(texts(&["Hello world", "42"]))
        .with_service("broken")
        .with_fallback("detector");

    let response = gateway.detect(&request).await.unwrap();
    assert_eq!(response.langs, vec![Some("en".to_string()), None]);
    assert_eq!(response.service, "detector");
}

#[tokio::test]
async fn test_detect_withOnlyIneligibleTexts_shouldReturnNulls() {
    let gateway = gateway_with(MockBackend::working(), None);
    let response = gateway.detect(&DetectRequest::new(texts(&["1", "?"]))).await.unwrap();

    assert_eq!(response.langs, vec![None, None]);
    assert_eq!(response.service, "detector");
}
