/*!
 * End-to-end tests of the asynchronous eTranslation bridge
 *
 * The remote service is simulated: it answers through the webhook ingress,
 * which publishes on the correlation store the bridge is waiting on.
 */

use std::sync::Arc;

use babelgate::bridge::{CallbackIngress, PayloadShape};
use babelgate::errors::TranslationError;
use babelgate::providers::TranslationBackend;
use babelgate::providers::mock::{MockBackend, MockDetector};
use babelgate::registry::ServiceRegistry;
use babelgate::store::{CorrelationStore, InMemoryStore};
use babelgate::translation::cache::generate_key;
use babelgate::translation::router::{RouteRequest, ServiceRouter};
use babelgate::translation::unit::TranslationUnit;
use babelgate::translation::{TranslateRequest, TranslationGateway};

use crate::common::{RemoteAnswer, SimulatedRemote, bridge_settings, init_logging, simulated_bridge, texts};

const DOG: &str = "Das ist mein Hund.";
const TREE: &str = "Das ist mein Baum.";

fn gateway(store: &Arc<InMemoryStore>, remote: &SimulatedRemote, max_wait_ms: u64) -> TranslationGateway {
    let store: Arc<dyn CorrelationStore> = store.clone();
    let bridge = simulated_bridge(store.clone(), remote.clone(), bridge_settings(max_wait_ms));
    let registry = ServiceRegistry::new("etranslation", "dummy")
        .register_translator(Arc::new(bridge))
        .register_translator(Arc::new(MockBackend::working().with_id("dummy")))
        .register_detector(Arc::new(MockDetector::dummy("dummy")));
    TranslationGateway::new(Arc::new(ServiceRouter::new(Arc::new(registry), Some(store))))
}

fn german(store: &Arc<InMemoryStore>, delay_ms: u64) -> SimulatedRemote {
    SimulatedRemote::german(store.clone(), delay_ms)
}

#[tokio::test]
async fn test_translate_withInlineCallback_shouldCorrelateByExternalReference() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = german(&store, 20);
    let gateway = gateway(&store, &remote, 5_000);

    let request = TranslateRequest::new(texts(&[DOG, TREE]), "en").with_source("de");
    let response = gateway.translate(&request).await.unwrap();

    assert_eq!(
        response.translations,
        vec![Some("That is my dog.".to_string()), Some("That is my tree.".to_string())]
    );
    assert_eq!(response.service.as_deref(), Some("etranslation"));
    assert_eq!(response.lang.as_deref(), Some("de"));

    let submitted = remote.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].external_reference, "et:deenre7d+w");
    assert_eq!(submitted[0].source_language, "DE");
    assert_eq!(submitted[0].target_languages, vec!["EN".to_string()]);
    assert!(submitted[0].document_to_translate_base64.is_none());
    assert_eq!(store.subscriber_count("et:deenre7d+w"), 0);
}

#[tokio::test]
async fn test_translate_withLongJointText_shouldUseDocumentShape() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = german(&store, 20);
    let mut settings = bridge_settings(5_000);
    settings.snippet_limit = 10;
    let bridge = simulated_bridge(store.clone(), remote.clone(), settings);

    let mut units = TranslationUnit::batch(&texts(&[DOG, TREE]), Some("de"), "en");
    bridge.translate(&mut units).await.unwrap();

    assert_eq!(units[0].translation(), Some("That is my dog."));
    assert_eq!(units[1].translation(), Some("That is my tree."));

    let submitted = remote.submitted();
    assert!(submitted[0].text_to_translate.is_none());
    let document = submitted[0].document_to_translate_base64.as_ref().unwrap();
    assert_eq!(document.format, "txt");
    assert!(submitted[0].destinations.is_some());
    assert_eq!(PayloadShape::for_text(DOG, 10), PayloadShape::Document);
}

#[tokio::test]
async fn test_translate_withErrorCallback_shouldFailWithRemoteProcessingError() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = SimulatedRemote::new(
        store.clone(),
        RemoteAnswer::Fail {
            code: "-20001".to_string(),
            message: "Invalid source language".to_string(),
        },
        10,
    );
    let gateway = gateway(&store, &remote, 5_000);

    let request = TranslateRequest::new(texts(&[DOG]), "en").with_source("de");
    match gateway.translate(&request).await {
        Err(TranslationError::RemoteProcessingError(message)) => {
            assert!(message.contains("error-code=-20001"));
            assert!(message.contains("Invalid source language"));
        }
        other => panic!("Expected a remote processing error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_translate_withErrorCallbackAndFallback_shouldUseFallback() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = SimulatedRemote::new(
        store.clone(),
        RemoteAnswer::Fail {
            code: "-20001".to_string(),
            message: "Invalid source language".to_string(),
        },
        10,
    );
    let gateway = gateway(&store, &remote, 5_000);

    let request = TranslateRequest::new(texts(&[DOG]), "en")
        .with_source("de")
        .with_fallback("dummy");
    let response = gateway.translate(&request).await.unwrap();

    assert_eq!(response.service.as_deref(), Some("dummy"));
    assert_eq!(response.translations[0].as_deref(), Some("[TRANSLATED to en] Das ist mein Hund."));
    assert_eq!(remote.submitted().len(), 1);
}

#[tokio::test]
async fn test_translate_withSilentRemote_shouldTimeOutAndReleaseSubscription() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = SimulatedRemote::new(store.clone(), RemoteAnswer::Silent, 0);
    let gateway = gateway(&store, &remote, 100);

    let request = TranslateRequest::new(texts(&[DOG]), "en").with_source("de");
    let error = gateway.translate(&request).await.unwrap_err();

    assert!(matches!(error, TranslationError::GatewayTimeout { waited_ms: 100 }));
    assert_eq!(error.status_code(), 504);

    let reference = generate_key(DOG, "de", "en", "et:");
    assert_eq!(reference, "et:deenTFBjCA");
    assert_eq!(store.subscriber_count(&reference), 0);

    // a late callback finds nobody waiting
    let ingress = CallbackIngress::new(store.clone());
    let delivered = ingress
        .on_translation_callback(Some(&reference), Some("\"That is my dog.\""), None)
        .await
        .unwrap();
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_translate_withConcurrentBatches_shouldNotMixResults() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = german(&store, 50);
    let gateway = gateway(&store, &remote, 5_000);

    let dog = TranslateRequest::new(texts(&[DOG]), "en").with_source("de");
    let tree = TranslateRequest::new(texts(&[TREE]), "en").with_source("de");
    let morning = TranslateRequest::new(texts(&["Guten Morgen"]), "en").with_source("de");

    let (dog, tree, morning) = tokio::join!(
        gateway.translate(&dog),
        gateway.translate(&tree),
        gateway.translate(&morning)
    );

    assert_eq!(dog.unwrap().translations[0].as_deref(), Some("That is my dog."));
    assert_eq!(tree.unwrap().translations[0].as_deref(), Some("That is my tree."));
    assert_eq!(morning.unwrap().translations[0].as_deref(), Some("Good morning"));
    assert_eq!(remote.submitted().len(), 3);
}

#[tokio::test]
async fn test_translate_withRepeatedRequest_shouldServeFromCache() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = german(&store, 10);
    let gateway = gateway(&store, &remote, 5_000);

    let request = TranslateRequest::new(texts(&[DOG, TREE]), "en").with_source("de");
    let first = gateway.translate(&request).await.unwrap();
    let second = gateway.translate(&request).await.unwrap();

    assert_eq!(first.translations, second.translations);
    assert_eq!(remote.submitted().len(), 1);
    assert_eq!(
        store.get(&generate_key(DOG, "de", "en", "")).await.unwrap().as_deref(),
        Some("That is my dog.")
    );

    let (hits, misses, _) = gateway.router().cache_stats().snapshot();
    assert_eq!((hits, misses), (2, 2));
}

#[tokio::test]
async fn test_execute_withMixedSources_shouldSubmitOnePerLanguage() {
    init_logging();
    let store = Arc::new(InMemoryStore::new());
    let remote = german(&store, 10).with_translation("Bonjour", "Hello");
    let shared: Arc<dyn CorrelationStore> = store.clone();
    let bridge = simulated_bridge(shared, remote.clone(), bridge_settings(5_000));
    let router = ServiceRouter::new(
        Arc::new(ServiceRegistry::new("etranslation", "dummy").register_translator(Arc::new(bridge))),
        None,
    );

    let mut units = vec![
        TranslationUnit::new(DOG, Some("de"), "en"),
        TranslationUnit::new("Bonjour", Some("fr"), "en"),
        TranslationUnit::new(TREE, Some("de"), "en"),
    ];
    let candidates = router
        .route(&RouteRequest {
            source: Some("de"),
            target: "en",
            service: None,
            fallback: None,
            caching: false,
        })
        .unwrap();
    let service = router.execute(&candidates, &mut units).await.unwrap();

    assert_eq!(service.as_deref(), Some("etranslation"));
    assert_eq!(units[0].translation(), Some("That is my dog."));
    assert_eq!(units[1].translation(), Some("Hello"));
    assert_eq!(units[2].translation(), Some("That is my tree."));

    let mut languages: Vec<String> = remote
        .submitted()
        .into_iter()
        .map(|request| request.source_language)
        .collect();
    languages.sort();
    assert_eq!(languages, vec!["DE".to_string(), "FR".to_string()]);
}
