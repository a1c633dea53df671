/*!
 * Tests for routing, fallback and detection routing
 */

use std::sync::Arc;

use babelgate::errors::TranslationError;
use babelgate::providers::mock::{MockBackend, MockDetector};
use babelgate::registry::ServiceRegistry;
use babelgate::translation::router::{RouteRequest, ServiceRouter};
use babelgate::translation::unit::TranslationUnit;

use crate::common::texts;

fn route(source: Option<&'static str>, service: Option<&'static str>, fallback: Option<&'static str>) -> RouteRequest<'static> {
    RouteRequest {
        source,
        target: "en",
        service,
        fallback,
        caching: false,
    }
}

fn router(registry: ServiceRegistry) -> ServiceRouter {
    ServiceRouter::new(Arc::new(registry), None)
}

async fn run(router: &ServiceRouter, request: RouteRequest<'_>, units: &mut [TranslationUnit]) -> Result<Option<String>, TranslationError> {
    let candidates = router.route(&request)?;
    router.execute(&candidates, units).await
}

#[tokio::test]
async fn test_execute_withPartialPrimary_shouldSendOnlyUntranslatedToFallback() {
    let primary = MockBackend::partial(2).with_id("primary");
    let fallback = MockBackend::working().with_id("secondary");
    let router = router(
        ServiceRegistry::new("primary", "heuristic")
            .register_translator(Arc::new(primary.clone()))
            .register_translator(Arc::new(fallback.clone())),
    );

    let mut units = TranslationUnit::batch(&texts(&["eins", "zwei", "drei", "vier"]), Some("de"), "en");
    let service = run(&router, route(Some("de"), None, Some("secondary")), &mut units)
        .await
        .unwrap();

    assert_eq!(primary.calls()[0].texts.len(), 4);
    assert_eq!(fallback.calls()[0].texts, texts(&["zwei", "vier"]));
    assert!(units.iter().all(TranslationUnit::is_translated));
    // the last successful candidate is reported
    assert_eq!(service.as_deref(), Some("secondary"));
}

#[tokio::test]
async fn test_execute_withCompletePrimary_shouldSkipFallback() {
    let primary = MockBackend::working().with_id("primary");
    let fallback = MockBackend::working().with_id("secondary");
    let router = router(
        ServiceRegistry::new("primary", "heuristic")
            .register_translator(Arc::new(primary))
            .register_translator(Arc::new(fallback.clone())),
    );

    let mut units = TranslationUnit::batch(&texts(&["eins"]), Some("de"), "en");
    let service = run(&router, route(Some("de"), None, Some("secondary")), &mut units)
        .await
        .unwrap();

    assert_eq!(fallback.call_count(), 0);
    assert_eq!(service.as_deref(), Some("primary"));
}

#[tokio::test]
async fn test_execute_withFailingPrimary_shouldUseFallback() {
    let router = router(
        ServiceRegistry::new("primary", "heuristic")
            .register_translator(Arc::new(MockBackend::failing().with_id("primary")))
            .register_translator(Arc::new(MockBackend::working().with_id("secondary"))),
    );

    let mut units = TranslationUnit::batch(&texts(&["eins"]), Some("de"), "en");
    let service = run(&router, route(Some("de"), None, Some("secondary")), &mut units)
        .await
        .unwrap();

    assert_eq!(service.as_deref(), Some("secondary"));
    assert_eq!(units[0].translation(), Some("[TRANSLATED to en] eins"));
}

#[tokio::test]
async fn test_execute_withAllCandidatesFailing_shouldReturnFirstError() {
    let router = router(
        ServiceRegistry::new("primary", "heuristic")
            .register_translator(Arc::new(MockBackend::failing().with_id("primary")))
            .register_translator(Arc::new(MockBackend::failing().with_id("secondary"))),
    );

    let mut units = TranslationUnit::batch(&texts(&["eins"]), Some("de"), "en");
    let error = run(&router, route(Some("de"), None, Some("secondary")), &mut units)
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Simulated failure of primary"));
    assert!(!units[0].is_translated());
}

#[tokio::test]
async fn test_execute_withNothingTranslated_shouldReportNullTranslations() {
    let backend = MockBackend::partial(usize::MAX).with_id("lazy");
    let router = router(ServiceRegistry::new("lazy", "heuristic").register_translator(Arc::new(backend)));

    let mut units = TranslationUnit::batch(&texts(&["eins", "zwei"]), Some("de"), "en");
    let service = run(&router, route(Some("de"), None, None), &mut units).await.unwrap();

    // partial(usize::MAX) only translates the first unit of a call
    assert_eq!(service.as_deref(), Some("lazy"));
    assert!(units[0].is_translated());
    assert_eq!(units[1].translation(), None);
}

#[test]
fn test_route_withUnknownService_shouldListAvailableServices() {
    let router = router(
        ServiceRegistry::new("primary", "heuristic")
            .register_translator(Arc::new(MockBackend::working().with_id("primary")))
            .register_translator(Arc::new(MockBackend::working().with_id("another"))),
    );

    match router.route(&route(Some("de"), Some("missing"), None)) {
        Err(TranslationError::UnknownService {
            param,
            service_id,
            available,
        }) => {
            assert_eq!(param, "service");
            assert_eq!(service_id, "missing");
            assert_eq!(available, "another, primary");
        }
        other => panic!("Unexpected routing result: {:?}", other),
    }
}

#[test]
fn test_route_withUnsupportedPair_shouldNameLanguagePair() {
    let router = router(
        ServiceRegistry::new("primary", "heuristic")
            .register_translator(Arc::new(MockBackend::working().with_id("primary").with_supported_pair("de", "en"))),
    );

    match router.route(&route(Some("fr"), Some("primary"), None)) {
        Err(TranslationError::UnsupportedLanguagePair { param, pair }) => {
            assert_eq!(param, "source.target");
            assert_eq!(pair, "fr-en");
        }
        other => panic!("Unexpected routing result: {:?}", other),
    }
}

#[tokio::test]
async fn test_detect_withFailingPrimary_shouldUseFallback() {
    let primary = MockDetector::failing("primary");
    let fallback = MockDetector::answering("secondary", Some("de"));
    let router = router(
        ServiceRegistry::new("translator", "primary")
            .register_detector(Arc::new(primary.clone()))
            .register_detector(Arc::new(fallback.clone())),
    );

    let (langs, service) = router
        .detect(&texts(&["Das ist mein Hund."]), None, None, Some("secondary"))
        .await
        .unwrap();

    assert_eq!(langs, vec![Some("de".to_string())]);
    assert_eq!(service, "secondary");
    assert_eq!(primary.calls().len(), 1);
}

#[tokio::test]
async fn test_detect_withWorkingPrimary_shouldNotCallFallback() {
    let fallback = MockDetector::answering("secondary", Some("fr"));
    let router = router(
        ServiceRegistry::new("translator", "primary")
            .register_detector(Arc::new(MockDetector::answering("primary", None)))
            .register_detector(Arc::new(fallback.clone())),
    );

    // undetermined languages are a valid answer, not a failure
    let (langs, service) = router
        .detect(&texts(&["xyz"]), None, None, Some("secondary"))
        .await
        .unwrap();

    assert_eq!(langs, vec![None]);
    assert_eq!(service, "primary");
    assert!(fallback.calls().is_empty());
}

#[tokio::test]
async fn test_detect_withBothFailing_shouldReturnPrimaryError() {
    let router = router(
        ServiceRegistry::new("translator", "primary")
            .register_detector(Arc::new(MockDetector::failing("primary")))
            .register_detector(Arc::new(MockDetector::failing("secondary"))),
    );

    let error = router
        .detect(&texts(&["Hund"]), None, Some("primary"), Some("secondary"))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Simulated failure of primary"));
}
