/*!
 * Tests for configuration loading and validation
 */

use babelgate::app_config::{Config, LogLevel, ServiceKind, StoreConfig};
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"{
    "log_level": "debug",
    "store": {"type": "redis", "url": "redis://localhost:6379/0"},
    "translation": {
        "default_service": "google",
        "services": [
            {"id": "google", "type": "google", "project_id": "europeana-translate", "access_token": "token"},
            {
                "id": "pangeanic",
                "type": "pangeanic",
                "endpoint": "https://pangeanic.example/translate",
                "detect_endpoint": "https://pangeanic.example/detect",
                "thresholds": {"de": 0.4, "fr": 0.6}
            },
            {
                "id": "etranslation",
                "type": "etranslation",
                "base_url": "https://remote.example/translation/api",
                "domain": "GEN",
                "callback_base_url": "https://gateway.example",
                "max_wait_ms": 30000,
                "username": "gateway",
                "password": "secret",
                "supported": [{"source": ["de", "fr"], "target": ["en"]}]
            }
        ],
        "language_mappings": [{"source": "de", "target": "en", "service": "etranslation"}]
    },
    "detection": {
        "default_service": "hybrid",
        "services": [
            {"id": "hybrid", "type": "hybrid", "project_id": "europeana-translate", "min_remote_length": 60},
            {"id": "heuristic", "type": "heuristic", "min_confidence": 0.2}
        ],
        "preprocess": false
    }
}"#;

#[test]
fn test_config_withFullJson_shouldParseAndValidate() {
    let config: Config = serde_json::from_str(FULL_CONFIG).unwrap();
    config.validate().unwrap();

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(
        config.store,
        StoreConfig::Redis {
            url: "redis://localhost:6379/0".to_string()
        }
    );
    assert_eq!(config.translation.services.len(), 3);
    assert!(config.translation.preprocess);
    assert!(!config.detection.preprocess);

    match &config.translation.services[1].kind {
        ServiceKind::Pangeanic { thresholds, detect_endpoint, .. } => {
            assert_eq!(thresholds.get("fr"), Some(&0.6));
            assert!(detect_endpoint.is_some());
        }
        other => panic!("Unexpected service kind: {:?}", other),
    }
}

#[test]
fn test_config_withInvalidThresholdLanguage_shouldFailValidation() {
    let json = FULL_CONFIG.replace(r#""fr": 0.6"#, r#""xx": 0.6"#);
    let config: Config = serde_json::from_str(&json).unwrap();

    assert!(config.validate().is_err());
}

#[test]
fn test_config_withInvalidRedisUrl_shouldFailValidation() {
    let mut config = Config::default();
    config.store = StoreConfig::Redis {
        url: "not a url".to_string(),
    };

    assert!(config.validate().is_err());
}

#[test]
fn test_config_withUnknownType_shouldFailParsing() {
    let json = r#"{"translation": {"default_service": "x", "services": [{"id": "x", "type": "babelfish"}]}}"#;
    assert!(serde_json::from_str::<Config>(json).is_err());
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefault() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");

    let created = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(created, Config::default());

    let loaded = Config::load_or_create(&path).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn test_loadOrCreate_withBrokenFile_shouldFail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    let error = Config::load_or_create(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config file"));
}
