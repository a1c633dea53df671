use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::bridge::{BridgeSettings, DEFAULT_SNIPPET_LIMIT};
use crate::language_utils::validate_language_code;

/// Gateway configuration: store, services, routing and pre-processing.
/// Loaded from a JSON file, written with defaults when missing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Correlation store shared by the cache and the eTranslation bridge
    #[serde(default)]
    pub store: StoreConfig,

    /// Translation services and routing
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Language detection services
    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Correlation store backend
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process store, for a single gateway instance
    #[default]
    Memory,
    /// Redis server shared by all gateway instances.
    /// Entries never expire unless the server is configured with an eviction policy.
    Redis { url: String },
}

/// Backend type of a configured service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceKind {
    /// Google Cloud Translation v3
    Google {
        project_id: String,
        #[serde(default)]
        access_token: String,
        #[serde(default)]
        endpoint: String,
    },
    /// Pangeanic scored translation / detection
    Pangeanic {
        endpoint: String,
        /// Detection endpoint used when a translation request has no source language
        #[serde(default)]
        detect_endpoint: Option<String>,
        /// Minimum translation score per source language
        #[serde(default)]
        thresholds: HashMap<String, f64>,
    },
    /// Asynchronous eTranslation, bridged through the correlation store
    Etranslation {
        base_url: String,
        domain: String,
        callback_base_url: String,
        max_wait_ms: u64,
        username: String,
        password: String,
        #[serde(default = "default_snippet_limit")]
        snippet_limit: usize,
    },
    /// Local stop-word detector
    Heuristic {
        #[serde(default)]
        min_confidence: Option<f64>,
    },
    /// Local detector for short texts, Google for long ones
    Hybrid {
        project_id: String,
        #[serde(default)]
        access_token: String,
        #[serde(default)]
        endpoint: String,
        #[serde(default)]
        min_remote_length: Option<usize>,
    },
    /// Echo backend for testing deployments
    Dummy,
}

impl ServiceKind {
    /// Lowercase type name, as written in the configuration
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Google { .. } => "google",
            Self::Pangeanic { .. } => "pangeanic",
            Self::Etranslation { .. } => "etranslation",
            Self::Heuristic { .. } => "heuristic",
            Self::Hybrid { .. } => "hybrid",
            Self::Dummy => "dummy",
        }
    }

    pub fn can_translate(&self) -> bool {
        matches!(
            self,
            Self::Google { .. } | Self::Pangeanic { .. } | Self::Etranslation { .. } | Self::Dummy
        )
    }

    pub fn can_detect(&self) -> bool {
        matches!(
            self,
            Self::Google { .. } | Self::Pangeanic { .. } | Self::Heuristic { .. } | Self::Hybrid { .. } | Self::Dummy
        )
    }

    /// Bridge settings of an eTranslation service
    pub fn bridge_settings(&self) -> Option<BridgeSettings> {
        match self {
            Self::Etranslation {
                base_url,
                domain,
                callback_base_url,
                max_wait_ms,
                username,
                password,
                snippet_limit,
            } => Some(BridgeSettings {
                base_url: base_url.clone(),
                domain: domain.clone(),
                callback_base_url: callback_base_url.clone(),
                max_wait_ms: *max_wait_ms,
                username: username.clone(),
                password: password.clone(),
                snippet_limit: *snippet_limit,
            }),
            _ => None,
        }
    }

    fn urls(&self) -> Vec<&str> {
        match self {
            Self::Google { endpoint, .. } | Self::Hybrid { endpoint, .. } => vec![endpoint.as_str()],
            Self::Pangeanic {
                endpoint,
                detect_endpoint,
                ..
            } => {
                let mut urls = vec![endpoint.as_str()];
                urls.extend(detect_endpoint.as_deref());
                urls
            }
            Self::Etranslation {
                base_url,
                callback_base_url,
                ..
            } => vec![base_url.as_str(), callback_base_url.as_str()],
            Self::Heuristic { .. } | Self::Dummy => Vec::new(),
        }
    }
}

/// Language pairs a service accepts. An empty list accepts any language.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LanguageRule {
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub target: Vec<String>,
}

impl LanguageRule {
    pub fn matches(&self, source: Option<&str>, target: &str) -> bool {
        let source_ok = match source {
            Some(source) => self.source.is_empty() || self.source.iter().any(|lang| lang == source),
            None => true,
        };
        source_ok && (self.target.is_empty() || self.target.iter().any(|lang| lang == target))
    }
}

/// One configured service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Service id used in requests
    pub id: String,

    #[serde(flatten)]
    pub kind: ServiceKind,

    /// Optional language restrictions on top of what the backend supports
    #[serde(default)]
    pub supported: Vec<LanguageRule>,
}

impl ServiceConfig {
    pub fn new(id: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            supported: Vec::new(),
        }
    }

    /// Whether the configured rules allow the pair
    pub fn allows(&self, source: Option<&str>, target: &str) -> bool {
        self.supported.is_empty() || self.supported.iter().any(|rule| rule.matches(source, target))
    }
}

/// Service used for a language pair when the request names none
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LanguageMapping {
    pub source: String,
    pub target: String,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Service used when neither the request nor a mapping selects one
    pub default_service: String,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    pub language_mappings: Vec<LanguageMapping>,

    /// Skip texts without at least two consecutive letters
    #[serde(default = "default_true")]
    pub preprocess: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            default_service: "dummy".to_string(),
            services: vec![ServiceConfig::new("dummy", ServiceKind::Dummy)],
            language_mappings: Vec::new(),
            preprocess: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetectionConfig {
    pub default_service: String,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default = "default_true")]
    pub preprocess: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            default_service: "heuristic".to_string(),
            services: vec![ServiceConfig::new(
                "heuristic",
                ServiceKind::Heuristic { min_confidence: None },
            )],
            preprocess: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_snippet_limit() -> usize {
    DEFAULT_SNIPPET_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LogLevel::default(),
            store: StoreConfig::default(),
            translation: TranslationConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration file, writing a default one when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", path.display()))
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            let config_json =
                serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
            std::fs::write(path, config_json)
                .context(format!("Failed to write default config to file: {}", path.display()))?;
            Ok(config)
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if let StoreConfig::Redis { url } = &self.store {
            url::Url::parse(url).context(format!("Invalid Redis url: {}", url))?;
        }

        validate_services("translation", &self.translation.services, ServiceKind::can_translate)?;
        validate_services("detection", &self.detection.services, ServiceKind::can_detect)?;

        let translation_ids: HashSet<&str> = self.translation.services.iter().map(|s| s.id.as_str()).collect();
        if !translation_ids.contains(self.translation.default_service.as_str()) {
            return Err(anyhow!(
                "Default translation service '{}' is not configured",
                self.translation.default_service
            ));
        }
        if !self
            .detection
            .services
            .iter()
            .any(|service| service.id == self.detection.default_service)
        {
            return Err(anyhow!(
                "Default detection service '{}' is not configured",
                self.detection.default_service
            ));
        }

        for mapping in &self.translation.language_mappings {
            validate_language_code(&mapping.source)?;
            validate_language_code(&mapping.target)?;
            if !translation_ids.contains(mapping.service.as_str()) {
                return Err(anyhow!(
                    "Language mapping {}-{} refers to unknown service '{}'",
                    mapping.source,
                    mapping.target,
                    mapping.service
                ));
            }
        }

        Ok(())
    }
}

fn validate_services(section: &str, services: &[ServiceConfig], capable: fn(&ServiceKind) -> bool) -> Result<()> {
    let mut seen = HashSet::new();
    for service in services {
        if service.id.trim().is_empty() {
            return Err(anyhow!("A {} service has an empty id", section));
        }
        if !seen.insert(service.id.as_str()) {
            return Err(anyhow!("Duplicate {} service id '{}'", section, service.id));
        }
        if !capable(&service.kind) {
            return Err(anyhow!(
                "Service '{}' of type {} cannot be used for {}",
                service.id,
                service.kind.type_name(),
                section
            ));
        }

        for url in service.kind.urls().into_iter().filter(|url| !url.is_empty()) {
            url::Url::parse(url).context(format!("Invalid url for service '{}': {}", service.id, url))?;
        }
        if let Some(settings) = service.kind.bridge_settings() {
            settings
                .validate()
                .map_err(|e| anyhow!("Service '{}': {}", service.id, e))?;
        }
        if let ServiceKind::Pangeanic { thresholds, .. } = &service.kind {
            for lang in thresholds.keys() {
                validate_language_code(lang)?;
            }
        }
        for rule in &service.supported {
            for lang in rule.source.iter().chain(&rule.target) {
                validate_language_code(lang)?;
            }
        }
    }
    Ok(())
}
