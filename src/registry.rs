/*!
 * Service registry: every configured backend, keyed by service id.
 *
 * The registry is built once at startup, either from the configuration
 * (`ServiceRegistry::from_config`) or programmatically, and is read-only
 * afterwards. It also holds the language-pair mappings and the default
 * service ids of both operations.
 */

use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::app_config::{Config, LanguageRule, ServiceConfig, ServiceKind};
use crate::bridge::AsyncCorrelationBridge;
use crate::errors::AppError;
use crate::providers::google::{GoogleClient, GoogleDetector, GoogleTranslator};
use crate::providers::heuristic::HeuristicDetector;
use crate::providers::hybrid::{DEFAULT_MIN_REMOTE_LENGTH, HybridDetector};
use crate::providers::mock::{MockBackend, MockDetector};
use crate::providers::pangeanic::{PangeanicDetector, PangeanicTranslator};
use crate::providers::{LanguageDetector, TranslationBackend};
use crate::store::CorrelationStore;
use crate::translation::unit::LanguagePair;

/// A registered service and the language rules configured for it
pub struct ServiceDescriptor<C: ?Sized> {
    pub id: String,
    pub type_name: &'static str,
    /// Configured restrictions; empty accepts whatever the capability accepts
    pub rules: Vec<LanguageRule>,
    pub capability: Arc<C>,
}

impl<C: ?Sized> Clone for ServiceDescriptor<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            type_name: self.type_name,
            rules: self.rules.clone(),
            capability: Arc::clone(&self.capability),
        }
    }
}

impl<C: ?Sized> fmt::Debug for ServiceDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("rules", &self.rules)
            .finish()
    }
}

impl<C: ?Sized> ServiceDescriptor<C> {
    fn rules_allow(&self, source: Option<&str>, target: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|rule| rule.matches(source, target))
    }
}

impl ServiceDescriptor<dyn TranslationBackend> {
    /// Whether the service accepts the pair, by configuration and by capability
    pub fn supports(&self, source: Option<&str>, target: &str) -> bool {
        self.rules_allow(source, target) && self.capability.is_supported(source, target)
    }
}

impl ServiceDescriptor<dyn LanguageDetector> {
    /// Whether the detector can report `lang`
    pub fn supports(&self, lang: &str) -> bool {
        let allowed = self.rules.is_empty()
            || self
                .rules
                .iter()
                .any(|rule| rule.source.is_empty() || rule.source.iter().any(|source| source == lang));
        allowed && self.capability.is_supported(lang)
    }
}

pub type TranslatorDescriptor = ServiceDescriptor<dyn TranslationBackend>;
pub type DetectorDescriptor = ServiceDescriptor<dyn LanguageDetector>;

/// Id-keyed registry of translation and detection services
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    translators: HashMap<String, TranslatorDescriptor>,
    detectors: HashMap<String, DetectorDescriptor>,
    /// `"src-tgt"` -> translation service id
    language_mappings: HashMap<String, String>,
    default_translation: String,
    default_detection: String,
}

impl ServiceRegistry {
    /// Create an empty registry with the given default service ids
    pub fn new(default_translation: impl Into<String>, default_detection: impl Into<String>) -> Self {
        Self {
            translators: HashMap::new(),
            detectors: HashMap::new(),
            language_mappings: HashMap::new(),
            default_translation: default_translation.into(),
            default_detection: default_detection.into(),
        }
    }

    /// Register a translation backend under its own id
    pub fn register_translator(self, capability: Arc<dyn TranslationBackend>) -> Self {
        self.register_translator_with_rules(capability, Vec::new())
    }

    pub fn register_translator_with_rules(
        mut self,
        capability: Arc<dyn TranslationBackend>,
        rules: Vec<LanguageRule>,
    ) -> Self {
        let id = capability.id().to_string();
        self.translators.insert(
            id.clone(),
            ServiceDescriptor {
                id,
                type_name: "custom",
                rules,
                capability,
            },
        );
        self
    }

    /// Register a language detector under its own id
    pub fn register_detector(mut self, capability: Arc<dyn LanguageDetector>) -> Self {
        let id = capability.id().to_string();
        self.detectors.insert(
            id.clone(),
            ServiceDescriptor {
                id,
                type_name: "custom",
                rules: Vec::new(),
                capability,
            },
        );
        self
    }

    /// Route `source -> target` to `service` when a request names no service
    pub fn add_mapping(mut self, source: &str, target: &str, service: impl Into<String>) -> Self {
        self.language_mappings
            .insert(LanguagePair::key(source, target), service.into());
        self
    }

    /// Build every configured service
    ///
    /// # Arguments
    /// * `config` - Validated application configuration
    /// * `store` - Correlation store shared with the eTranslation bridge
    pub fn from_config(config: &Config, store: Arc<dyn CorrelationStore>) -> Result<Self, AppError> {
        let mut registry = Self::new(
            config.translation.default_service.clone(),
            config.detection.default_service.clone(),
        );

        for service in &config.translation.services {
            let capability = build_translator(service, &store)?;
            debug!("Registered translation service {} ({})", service.id, service.kind.type_name());
            registry.translators.insert(
                service.id.clone(),
                ServiceDescriptor {
                    id: service.id.clone(),
                    type_name: service.kind.type_name(),
                    rules: service.supported.clone(),
                    capability,
                },
            );
        }

        for service in &config.detection.services {
            let capability = build_detector(service)?;
            debug!("Registered detection service {} ({})", service.id, service.kind.type_name());
            registry.detectors.insert(
                service.id.clone(),
                ServiceDescriptor {
                    id: service.id.clone(),
                    type_name: service.kind.type_name(),
                    rules: service.supported.clone(),
                    capability,
                },
            );
        }

        for mapping in &config.translation.language_mappings {
            registry = registry.add_mapping(&mapping.source, &mapping.target, mapping.service.clone());
        }

        info!(
            "Service registry ready: {} translation services, {} detection services, {} language mappings",
            registry.translators.len(),
            registry.detectors.len(),
            registry.language_mappings.len()
        );
        Ok(registry)
    }

    pub fn translator(&self, id: &str) -> Option<&TranslatorDescriptor> {
        self.translators.get(id)
    }

    pub fn detector(&self, id: &str) -> Option<&DetectorDescriptor> {
        self.detectors.get(id)
    }

    /// Service id mapped to the language pair, if any
    pub fn mapped_translator(&self, source: &str, target: &str) -> Option<&str> {
        self.language_mappings
            .get(&LanguagePair::key(source, target))
            .map(String::as_str)
    }

    pub fn default_translation(&self) -> &str {
        &self.default_translation
    }

    pub fn default_detection(&self) -> &str {
        &self.default_detection
    }

    /// Registered translation service ids, sorted
    pub fn translator_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.translators.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Registered detection service ids, sorted
    pub fn detector_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.detectors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

fn build_translator(
    service: &ServiceConfig,
    store: &Arc<dyn CorrelationStore>,
) -> Result<Arc<dyn TranslationBackend>, AppError> {
    let id = service.id.as_str();
    let capability: Arc<dyn TranslationBackend> = match &service.kind {
        ServiceKind::Google {
            project_id,
            access_token,
            endpoint,
        } => {
            let client = Arc::new(GoogleClient::new(endpoint, project_id, access_token));
            Arc::new(GoogleTranslator::new(id, client))
        }
        ServiceKind::Pangeanic {
            endpoint,
            detect_endpoint,
            thresholds,
        } => {
            let detector = detect_endpoint.as_ref().map(|detect_endpoint| {
                Arc::new(PangeanicDetector::new(format!("{}-detect", id), detect_endpoint)) as Arc<dyn LanguageDetector>
            });
            Arc::new(PangeanicTranslator::new(id, endpoint, thresholds.clone(), detector))
        }
        ServiceKind::Etranslation { .. } => {
            let settings = service
                .kind
                .bridge_settings()
                .ok_or_else(|| AppError::Config(format!("Service '{}' has no bridge settings", id)))?;
            Arc::new(AsyncCorrelationBridge::connect(id, settings, Arc::clone(store))?)
        }
        ServiceKind::Dummy => Arc::new(
            MockBackend::working()
                .with_id(id)
                .with_custom_response(|unit| unit.text.clone()),
        ),
        ServiceKind::Heuristic { .. } | ServiceKind::Hybrid { .. } => {
            return Err(AppError::Config(format!(
                "Service '{}' of type {} cannot translate",
                id,
                service.kind.type_name()
            )));
        }
    };
    Ok(capability)
}

fn build_detector(service: &ServiceConfig) -> Result<Arc<dyn LanguageDetector>, AppError> {
    let id = service.id.as_str();
    let capability: Arc<dyn LanguageDetector> = match &service.kind {
        ServiceKind::Google {
            project_id,
            access_token,
            endpoint,
        } => {
            let client = Arc::new(GoogleClient::new(endpoint, project_id, access_token));
            Arc::new(GoogleDetector::new(id, client))
        }
        ServiceKind::Pangeanic { endpoint, .. } => Arc::new(PangeanicDetector::new(id, endpoint)),
        ServiceKind::Heuristic { min_confidence } => {
            let detector = HeuristicDetector::new(id);
            match min_confidence {
                Some(min_confidence) => Arc::new(detector.with_min_confidence(*min_confidence)),
                None => Arc::new(detector),
            }
        }
        ServiceKind::Hybrid {
            project_id,
            access_token,
            endpoint,
            min_remote_length,
        } => {
            let client = Arc::new(GoogleClient::new(endpoint, project_id, access_token));
            let local = Arc::new(HeuristicDetector::new(format!("{}-local", id)));
            let remote = Arc::new(GoogleDetector::new(format!("{}-remote", id), client));
            Arc::new(
                HybridDetector::new(id, local, remote)
                    .with_min_remote_length(min_remote_length.unwrap_or(DEFAULT_MIN_REMOTE_LENGTH)),
            )
        }
        ServiceKind::Dummy => Arc::new(MockDetector::dummy(id)),
        ServiceKind::Etranslation { .. } => {
            return Err(AppError::Config(format!("Service '{}' of type etranslation cannot detect", id)));
        }
    };
    Ok(capability)
}
