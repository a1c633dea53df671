use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use crate::app_config::{Config, StoreConfig};
use crate::bridge::CallbackIngress;
use crate::registry::ServiceRegistry;
use crate::store::{CorrelationStore, InMemoryStore, RedisStore};
use crate::translation::{
    DetectRequest, DetectResponse, ServiceRouter, TranslateRequest, TranslateResponse, TranslationGateway,
};

/// Application controller for the translation gateway
///
/// Owns the shared correlation store and wires the registry, router, gateway
/// and webhook ingress on top of it. One controller serves every request.
pub struct Controller {
    config: Config,
    store: Arc<dyn CorrelationStore>,
    gateway: TranslationGateway,
    ingress: CallbackIngress,
}

impl Controller {
    /// Create a controller with an in-memory store, for tests
    pub fn new_for_test() -> Result<Self> {
        Self::with_store(Config::default(), Arc::new(InMemoryStore::new()))
    }

    /// Validate the configuration, open the configured store and build every service
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let store = open_store(&config.store).await?;
        Self::with_store(config, store)
    }

    /// Build every service on top of an existing store
    pub fn with_store(config: Config, store: Arc<dyn CorrelationStore>) -> Result<Self> {
        let registry = ServiceRegistry::from_config(&config, Arc::clone(&store))
            .context("Failed to build the service registry")?;
        let router = ServiceRouter::new(Arc::new(registry), Some(Arc::clone(&store)));
        let gateway = TranslationGateway::new(Arc::new(router))
            .with_preprocessing(config.translation.preprocess, config.detection.preprocess);
        let ingress = CallbackIngress::new(Arc::clone(&store));

        debug!("Controller ready with {} store", store.name());
        Ok(Self {
            config,
            store,
            gateway,
            ingress,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn CorrelationStore> {
        Arc::clone(&self.store)
    }

    pub fn gateway(&self) -> &TranslationGateway {
        &self.gateway
    }

    /// Webhook ingress publishing eTranslation callbacks
    pub fn ingress(&self) -> &CallbackIngress {
        &self.ingress
    }

    pub async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse> {
        Ok(self.gateway.translate(request).await?)
    }

    pub async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse> {
        Ok(self.gateway.detect(request).await?)
    }

    /// Remove every cached translation from the store
    pub async fn clear_cache(&self) -> Result<()> {
        self.gateway
            .router()
            .clear_cache()
            .await
            .context("Failed to clear the translation cache")?;
        info!("Cache cleared on {} store", self.store.name());
        Ok(())
    }
}

/// Open the configured correlation store
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CorrelationStore>> {
    let store: Arc<dyn CorrelationStore> = match config {
        StoreConfig::Memory => Arc::new(InMemoryStore::new()),
        StoreConfig::Redis { url } => Arc::new(
            RedisStore::connect(url)
                .await
                .context("Failed to connect to the Redis store")?,
        ),
    };
    info!("Using {} correlation store", store.name());
    Ok(store)
}
