//! Application context (dependency wiring)

use std::sync::Arc;

use couchstat_core::{ClusterAdmin, CollectionOrchestrator, MetricRegistry};
use couchstat_domain::{Config, Result};
use couchstat_infra::CouchbaseClient;
use tokio::sync::Mutex;

/// Everything the server handlers and the lifecycle code share.
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// Registry rendered by `/metrics`
    pub registry: Arc<MetricRegistry>,
    /// Collection orchestrator; locked because start/stop and on-demand
    /// collection must not race
    pub orchestrator: Mutex<CollectionOrchestrator>,
}

impl AppContext {
    /// Wire the client, registry and orchestrator from configuration.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid base URL or bucket
    /// ignore pattern.
    pub fn new(config: Config) -> Result<Self> {
        let admin: Arc<dyn ClusterAdmin> = Arc::new(CouchbaseClient::new(&config.cluster)?);
        let registry = Arc::new(MetricRegistry::new());
        let orchestrator = CollectionOrchestrator::new(
            admin,
            Arc::clone(&registry),
            config.collection.clone(),
        )?;

        Ok(Self { config, registry, orchestrator: Mutex::new(orchestrator) })
    }
}
