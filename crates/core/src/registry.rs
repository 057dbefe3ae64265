//! Dynamic metric registry
//!
//! The set of statistic names is only known at run time, so instruments
//! are created lazily under a create-if-absent contract and evicted in
//! bulk between cycles. Identity is the derived gauge name; the first
//! registration wins the definition and later calls with the same name
//! return the existing instrument without validating help or labels.

use std::collections::HashMap;

use couchstat_domain::{CouchstatError, Result};
use parking_lot::RwLock;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub(crate) fn prom_err(err: prometheus::Error) -> CouchstatError {
    CouchstatError::Metrics(err.to_string())
}

/// Name-keyed gauge instruments shared by the sub-collectors.
///
/// Safe under concurrent use: the three collectors register disjoint
/// names, but registration and value writes may interleave freely.
pub struct MetricRegistry {
    registry: Registry,
    gauges: RwLock<HashMap<String, GaugeVec>>,
}

impl MetricRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { registry: Registry::new(), gauges: RwLock::new(HashMap::new()) }
    }

    /// Look up or create the gauge registered under `name`.
    ///
    /// Idempotent per name: a repeated call returns the existing
    /// instrument and ignores `help` and `label_names`.
    ///
    /// # Errors
    /// Returns [`CouchstatError::Metrics`] when the name or labels are
    /// rejected by the underlying metrics library.
    pub fn create_if_absent(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<GaugeVec> {
        if let Some(gauge) = self.gauges.read().get(name) {
            return Ok(gauge.clone());
        }

        let mut gauges = self.gauges.write();
        // Re-check under the write lock; another collector may have won.
        if let Some(gauge) = gauges.get(name) {
            return Ok(gauge.clone());
        }

        let gauge = GaugeVec::new(Opts::new(name, help), label_names).map_err(prom_err)?;
        self.registry.register(Box::new(gauge.clone())).map_err(prom_err)?;
        gauges.insert(name.to_string(), gauge.clone());
        Ok(gauge)
    }

    /// Look up a gauge without creating it.
    pub fn get(&self, name: &str) -> Option<GaugeVec> {
        self.gauges.read().get(name).cloned()
    }

    /// Whether a gauge is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.gauges.read().contains_key(name)
    }

    /// Number of registered instruments.
    pub fn len(&self) -> usize {
        self.gauges.read().len()
    }

    /// Whether the registry holds no instruments.
    pub fn is_empty(&self) -> bool {
        self.gauges.read().is_empty()
    }

    /// Remove every instrument. Subsequent renders are empty until the
    /// registry is repopulated.
    pub fn clear(&self) {
        let mut gauges = self.gauges.write();
        for (_, gauge) in gauges.drain() {
            // Unregistering a collector that is already gone is harmless.
            let _ = self.registry.unregister(Box::new(gauge));
        }
    }

    /// Render the current state in the text exposition format.
    ///
    /// # Errors
    /// Returns [`CouchstatError::Metrics`] when encoding fails.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer).map_err(prom_err)?;
        String::from_utf8(buffer)
            .map_err(|err| CouchstatError::Metrics(format!("exposition is not UTF-8: {err}")))
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
