//! Cross-datacenter replication (XDCR) status gauges

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use couchstat_domain::{CouchstatError, Result};
use tracing::debug;

use crate::ports::ClusterAdmin;
use crate::registry::{prom_err, MetricRegistry};

/// Collects the per-replication running indicator for one cycle.
pub struct ReplicationStatCollector {
    admin: Arc<dyn ClusterAdmin>,
    registry: Arc<MetricRegistry>,
}

impl ReplicationStatCollector {
    /// Create a collector for one cycle.
    pub fn new(admin: Arc<dyn ClusterAdmin>, registry: Arc<MetricRegistry>) -> Self {
        Self { admin, registry }
    }

    /// Record a running/not-running indicator per replication pairing.
    ///
    /// # Errors
    /// Propagates fetch failures. A task referencing a remote cluster
    /// the monitored system did not report fails the cycle with
    /// [`CouchstatError::NotFound`]; the cluster is assumed to always
    /// report referenced peers.
    pub async fn collect(&self) -> Result<Duration> {
        let start = Instant::now();

        let running = self.registry.create_if_absent(
            "couchbase_xdcr_running",
            "1 if xdcr is running, 0 if not.",
            &["source", "target", "cluster_name", "cluster_hostname"],
        )?;

        let (tasks, remote_clusters) =
            tokio::try_join!(self.admin.tasks(), self.admin.remote_clusters())?;

        let remotes: HashMap<&str, (&str, &str)> = remote_clusters
            .iter()
            .map(|remote| (remote.uuid.as_str(), (remote.name.as_str(), remote.hostname.as_str())))
            .collect();

        for task in &tasks {
            if task.task_type != "xdcr" {
                continue;
            }

            let target = task.target.rsplit('/').next().unwrap_or_default();
            let remote_id = task.id.split('/').next().unwrap_or_default();
            let Some(&(cluster_name, cluster_hostname)) = remotes.get(remote_id) else {
                return Err(CouchstatError::NotFound(format!(
                    "remote cluster {remote_id} not reported for replication {}",
                    task.id
                )));
            };

            let value = if task.status == "running" { 1.0 } else { 0.0 };
            debug!(source = %task.source, target = %target, status = %task.status, "xdcr task");
            running
                .get_metric_with_label_values(&[
                    task.source.as_str(),
                    target,
                    cluster_name,
                    cluster_hostname,
                ])
                .map_err(prom_err)?
                .set(value);
        }

        Ok(start.elapsed())
    }
}
