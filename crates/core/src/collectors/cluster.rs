//! Cluster-wide topology, health and query-throughput gauges

use std::sync::Arc;
use std::time::{Duration, Instant};

use couchstat_domain::types::{Bucket, SingleStat};
use couchstat_domain::Result;
use tracing::debug;

use crate::naming;
use crate::ports::ClusterAdmin;
use crate::registry::{prom_err, MetricRegistry};

/// Placeholder cluster name when the cluster does not report one.
const UNKNOWN_CLUSTER: &str = "<unknown>";

/// Collects cluster-level gauges for one cycle.
///
/// A fixed set of gauges is registered up front; the `balanced` gauge is
/// created only when the cluster status carries that property at all.
pub struct ClusterStatCollector {
    admin: Arc<dyn ClusterAdmin>,
    registry: Arc<MetricRegistry>,
}

impl ClusterStatCollector {
    /// Create a collector for one cycle.
    pub fn new(admin: Arc<dyn ClusterAdmin>, registry: Arc<MetricRegistry>) -> Self {
        Self { admin, registry }
    }

    /// Collect cluster status and per-node gauges.
    ///
    /// # Errors
    /// Propagates fetch failures and unparseable node versions; both
    /// fail the cycle and are retried by the orchestrator.
    pub async fn collect(&self, buckets: &[Bucket]) -> Result<Duration> {
        let start = Instant::now();

        let memory_total = self.registry.create_if_absent(
            "couchbase_memory_total_bytes",
            "The total memory in the cluster in bytes",
            &["node"],
        )?;
        let memory_free = self.registry.create_if_absent(
            "couchbase_memory_free_bytes",
            "The free memory in the cluster in bytes",
            &["node"],
        )?;
        let healthy_nodes = self.registry.create_if_absent(
            "couchbase_healthy_node_count",
            "The total number of healthy nodes in the cluster",
            &["cluster"],
        )?;
        let node_version = self.registry.create_if_absent(
            "couchbase_node_version",
            "The version of a node",
            &["cluster", "node", "version", "major", "minor", "patch", "build"],
        )?;
        let queries = self.registry.create_if_absent(
            "couchbase_n1ql_queries_per_second",
            "Number of N1QL requests processed per second",
            &["cluster", "node"],
        )?;

        let (status, query_result) =
            tokio::try_join!(self.admin.cluster_status(), self.query_stats(buckets))?;

        let cluster = if status.cluster_name.is_empty() {
            UNKNOWN_CLUSTER.to_string()
        } else {
            status.cluster_name.clone()
        };

        if let Some(result) = query_result {
            for (node, samples) in &result.node_stats {
                let Some(last) = samples.last() else {
                    continue;
                };
                if last.is_placeholder() {
                    continue;
                }
                let Some(value) = last.as_f64() else {
                    continue;
                };
                queries
                    .get_metric_with_label_values(&[cluster.as_str(), node.as_str()])
                    .map_err(prom_err)?
                    .set(value);
            }
        }

        if let Some(balanced) = status.balanced {
            let gauge = self.registry.create_if_absent(
                "couchbase_cluster_balanced",
                "Is the cluster balanced? Will be set to 0 if not, otherwise, 1.",
                &["cluster"],
            )?;
            gauge
                .get_metric_with_label_values(&[cluster.as_str()])
                .map_err(prom_err)?
                .set(if balanced { 1.0 } else { 0.0 });
        }

        let mut healthy_count = 0u64;
        for node in &status.nodes {
            if node.status == "healthy" {
                healthy_count += 1;
            }

            memory_total
                .get_metric_with_label_values(&[node.hostname.as_str()])
                .map_err(prom_err)?
                .set(node.memory_total);
            memory_free
                .get_metric_with_label_values(&[node.hostname.as_str()])
                .map_err(prom_err)?
                .set(node.memory_free);

            let version = naming::parse_node_version(&node.version)?;
            node_version
                .get_metric_with_label_values(&[
                    cluster.as_str(),
                    node.hostname.as_str(),
                    node.version.as_str(),
                    version.major.as_str(),
                    version.minor.as_str(),
                    version.patch.as_str(),
                    version.build.as_str(),
                ])
                .map_err(prom_err)?
                .set(1.0);
        }

        healthy_nodes
            .get_metric_with_label_values(&[cluster.as_str()])
            .map_err(prom_err)?
            .set(healthy_count as f64);

        Ok(start.elapsed())
    }

    /// Query throughput for a representative bucket: the first in the
    /// supplied list. No request is made when the list is empty.
    async fn query_stats(&self, buckets: &[Bucket]) -> Result<Option<SingleStat>> {
        let Some(first) = buckets.first() else {
            debug!("no buckets; skipping query throughput");
            return Ok(None);
        };
        let path = format!("/pools/default/buckets/{}/stats/query_requests", first.name);
        Ok(Some(self.admin.single_stat(&path).await?))
    }
}
