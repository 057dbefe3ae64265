//! Per-bucket statistic discovery and collection
//!
//! The cluster advertises an arbitrarily-shaped statistics directory per
//! bucket, so there is no hardcoded list of statistic names: every
//! descriptor seen for the first time in a cycle lazily registers a
//! gauge, and the registry clear between cycles evicts whatever the
//! cluster stopped exposing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use couchstat_domain::types::{Bucket, StatBlock, StatDescriptor};
use couchstat_domain::Result;
use dashmap::DashMap;
use futures::future;
use prometheus::GaugeVec;
use regex::Regex;
use tracing::{debug, error};

use crate::naming;
use crate::ports::ClusterAdmin;
use crate::registry::MetricRegistry;

/// Discovers and collects per-bucket statistics for one cycle.
///
/// Construct fresh every cycle; the raw-name and derived-name maps only
/// live as long as the cycle that filled them.
pub struct BucketStatCollector {
    admin: Arc<dyn ClusterAdmin>,
    registry: Arc<MetricRegistry>,
    ignore_buckets: Regex,
    // Raw statistic name -> gauge, shared by the concurrent per-bucket
    // fetches. Seeded by directory discovery, consumed by sample writes.
    gauges: DashMap<String, GaugeVec>,
    // Derived gauge names registered this cycle; a post-sanitization
    // collision is treated as already-registered.
    names: DashMap<String, ()>,
}

impl BucketStatCollector {
    /// Create a collector for one cycle.
    pub fn new(
        admin: Arc<dyn ClusterAdmin>,
        registry: Arc<MetricRegistry>,
        ignore_buckets: Regex,
    ) -> Self {
        Self {
            admin,
            registry,
            ignore_buckets,
            gauges: DashMap::new(),
            names: DashMap::new(),
        }
    }

    /// Collect statistics for every non-ignored bucket.
    ///
    /// # Errors
    /// Propagates fetch failures; data-shape surprises and gauge
    /// registration conflicts are handled locally.
    pub async fn collect(&self, buckets: &[Bucket]) -> Result<Duration> {
        let start = Instant::now();

        let work = buckets
            .iter()
            .filter(|bucket| !self.ignore_buckets.is_match(&bucket.name))
            .map(|bucket| self.collect_bucket(&bucket.name));
        future::try_join_all(work).await?;

        Ok(start.elapsed())
    }

    async fn collect_bucket(&self, bucket: &str) -> Result<()> {
        let directory = self.admin.stats_directory(bucket).await?;

        for block in &directory.blocks {
            if let Some(index_name) = naming::match_index_block(&block.block_name) {
                self.collect_index_block(bucket, block, index_name).await?;
                continue;
            }

            if naming::should_ignore_block(&block.block_name) {
                continue;
            }

            for stat in &block.stats {
                self.ensure_gauge(stat);
            }
        }

        let basic = self.admin.basic_stats(bucket).await?;
        for (key, samples) in &basic.op.samples {
            let Some(gauge) = self.gauges.get(key).map(|entry| entry.value().clone()) else {
                continue;
            };
            let Some(last) = samples.last() else {
                continue;
            };
            let Some(value) = last.as_f64() else {
                continue;
            };
            match gauge.get_metric_with_label_values(&[bucket]) {
                Ok(metric) => metric.set(value),
                // An index-shaped gauge sharing a raw name with a basic
                // series; node-level samples own it.
                Err(err) => debug!(stat = %key, error = %err, "skipping mismatched sample"),
            }
        }

        Ok(())
    }

    /// Register the gauge for a descriptor unless this cycle already has
    /// it. Registration failures are logged per statistic and never
    /// abort discovery.
    fn ensure_gauge(&self, stat: &StatDescriptor) {
        if self.gauges.contains_key(&stat.name) {
            return;
        }

        let name = naming::gauge_name(stat);
        if self.names.contains_key(&name) {
            return;
        }

        // Index-namespace gauges only ever receive node-level samples.
        let label_names: &[&str] = if stat.name.starts_with("index_") {
            &["bucket", "index", "node"]
        } else {
            &["bucket"]
        };

        let help = naming::gauge_help(stat);
        match self.registry.create_if_absent(&name, &help, label_names) {
            Ok(gauge) => {
                self.names.insert(name, ());
                self.gauges.insert(stat.name.clone(), gauge);
            }
            Err(err) => {
                error!(error = %err, name = %name, stat = %stat.name, "failed to register gauge");
            }
        }
    }

    /// Fetch node-level series for the index statistics whose rewritten
    /// name already has a gauge this cycle.
    async fn collect_index_block(
        &self,
        bucket: &str,
        block: &StatBlock,
        index_name: &str,
    ) -> Result<()> {
        let mut pending = Vec::new();
        for stat in &block.stats {
            let rewritten = naming::rewrite_index_stat(&stat.name, index_name);
            let Some(gauge) = self.gauges.get(&rewritten).map(|entry| entry.value().clone())
            else {
                continue;
            };
            let Some(url) = stat.specific_stats_url.clone() else {
                debug!(stat = %stat.name, "index stat without a stats URL");
                continue;
            };
            pending.push(self.collect_index_stat(bucket, index_name, url, gauge));
        }

        future::try_join_all(pending).await?;
        Ok(())
    }

    async fn collect_index_stat(
        &self,
        bucket: &str,
        index_name: &str,
        url: String,
        gauge: GaugeVec,
    ) -> Result<()> {
        let result = self.admin.single_stat(&url).await?;
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
            match gauge.get_metric_with_label_values(&[bucket, index_name, node.as_str()]) {
                Ok(metric) => metric.set(value),
                Err(err) => debug!(node = %node, error = %err, "skipping index sample"),
            }
        }
        Ok(())
    }
}
