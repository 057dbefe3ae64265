//! Port to the monitored cluster's administrative API
//!
//! Implemented over HTTP in `couchstat-infra`; collector tests implement
//! it in memory.

use async_trait::async_trait;
use couchstat_domain::types::{
    Bucket, BucketBasicStats, ClusterStatus, RemoteCluster, ReplicationTask, SingleStat,
    StatsDirectory,
};
use couchstat_domain::Result;

/// Read access to the cluster's administrative API.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    /// List all buckets.
    async fn list_buckets(&self) -> Result<Vec<Bucket>>;

    /// Fetch one bucket's statistics directory, including index, XDCR and
    /// query blocks.
    async fn stats_directory(&self, bucket: &str) -> Result<StatsDirectory>;

    /// Fetch one bucket's basic time-series statistics.
    async fn basic_stats(&self, bucket: &str) -> Result<BucketBasicStats>;

    /// Fetch an arbitrary single-statistic time series by server-supplied
    /// path.
    async fn single_stat(&self, path: &str) -> Result<SingleStat>;

    /// Fetch cluster-wide topology and health.
    async fn cluster_status(&self) -> Result<ClusterStatus>;

    /// Fetch the in-flight task list.
    async fn tasks(&self) -> Result<Vec<ReplicationTask>>;

    /// Fetch the known remote-cluster identities.
    async fn remote_clusters(&self) -> Result<Vec<RemoteCluster>>;
}
