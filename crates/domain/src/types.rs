//! Wire models of the Couchbase administrative API
//!
//! Only the fields the collectors consume are modeled; everything else in
//! the responses is ignored during deserialization. All snapshots are
//! re-fetched every cycle and discarded at cycle end.

use std::collections::HashMap;

use serde::Deserialize;

/// A named data bucket, the unit of per-bucket statistic discovery.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Bucket {
    /// Bucket name
    pub name: String,
}

/// One statistic as advertised by the cluster's statistics directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatDescriptor {
    /// Raw statistic name, e.g. `cmd_get` or `index/idx1/items_count`
    pub name: String,
    /// Human-readable title
    #[serde(default)]
    pub title: String,
    /// Human-readable description
    #[serde(default)]
    pub desc: String,
    /// Whether the statistic is byte-valued
    #[serde(default)]
    pub is_bytes: bool,
    /// Node-level time-series endpoint for this statistic
    #[serde(default, rename = "specificStatsURL")]
    pub specific_stats_url: Option<String>,
}

/// A named block of statistic descriptors in the directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatBlock {
    /// Block title, e.g. `Summary` or `Index Stats: idx1`
    pub block_name: String,
    /// Descriptors advertised under this block
    #[serde(default)]
    pub stats: Vec<StatDescriptor>,
}

/// The statistics directory of one bucket.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StatsDirectory {
    /// Advertised blocks, in server order
    #[serde(default)]
    pub blocks: Vec<StatBlock>,
}

/// One entry of a time series: a number, or a bare string placeholder.
///
/// Couchbase reports `"undefined"` where a node has no data for an
/// instant; that sentinel must be skipped, never recorded as zero.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Sample {
    /// A recorded value
    Number(f64),
    /// A placeholder or otherwise non-numeric entry
    Text(String),
}

impl Sample {
    /// Numeric value, if this entry is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// Whether this entry is the `"undefined"` no-data sentinel.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Text(text) if text == "undefined")
    }
}

/// Basic per-bucket time-series statistics.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct BucketBasicStats {
    /// Operational sample block
    #[serde(default)]
    pub op: OpSamples,
}

/// Sample series keyed by raw statistic name.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OpSamples {
    /// One series per statistic
    #[serde(default)]
    pub samples: HashMap<String, Vec<Sample>>,
}

/// A single statistic's per-node time series.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SingleStat {
    /// One series per node hostname
    #[serde(default)]
    pub node_stats: HashMap<String, Vec<Sample>>,
}

/// Cluster-wide topology and health.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Configured cluster name; may be empty
    #[serde(default)]
    pub cluster_name: String,
    /// Whether the cluster is balanced. Absent on older clusters, which
    /// is distinct from `false`.
    #[serde(default)]
    pub balanced: Option<bool>,
    /// Member nodes
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
}

/// One node in the cluster status response.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Node hostname, including port
    #[serde(default)]
    pub hostname: String,
    /// Health status, `"healthy"` when the node is up
    #[serde(default)]
    pub status: String,
    /// Total memory on the node, bytes
    #[serde(default)]
    pub memory_total: f64,
    /// Free memory on the node, bytes
    #[serde(default)]
    pub memory_free: f64,
    /// Dot- and hyphen-delimited version string
    #[serde(default)]
    pub version: String,
}

/// An in-flight task reported by the cluster.
///
/// The task list is heterogeneous; only `type == "xdcr"` entries carry
/// the replication fields, so everything but `type` defaults to empty.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ReplicationTask {
    /// Task id; the first `/` segment encodes the remote-cluster id
    #[serde(default)]
    pub id: String,
    /// Task type discriminator
    #[serde(default, rename = "type")]
    pub task_type: String,
    /// Source bucket
    #[serde(default)]
    pub source: String,
    /// Target path; the last `/` segment is the target bucket
    #[serde(default)]
    pub target: String,
    /// Task status, `"running"` when replication is active
    #[serde(default)]
    pub status: String,
}

/// Identity of a replication peer, keyed by its opaque uuid.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteCluster {
    /// Opaque identifier referenced from task ids
    pub uuid: String,
    /// Configured peer name
    pub name: String,
    /// Peer hostname
    pub hostname: String,
}
