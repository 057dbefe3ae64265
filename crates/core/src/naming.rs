//! Stat-naming rules
//!
//! Gauge names are derived from server-advertised statistic names, so
//! they have to be normalized before registration: a fixed namespace
//! prefix, a byte-unit suffix for byte-valued statistics, and
//! sanitization of the `+` and `/` characters Couchbase uses in some
//! statistic names. Index statistics arrive as `index/<index>/<stat>`
//! and are rewritten onto the `index_<stat>` namespace shared with the
//! aggregate gauges.

use couchstat_domain::constants::METRIC_NAMESPACE;
use couchstat_domain::types::StatDescriptor;
use couchstat_domain::{CouchstatError, Result};

/// Block-name prefix marking an index-specific statistics block.
const INDEX_BLOCK_PREFIX: &str = "Index Stats: ";

/// Block-name fragments whose statistics are covered elsewhere.
const IGNORED_BLOCK_TYPES: [&str; 2] = ["XDCR", "Query"];

/// Replace the characters Couchbase permits but the exposition format
/// does not.
pub fn sanitize(name: &str) -> String {
    name.replace(['+', '/'], "_")
}

/// Derive the gauge name for a statistic descriptor.
pub fn gauge_name(stat: &StatDescriptor) -> String {
    let mut name = format!("{METRIC_NAMESPACE}_{}", stat.name);
    if stat.is_bytes {
        name.push_str("_bytes");
    }
    sanitize(&name)
}

/// Help text for a statistic descriptor's gauge.
pub fn gauge_help(stat: &StatDescriptor) -> String {
    format!("({}) {}", stat.title, stat.desc)
}

/// Rewrite an index statistic name, replacing the `index/<index>/`
/// prefix with `index_`.
pub fn rewrite_index_stat(name: &str, index_name: &str) -> String {
    let prefix = format!("index/{index_name}/");
    sanitize(&name.replacen(&prefix, "index_", 1))
}

/// Index name of an `Index Stats: <name>` block, if it is one.
pub fn match_index_block(block_name: &str) -> Option<&str> {
    block_name.strip_prefix(INDEX_BLOCK_PREFIX)
}

/// Whether a directory block is covered by another collector or is
/// noise.
pub fn should_ignore_block(block_name: &str) -> bool {
    IGNORED_BLOCK_TYPES.iter().any(|fragment| block_name.contains(fragment))
}

/// Version components of one node, kept as strings for labeling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeVersion {
    /// Major component
    pub major: String,
    /// Minor component
    pub minor: String,
    /// Patch component
    pub patch: String,
    /// Build identifier tail, hyphens preserved; empty when absent
    pub build: String,
}

/// Parse a `MAJOR.MINOR.PATCH[-BUILD[-SUFFIX...]]` version string.
///
/// The first two components split on `.`; the remainder splits on `-`
/// into the patch and an arbitrary-length build tail rejoined with `-`.
///
/// # Errors
/// Returns [`CouchstatError::InvalidInput`] when fewer than three
/// dot-separated components are present.
pub fn parse_node_version(version: &str) -> Result<NodeVersion> {
    let mut parts = version.splitn(3, '.');
    let (Some(major), Some(minor), Some(rest)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(CouchstatError::InvalidInput(format!(
            "unparseable node version: {version:?}"
        )));
    };

    let mut tail = rest.split('-');
    let patch = tail.next().unwrap_or_default();
    let build = tail.collect::<Vec<_>>().join("-");

    Ok(NodeVersion {
        major: major.to_string(),
        minor: minor.to_string(),
        patch: patch.to_string(),
        build,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, is_bytes: bool) -> StatDescriptor {
        StatDescriptor {
            name: name.to_string(),
            title: "title".to_string(),
            desc: "desc".to_string(),
            is_bytes,
            specific_stats_url: None,
        }
    }

    #[test]
    fn byte_valued_stats_get_a_bytes_suffix() {
        assert_eq!(gauge_name(&descriptor("mem_used", true)), "couchbase_mem_used_bytes");
        assert_eq!(gauge_name(&descriptor("cmd_get", false)), "couchbase_cmd_get");
    }

    #[test]
    fn derived_names_never_contain_plus_or_slash() {
        let name = gauge_name(&descriptor("vb_active_resident_items_ratio+foo/bar", false));
        assert!(!name.contains('+'));
        assert!(!name.contains('/'));
        assert_eq!(name, "couchbase_vb_active_resident_items_ratio_foo_bar");
    }

    #[test]
    fn help_combines_title_and_description() {
        assert_eq!(gauge_help(&descriptor("x", false)), "(title) desc");
    }

    #[test]
    fn index_stat_names_are_rewritten_onto_the_shared_namespace() {
        assert_eq!(rewrite_index_stat("index/idx1/items_count", "idx1"), "index_items_count");
        // Names without the prefix pass through (sanitized).
        assert_eq!(rewrite_index_stat("items_count", "idx1"), "items_count");
    }

    #[test]
    fn index_blocks_are_recognized_by_name() {
        assert_eq!(match_index_block("Index Stats: idx1"), Some("idx1"));
        assert_eq!(match_index_block("Summary"), None);
    }

    #[test]
    fn xdcr_and_query_blocks_are_ignored() {
        assert!(should_ignore_block("Outgoing XDCR"));
        assert!(should_ignore_block("Query"));
        assert!(should_ignore_block("N1QL Query Stats"));
        assert!(!should_ignore_block("Summary"));
    }

    #[test]
    fn version_with_build_tail_parses() {
        let version = parse_node_version("5.0.1-5003-enterprise").unwrap();
        assert_eq!(version.major, "5");
        assert_eq!(version.minor, "0");
        assert_eq!(version.patch, "1");
        assert_eq!(version.build, "5003-enterprise");
    }

    #[test]
    fn version_without_build_parses() {
        let version = parse_node_version("7.2.0").unwrap();
        assert_eq!(version.patch, "0");
        assert_eq!(version.build, "");
    }

    #[test]
    fn truncated_version_is_invalid() {
        assert!(matches!(
            parse_node_version("5.0"),
            Err(CouchstatError::InvalidInput(_))
        ));
    }
}
