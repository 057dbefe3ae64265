//! HTTP client for the Couchbase administrative API
//!
//! Every endpoint is a plain authenticated GET returning JSON; anything
//! but a 200 is surfaced as an unexpected-status error so a cycle fails
//! loudly instead of parsing an error body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use couchstat_core::ClusterAdmin;
use couchstat_domain::config::ClusterConfig;
use couchstat_domain::constants::USER_AGENT;
use couchstat_domain::types::{
    Bucket, BucketBasicStats, ClusterStatus, RemoteCluster, ReplicationTask, SingleStat,
    StatsDirectory,
};
use couchstat_domain::{CouchstatError, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::url::normalize_base_url;
use crate::errors::InfraError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn into_domain(err: reqwest::Error) -> CouchstatError {
    let infra: InfraError = err.into();
    infra.into()
}

/// Authenticated client for one cluster's administrative API.
pub struct CouchbaseClient {
    client: Client,
    base: String,
    username: String,
    password: String,
}

impl CouchbaseClient {
    /// Build a client from cluster configuration. The base URL is
    /// normalized (default administrative port, no trailing slash).
    ///
    /// # Errors
    /// Returns [`CouchstatError::Config`] for an invalid base URL and
    /// [`CouchstatError::Network`] when the underlying client cannot be
    /// constructed.
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        let base = normalize_base_url(&config.base_url)?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(into_domain)?;

        Ok(Self {
            client,
            base,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Normalized base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!(path = %path, "request start");
        let url = format!("{}{}", self.base, path);
        let start = Instant::now();

        let mut request = self.client.get(&url).basic_auth(&self.username, Some(&self.password));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(into_domain)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CouchstatError::UnexpectedStatus {
                expected: StatusCode::OK.as_u16(),
                actual: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.json::<T>().await.map_err(into_domain)?;
        debug!(
            path = %path,
            duration_ms = start.elapsed().as_millis() as u64,
            "couchbase stats call"
        );
        Ok(body)
    }
}

#[async_trait]
impl ClusterAdmin for CouchbaseClient {
    async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        self.get_json("/pools/default/buckets", &[]).await
    }

    async fn stats_directory(&self, bucket: &str) -> Result<StatsDirectory> {
        let path = format!("/pools/default/buckets/{bucket}/statsDirectory");
        // Pull index, xdcr, and query related stats as well.
        self.get_json(&path, &[("addi", "\"all\""), ("addq", "1")]).await
    }

    async fn basic_stats(&self, bucket: &str) -> Result<BucketBasicStats> {
        let path = format!("/pools/default/buckets/{bucket}/stats");
        self.get_json(&path, &[]).await
    }

    async fn single_stat(&self, path: &str) -> Result<SingleStat> {
        self.get_json(path, &[]).await
    }

    async fn cluster_status(&self) -> Result<ClusterStatus> {
        self.get_json("/pools/default", &[("waitChange", "0")]).await
    }

    async fn tasks(&self) -> Result<Vec<ReplicationTask>> {
        self.get_json("/pools/default/tasks", &[]).await
    }

    async fn remote_clusters(&self) -> Result<Vec<RemoteCluster>> {
        self.get_json("/pools/default/remoteClusters", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use couchstat_domain::types::Sample;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> CouchbaseClient {
        CouchbaseClient::new(&ClusterConfig {
            base_url: server.uri(),
            username: "admin".to_string(),
            password: "secret".to_string(),
        })
        .expect("client")
    }

    #[tokio::test]
    async fn lists_buckets_with_auth_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pools/default/buckets"))
            .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"name": "beer"}, {"name": "travel"}]"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let buckets = client_for(&server).list_buckets().await.expect("buckets");
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].name, "beer");
    }

    #[tokio::test]
    async fn stats_directory_requests_all_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pools/default/buckets/beer/statsDirectory"))
            .and(query_param("addi", "\"all\""))
            .and(query_param("addq", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"blocks": [{"blockName": "Summary", "stats": [{"name": "cmd_get"}]}]}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let directory = client_for(&server).stats_directory("beer").await.expect("directory");
        assert_eq!(directory.blocks.len(), 1);
        assert_eq!(directory.blocks[0].stats[0].name, "cmd_get");
    }

    #[tokio::test]
    async fn cluster_status_disables_long_polling() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pools/default"))
            .and(query_param("waitChange", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"clusterName": "biscuits", "balanced": true, "nodes": []}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let status = client_for(&server).cluster_status().await.expect("status");
        assert_eq!(status.cluster_name, "biscuits");
        assert_eq!(status.balanced, Some(true));
    }

    #[tokio::test]
    async fn single_stat_uses_the_server_supplied_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pools/default/buckets/beer/stats/mem_used"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"nodeStats": {"n1": [1, "undefined", 3]}}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let stat = client_for(&server)
            .single_stat("/pools/default/buckets/beer/stats/mem_used")
            .await
            .expect("stat");
        let series = &stat.node_stats["n1"];
        assert_eq!(series.len(), 3);
        assert_eq!(series[2], Sample::Number(3.0));
    }

    #[tokio::test]
    async fn non_200_responses_are_unexpected_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pools/default/tasks"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let error = client_for(&server).tasks().await.expect_err("error");
        match error {
            CouchstatError::UnexpectedStatus { expected, actual, path } => {
                assert_eq!(expected, 200);
                assert_eq!(actual, 401);
                assert_eq!(path, "/pools/default/tasks");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_bodies_are_network_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pools/default/remoteClusters"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let error = client_for(&server).remote_clusters().await.expect_err("error");
        assert!(matches!(error, CouchstatError::Network(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let client = CouchbaseClient::new(&ClusterConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
        })
        .expect("client");

        let error = client.list_buckets().await.expect_err("error");
        assert!(matches!(error, CouchstatError::Network(_)));
    }
}
