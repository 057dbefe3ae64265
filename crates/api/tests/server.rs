//! End-to-end tests: a wiremock Couchbase behind the real client,
//! registry, orchestrator and axum server.

use std::sync::Arc;

use couchstat_domain::config::Config;
use couchstat_domain::constants::{NAME, VERSION};
use couchstat_lib::context::AppContext;
use couchstat_lib::server;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start the exposition server wired at a Couchbase base URL; returns
/// its own base URL.
async fn spawn_app(couchbase_url: &str) -> String {
    let mut config = Config::default();
    config.cluster.base_url = couchbase_url.to_string();

    let context = Arc::new(AppContext::new(config).expect("app context"));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, server::router(context)).await.expect("serve");
    });

    format!("http://{addr}")
}

/// Mock the minimal set of endpoints one cycle touches: no buckets, one
/// healthy node, no replications.
async fn mock_quiet_cluster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/pools/default/buckets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[]", "application/json"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pools/default"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{
                "clusterName": "biscuits",
                "balanced": true,
                "nodes": [{
                    "hostname": "node-1:8091",
                    "status": "healthy",
                    "memoryTotal": 12630355968,
                    "memoryFree": 3743277056,
                    "version": "5.0.1-5003-enterprise"
                }]
            }"#,
            "application/json",
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pools/default/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[]", "application/json"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pools/default/remoteClusters"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[]", "application/json"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_check_reports_name_and_version() {
    let couchbase = MockServer::start().await;
    let base = spawn_app(&couchbase.uri()).await;

    let response = reqwest::get(format!("{base}/health_check")).await.expect("response");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["name"], NAME);
    assert_eq!(body["version"], VERSION);
}

#[tokio::test]
async fn unknown_paths_return_json_404() {
    let couchbase = MockServer::start().await;
    let base = spawn_app(&couchbase.uri()).await;

    let response = reqwest::get(format!("{base}/nope")).await.expect("response");
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["message"], "Not found");
}

#[tokio::test]
async fn metrics_scrape_collects_on_demand() {
    let couchbase = MockServer::start().await;
    mock_quiet_cluster(&couchbase).await;
    let base = spawn_app(&couchbase.uri()).await;

    let response = reqwest::get(format!("{base}/metrics")).await.expect("response");
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().expect("header"),
        "text/plain; version=0.0.4"
    );

    let body = response.text().await.expect("body");
    assert!(body.contains(r#"couchbase_healthy_node_count{cluster="biscuits"} 1"#));
    assert!(body.contains(r#"couchbase_memory_total_bytes{node="node-1:8091"}"#));
    assert!(body.contains(r#"couchbase_cluster_balanced{cluster="biscuits"} 1"#));
}

#[tokio::test]
async fn metrics_scrape_fails_with_500_when_the_cluster_is_down() {
    // A mock server with no routes answers 404 to everything, which the
    // client surfaces as an unexpected status.
    let couchbase = MockServer::start().await;
    let base = spawn_app(&couchbase.uri()).await;

    let response = reqwest::get(format!("{base}/metrics")).await.expect("response");
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.expect("body"), "Unable to fetch metrics");
}
