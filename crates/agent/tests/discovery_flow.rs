mod common;

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agent::model::service::DiscoveryStatus;
use agent::platform::{ClusterPod, ClusterService, ClusterServicePort};
use agent::secctx::SecurityContext;

use common::{build_state, test_config, FakePlatform};

fn cluster_service(name: &str, selector: &[(&str, &str)], labels: &[(&str, &str)]) -> ClusterService {
    ClusterService {
        name: name.to_string(),
        namespace: "ns1".to_string(),
        labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        annotations: Default::default(),
        selector: selector.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        ports: vec![ClusterServicePort { name: "http".to_string(), port: 8080 }],
    }
}

async fn registry_for_baselines() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/packages"))
        .and(query_param("serviceName", "orders"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"packages":[{"packageId":"pkg.orders","name":"Orders","kind":"package"}]}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/packages"))
        .and(query_param("serviceName", "billing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"packages":[]}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/packages/pkg.orders/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"versions":[{"version":"2024.2","status":"release"},{"version":"2024.1","status":"release"}]}"#,
        ))
        .mount(&server)
        .await;
    server
}

fn platform_with_workloads() -> FakePlatform {
    let mut platform = FakePlatform::default();
    platform.namespaces = vec!["ns1".to_string()];
    platform.services.insert(
        "ns1".to_string(),
        vec![
            cluster_service("orders-v3", &[("app", "orders")], &[]),
            cluster_service("billing", &[], &[]),
            cluster_service("gateway", &[], &[("facadeGateway", "true")]),
        ],
    );
    platform.pods.insert(
        "ns1".to_string(),
        vec![ClusterPod {
            name: "orders-pod-1".to_string(),
            labels: [
                ("app".to_string(), "orders".to_string()),
                ("app_name".to_string(), "orders".to_string()),
                ("pod-template-hash".to_string(), "abc123".to_string()),
            ]
            .into_iter()
            .collect(),
        }],
    );
    platform
}

async fn wait_for_terminal_status(
    state: &agent::state::AppState,
    namespace: &str,
    workspace_id: &str,
) -> DiscoveryStatus {
    for _ in 0..120 {
        let (_, status, _) = state.service_cache.get_services_list(namespace, workspace_id);
        if status == DiscoveryStatus::Complete || status == DiscoveryStatus::Error {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    panic!("discovery did not reach a terminal status");
}

#[tokio::test]
async fn discovery_emits_filtered_sorted_services_with_baselines() {
    let registry = registry_for_baselines().await;
    let mut config = test_config(&registry.uri());
    config.discovery_timeout_sec = 1;
    config.discovery_grouping_labels = vec!["app_name".to_string()];
    let state = build_state(config, platform_with_workloads());

    state
        .discovery
        .start_discovery(SecurityContext::system(), "ns1", "WS1")
        .await
        .expect("discovery must start");

    // returns immediately with the entry marked running
    let (_, status, _) = state.service_cache.get_services_list("ns1", "WS1");
    assert_eq!(status, DiscoveryStatus::Running);

    let status = wait_for_terminal_status(&state, "ns1", "WS1").await;
    assert_eq!(status, DiscoveryStatus::Complete);

    let (services, _, _) = state.service_cache.get_services_list("ns1", "WS1");

    // the excluded gateway is absent, the rest are sorted by name
    let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["billing", "orders"]);

    let orders = &services[1];
    assert_eq!(orders.id, "orders-v3");
    assert_eq!(orders.url, "http://orders-v3.ns1.svc.cluster.local:8080");
    assert_eq!(orders.proxy_server_url, "/agents/k8s_agent-ns/namespaces/ns1/services/orders-v3/proxy/");

    // labels are filtered down to the grouping set
    assert_eq!(orders.labels.len(), 1);
    assert_eq!(orders.labels.get("app_name").unwrap(), "orders");

    // baseline resolved via the registry, default version from the list
    let baseline = orders.baseline.as_ref().expect("orders must have a baseline");
    assert_eq!(baseline.package_id, "pkg.orders");
    assert_eq!(baseline.versions, vec!["2024.2", "2024.1"]);
    assert_eq!(
        baseline.url,
        format!(
            "{}/portal/packages/pkg.orders/2024.2?mode=overview&item=summary",
            registry.uri()
        )
    );

    let billing = &services[0];
    assert!(billing.baseline.is_none());

    // probes could not reach the cluster-local endpoints, which must be
    // visible as diagnostics rather than errors
    assert!(orders.documents.is_empty());
    assert!(orders.diagnostic_info.is_some());
    assert!(orders.error.is_empty());
}

#[tokio::test]
async fn rediscovery_overwrites_the_previous_entry() {
    let registry = registry_for_baselines().await;
    let mut config = test_config(&registry.uri());
    config.discovery_timeout_sec = 1;
    let state = build_state(config, platform_with_workloads());

    state
        .discovery
        .start_discovery(SecurityContext::system(), "ns1", "WS1")
        .await
        .unwrap();
    wait_for_terminal_status(&state, "ns1", "WS1").await;

    state
        .discovery
        .start_discovery(SecurityContext::system(), "ns1", "WS1")
        .await
        .unwrap();
    let status = wait_for_terminal_status(&state, "ns1", "WS1").await;
    assert_eq!(status, DiscoveryStatus::Complete);

    let (services, _, _) = state.service_cache.get_services_list("ns1", "WS1");
    assert_eq!(services.len(), 2, "restart must not duplicate services");
}

#[tokio::test]
async fn unknown_namespace_fails_fast() {
    let registry = registry_for_baselines().await;
    let state = build_state(test_config(&registry.uri()), platform_with_workloads());

    let err = state
        .discovery
        .start_discovery(SecurityContext::system(), "elsewhere", "WS1")
        .await
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.code, "100");
}
