//! End-to-end document pipeline: a config-steered discovery against one
//! mock workload, results written into the cache, then on-demand
//! retrieval of the raw content.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agent::cache::ServiceListCache;
use agent::discovery::document::DocumentService;
use agent::discovery::documents::DocumentsDiscoveryService;
use agent::model::service::Service;
use agent::model::urls::DocumentDiscoveryUrls;

fn config_only_urls() -> DocumentDiscoveryUrls {
    DocumentDiscoveryUrls {
        apihub_config: vec!["/v3/api-docs/apihub-swagger-config".to_string()],
        ..Default::default()
    }
}

async fn workload_with_config() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/api-docs/apihub-swagger-config"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"urls":[
                {"url":"/openapi.json","type":"openapi-3-0","name":"Orders API","x-api-kind":"bwc"},
                {"url":"/docs/guide","type":"markdown","name":"Docs"},
                {"url":"/docs/extra","type":"markdown","name":"Docs"},
                {"url":"/schema/order","type":"json-schema","name":"Order"}
            ]}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"openapi":"3.0.2","info":{"title":"Orders","version":"7"}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/guide"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Guide"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/extra"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Extra"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/schema/order"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"type":"object"}"#))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn config_steered_discovery_covers_every_family() {
    let server = workload_with_config().await;
    let discovery = DocumentsDiscoveryService::new(Duration::from_secs(2));

    let (result, error) = discovery.retrieve_documents(&server.uri(), &config_only_urls()).await;
    assert!(error.is_none(), "unexpected error: {error:?}");

    let by_path = |p: &str| {
        result
            .documents
            .iter()
            .find(|d| d.doc_path == p)
            .unwrap_or_else(|| panic!("missing document for {p}"))
    };

    // rest runner output comes first and keeps the config name
    let openapi = by_path("/openapi.json");
    assert_eq!(openapi.name, "Orders API");
    assert_eq!(openapi.doc_type, "openapi-3-0");
    assert_eq!(openapi.x_api_kind, "bwc");
    assert_eq!(openapi.config_path, "/v3/api-docs/apihub-swagger-config");

    // two markdown documents with the same name collide on the file id
    let guide = by_path("/docs/guide");
    let extra = by_path("/docs/extra");
    let mut md_ids = vec![guide.file_id.clone(), extra.file_id.clone()];
    md_ids.sort();
    assert_eq!(md_ids, vec!["Docs.md", "Docs1.md"]);

    let schema = by_path("/schema/order");
    assert_eq!(schema.doc_type, "json-schema");
    assert_eq!(schema.format, "json");

    // every file id is unique within the service snapshot
    let mut ids: Vec<&str> = result.documents.iter().map(|d| d.file_id.as_str()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[tokio::test]
async fn discovered_documents_can_be_refetched_by_file_id() {
    let server = workload_with_config().await;
    let discovery = DocumentsDiscoveryService::new(Duration::from_secs(2));
    let (result, _) = discovery.retrieve_documents(&server.uri(), &config_only_urls()).await;

    let cache = Arc::new(ServiceListCache::new());
    cache.handle_discovery_start("ns1", "WS");
    cache.add_service(
        "ns1",
        "WS",
        Service {
            id: "orders".to_string(),
            name: "orders".to_string(),
            url: server.uri(),
            documents: result.documents.clone(),
            ..Default::default()
        },
    );

    let document_service = DocumentService::new(cache, Duration::from_secs(2));

    let openapi = result.documents.iter().find(|d| d.doc_path == "/openapi.json").unwrap();
    let content = document_service
        .get_document_by_id("ns1", "WS", "orders", &openapi.file_id)
        .await
        .unwrap();
    assert!(content.starts_with(b"{\"openapi\":\"3.0.2\""));

    let guide = result.documents.iter().find(|d| d.doc_path == "/docs/guide").unwrap();
    let content = document_service
        .get_document_by_id("ns1", "WS", "orders", &guide.file_id)
        .await
        .unwrap();
    assert_eq!(&content[..], b"# Guide");
}

#[tokio::test]
async fn required_ref_failure_surfaces_in_the_combined_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/api-docs/apihub-swagger-config"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"urls":[{"url":"/gone.json","type":"openapi-3-0","name":"Gone"}]}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let discovery = DocumentsDiscoveryService::new(Duration::from_secs(2));
    let (result, error) = discovery.retrieve_documents(&server.uri(), &config_only_urls()).await;

    assert!(result.documents.is_empty());
    let error = error.expect("a required ref failure must elevate");
    assert!(error.contains("/gone.json"));
    // the failed probe is also visible as a diagnostic
    assert!(result.endpoint_calls.iter().any(|c| c.path == "/gone.json"));
}
