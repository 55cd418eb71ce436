//! Namespace discovery engine: lists services and pods, joins labels,
//! applies exclude rules, then fans out per-service document discovery
//! and baseline lookup.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;
use tracing::{debug, error, info};

use crate::cache::{NamespaceListCache, ServiceListCache};
use crate::client::ApihubClient;
use crate::error::CustomError;
use crate::model::service::{Baseline, DiscoveryStatus, Service};
use crate::model::urls::{DocumentDiscoveryUrls, ServiceDiagnostic};
use crate::platform::{ClusterPod, ClusterService, PlatformService};
use crate::secctx::SecurityContext;
use crate::task::{join_all_safe, spawn_safe};

use super::documents::DocumentsDiscoveryService;
use super::{make_agent_id, make_custom_proxy_path};

pub const X_API_KIND_LABEL: &str = "apihub/x-api-kind";

// Trailing blue-green suffix, stripped to obtain the logical service name.
static BG_REGEXP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.*?)-v\d+$").unwrap());

pub struct DiscoveryService {
    cloud_name: String,
    agent_namespace: String,
    apihub_url: String,
    exclude_labels: Vec<String>,
    grouping_labels: HashSet<String>,

    namespace_cache: Arc<NamespaceListCache>,
    service_cache: Arc<ServiceListCache>,

    platform: Arc<dyn PlatformService>,
    documents_discovery: Arc<DocumentsDiscoveryService>,
    apihub: Arc<dyn ApihubClient>,
}

impl DiscoveryService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cloud_name: String,
        agent_namespace: String,
        apihub_url: String,
        exclude_labels: Vec<String>,
        grouping_labels: Vec<String>,
        namespace_cache: Arc<NamespaceListCache>,
        service_cache: Arc<ServiceListCache>,
        platform: Arc<dyn PlatformService>,
        documents_discovery: Arc<DocumentsDiscoveryService>,
        apihub: Arc<dyn ApihubClient>,
    ) -> Self {
        DiscoveryService {
            cloud_name,
            agent_namespace,
            apihub_url,
            exclude_labels,
            grouping_labels: grouping_labels.into_iter().collect(),
            namespace_cache,
            service_cache,
            platform,
            documents_discovery,
            apihub,
        }
    }

    /// Mark the cache entry running and return immediately; the body runs
    /// in the background with no cancellation, bounded only by per-probe
    /// timeouts.
    pub async fn start_discovery(
        self: &Arc<Self>,
        ctx: SecurityContext,
        namespace: &str,
        workspace_id: &str,
    ) -> Result<(), CustomError> {
        if !self.namespace_cache.namespace_exists(namespace).await? {
            return Err(CustomError::namespace_doesnt_exist(namespace));
        }

        self.service_cache.handle_discovery_start(namespace, workspace_id);

        let this = self.clone();
        let namespace = namespace.to_string();
        let workspace_id = workspace_id.to_string();
        spawn_safe(async move {
            this.run_discovery(ctx, &namespace, &workspace_id).await;
        });
        Ok(())
    }

    async fn run_discovery(self: &Arc<Self>, ctx: SecurityContext, namespace: &str, workspace_id: &str) {
        info!("Starting discovery for namespace {}", namespace);
        let start = Instant::now();

        let (services, pods) = tokio::join!(
            self.platform.get_service_list(namespace),
            self.platform.get_pod_list(namespace)
        );

        let services = match services {
            Ok(services) => services,
            Err(e) => {
                error!("Failed to list services in namespace {}: {}", namespace, e);
                self.service_cache.set_result_status(
                    namespace,
                    workspace_id,
                    DiscoveryStatus::Error,
                    &e.to_string(),
                );
                return;
            }
        };
        let pods = match pods {
            Ok(pods) => pods,
            Err(e) => {
                error!("Failed to list pods in namespace {}: {}", namespace, e);
                self.service_cache.set_result_status(
                    namespace,
                    workspace_id,
                    DiscoveryStatus::Error,
                    &e.to_string(),
                );
                return;
            }
        };

        let agent_id = make_agent_id(&self.cloud_name, &self.agent_namespace);

        let mut tasks = Vec::new();
        for srv in services {
            let service_pods = pods_for_selector(&pods, &srv.selector);
            let labels = all_labels_for_service(&srv, &service_pods);
            debug!("Full list of labels for service {}: {:?}", srv.name, labels);
            let annotations = srv.annotations.clone();

            // apply skip list for full list of labels
            if self.exclude_labels.iter().any(|label| labels.contains_key(label)) {
                info!("Service {} is excluded from discovery", srv.name);
                continue;
            }

            let discovery_urls = DocumentDiscoveryUrls::from_annotations(&annotations);

            let this = self.clone();
            let ctx = ctx.clone();
            let namespace = namespace.to_string();
            let workspace_id = workspace_id.to_string();
            let agent_id = agent_id.clone();
            tasks.push(async move {
                let service_id = srv.name.clone();
                let service_name = service_name_from(&service_id);
                let base_url = build_base_url(&srv);

                // search for documents and for baseline in parallel
                let ((result, doc_error), baseline) = tokio::join!(
                    this.documents_discovery.retrieve_documents(&base_url, &discovery_urls),
                    this.get_baseline(&ctx, &workspace_id, &service_name)
                );
                if let Some(ref e) = doc_error {
                    error!("Service {} have errors during discovery: {}", service_name, e);
                }

                let labels_to_add: HashMap<String, String> = labels
                    .into_iter()
                    .filter(|(k, _)| this.grouping_labels.contains(k) || k == X_API_KIND_LABEL)
                    .collect();

                let diagnostic_info = if result.endpoint_calls.is_empty() {
                    None
                } else {
                    Some(ServiceDiagnostic { endpoint_calls: result.endpoint_calls })
                };

                let service = Service {
                    id: service_id.clone(),
                    name: service_name,
                    url: base_url,
                    documents: result.documents,
                    baseline,
                    labels: labels_to_add,
                    proxy_server_url: make_custom_proxy_path(&agent_id, &namespace, &service_id),
                    error: doc_error.unwrap_or_default(),
                    diagnostic_info,
                };
                this.service_cache.add_service(&namespace, &workspace_id, service);
            });
        }

        join_all_safe(tasks).await;

        info!(
            "Discovery for namespace {} took {}ms",
            namespace,
            start.elapsed().as_millis()
        );

        self.service_cache.set_result_status(namespace, workspace_id, DiscoveryStatus::Complete, "");
    }

    /// Associate the service with its registry package by name.
    async fn get_baseline(
        &self,
        ctx: &SecurityContext,
        workspace_id: &str,
        service_name: &str,
    ) -> Option<Baseline> {
        let package = match self
            .apihub
            .get_package_by_service_name(ctx, workspace_id, service_name)
            .await
        {
            Ok(package) => package?,
            Err(e) => {
                error!("failed to get baseline for {}: {}", service_name, e);
                return None;
            }
        };

        let mut versions = Vec::new();
        let mut default_version = package.default_release_version.clone();
        match self.apihub.get_versions(ctx, &package.id, 0, 100).await {
            Ok(Some(resp)) => {
                for v in resp.versions {
                    if default_version.is_empty() {
                        default_version = v.version.clone();
                    }
                    versions.push(v.version);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("failed to get baseline {} versions: {}", package.id, e);
            }
        }

        Some(Baseline {
            package_id: package.id.clone(),
            name: package.name,
            url: format!(
                "{}/portal/packages/{}/{}?mode=overview&item=summary",
                self.apihub_url,
                package.id,
                urlencoding::encode(&default_version)
            ),
            versions,
        })
    }

    /// Resolve a service to its in-cluster base URL, always against the
    /// live platform state rather than the discovery cache.
    pub async fn get_service_url(&self, namespace: &str, service_id: &str) -> Result<String, CustomError> {
        let list = self.platform.get_service_list(namespace).await.map_err(|e| {
            error!("Failed to get services list in namespace {}: {}", namespace, e);
            CustomError::from(e)
        })?;
        for srv in &list {
            if srv.name == service_id {
                return Ok(build_base_url(srv));
            }
        }
        Err(CustomError::namespace_service_doesnt_exist(service_id, namespace))
    }
}

/// A pod matches when every selector key/value is present in its labels.
/// An empty selector matches nothing.
pub fn pods_for_selector(all_pods: &[ClusterPod], selector: &HashMap<String, String>) -> Vec<ClusterPod> {
    if selector.is_empty() {
        return Vec::new();
    }
    all_pods
        .iter()
        .filter(|pod| selector.iter().all(|(k, v)| pod.labels.get(k) == Some(v)))
        .cloned()
        .collect()
}

pub fn all_labels_for_service(
    service: &ClusterService,
    pods: &[ClusterPod],
) -> HashMap<String, String> {
    let mut result = service.labels.clone();
    for pod in pods {
        for (k, v) in &pod.labels {
            result.insert(k.clone(), v.clone());
        }
    }
    result
}

/// Extract the logical service name from a blue-green name.
pub fn service_name_from(name_from_cluster: &str) -> String {
    match BG_REGEXP.captures(name_from_cluster) {
        Some(captures) => captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| name_from_cluster.to_string()),
        None => name_from_cluster.to_string(),
    }
}

pub fn build_base_url(srv: &ClusterService) -> String {
    // TODO: https support
    let mut base_url = format!("http://{}.{}.svc.cluster.local:", srv.name, srv.namespace);
    for port in &srv.ports {
        if port.name == "web"
            || port.name == "http"
            || port.port == 8080
            || port.port == 80
            || port.port == 443
            || port.port == 8443
        {
            base_url.push_str(&port.port.to_string());
            break;
        }
    }
    base_url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ClusterServicePort;

    fn pod(name: &str, labels: &[(&str, &str)]) -> ClusterPod {
        ClusterPod {
            name: name.to_string(),
            labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn blue_green_suffix_is_stripped() {
        assert_eq!(service_name_from("orders-v2"), "orders");
        assert_eq!(service_name_from("orders-v12"), "orders");
        assert_eq!(service_name_from("orders"), "orders");
        assert_eq!(service_name_from("orders-var"), "orders-var");
        assert_eq!(service_name_from("v2"), "v2");
    }

    #[test]
    fn base_url_picks_named_then_numeric_ports() {
        let mut srv = ClusterService {
            name: "svcA".into(),
            namespace: "ns1".into(),
            ..Default::default()
        };
        srv.ports = vec![
            ClusterServicePort { name: "grpc".into(), port: 9090 },
            ClusterServicePort { name: "web".into(), port: 3000 },
        ];
        assert_eq!(build_base_url(&srv), "http://svcA.ns1.svc.cluster.local:3000");

        srv.ports = vec![ClusterServicePort { name: "metrics".into(), port: 8080 }];
        assert_eq!(build_base_url(&srv), "http://svcA.ns1.svc.cluster.local:8080");

        srv.ports = vec![ClusterServicePort { name: "grpc".into(), port: 9090 }];
        assert_eq!(build_base_url(&srv), "http://svcA.ns1.svc.cluster.local:");
    }

    #[test]
    fn selector_requires_every_pair() {
        let pods = vec![
            pod("p1", &[("app", "a"), ("tier", "web")]),
            pod("p2", &[("app", "a")]),
            pod("p3", &[("app", "b"), ("tier", "web")]),
        ];
        let selector: HashMap<String, String> =
            [("app", "a"), ("tier", "web")].iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let matched = pods_for_selector(&pods, &selector);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "p1");
    }

    #[test]
    fn empty_selector_matches_nothing() {
        let pods = vec![pod("p1", &[("app", "a")])];
        assert!(pods_for_selector(&pods, &HashMap::new()).is_empty());
    }

    #[test]
    fn pod_labels_override_service_labels() {
        let srv = ClusterService {
            labels: [("app".to_string(), "svc-val".to_string())].into_iter().collect(),
            ..Default::default()
        };
        let pods = vec![pod("p1", &[("app", "pod-val"), ("extra", "x")])];
        let labels = all_labels_for_service(&srv, &pods);
        assert_eq!(labels.get("app").unwrap(), "pod-val");
        assert_eq!(labels.get("extra").unwrap(), "x");
    }

    use std::time::Duration;

    use crate::client::MockApihubClient;
    use crate::platform::{MockPlatformService, PlatformError};

    fn engine_with(platform: MockPlatformService) -> (Arc<DiscoveryService>, Arc<ServiceListCache>) {
        let platform: Arc<dyn PlatformService> = Arc::new(platform);
        let namespace_cache = Arc::new(NamespaceListCache::new(
            "cloud".to_string(),
            platform.clone(),
            Duration::from_secs(60),
        ));
        let service_cache = Arc::new(ServiceListCache::new());
        let discovery = Arc::new(DiscoveryService::new(
            "cloud".to_string(),
            "agent-ns".to_string(),
            "http://apihub".to_string(),
            Vec::new(),
            Vec::new(),
            namespace_cache,
            service_cache.clone(),
            platform,
            Arc::new(DocumentsDiscoveryService::new(Duration::from_secs(1))),
            Arc::new(MockApihubClient::new()),
        ));
        (discovery, service_cache)
    }

    #[tokio::test]
    async fn service_listing_failure_terminates_the_entry_as_error() {
        let mut platform = MockPlatformService::new();
        platform.expect_get_namespaces().returning(|| Ok(vec!["ns1".to_string()]));
        platform
            .expect_get_service_list()
            .returning(|_| Err(PlatformError::Operation("paas down".to_string())));
        platform.expect_get_pod_list().returning(|_| Ok(Vec::new()));

        let (discovery, service_cache) = engine_with(platform);
        discovery
            .start_discovery(SecurityContext::system(), "ns1", "WS")
            .await
            .unwrap();

        for _ in 0..100 {
            let (_, status, details) = service_cache.get_services_list("ns1", "WS");
            if status == DiscoveryStatus::Error {
                assert!(details.contains("paas down"));
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("entry never reached the error status");
    }

    #[tokio::test]
    async fn unknown_service_is_rejected_by_url_resolution() {
        let mut platform = MockPlatformService::new();
        platform.expect_get_namespaces().returning(|| Ok(vec!["ns1".to_string()]));
        platform.expect_get_service_list().returning(|_| Ok(Vec::new()));

        let (discovery, _) = engine_with(platform);
        let err = discovery.get_service_url("ns1", "ghost").await.unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.code, crate::error::NAMESPACE_SERVICE_DOESNT_EXIST);
    }
}
