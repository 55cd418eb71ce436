//! Kubernetes-backed implementation of the platform interface.

use std::collections::HashMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use tracing::debug;

use super::{ClusterPod, ClusterRoute, ClusterService, ClusterServicePort, PlatformError, PlatformService};

pub struct KubePlatformService {
    client: Client,
    route_resource: ApiResource,
}

impl KubePlatformService {
    /// Build from the in-cluster (or kubeconfig) environment.
    pub async fn new() -> anyhow::Result<Self> {
        let client = Client::try_default().await?;
        let gvk = GroupVersionKind::gvk("route.openshift.io", "v1", "Route");
        Ok(KubePlatformService { client, route_resource: ApiResource::from_gvk(&gvk) })
    }
}

fn map_kube_error(err: kube::Error) -> PlatformError {
    match &err {
        kube::Error::Api(resp) if resp.code == 403 => PlatformError::Forbidden(err.to_string()),
        _ => PlatformError::Operation(err.to_string()),
    }
}

fn string_map(map: Option<&std::collections::BTreeMap<String, String>>) -> HashMap<String, String> {
    map.map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

#[async_trait]
impl PlatformService for KubePlatformService {
    async fn get_namespaces(&self) -> Result<Vec<String>, PlatformError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(map_kube_error)?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn get_service_list(&self, namespace: &str) -> Result<Vec<ClusterService>, PlatformError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await.map_err(map_kube_error)?;
        let mut services = Vec::with_capacity(list.items.len());
        for item in list.items {
            let name = match item.metadata.name {
                Some(name) => name,
                None => continue,
            };
            let spec = item.spec.unwrap_or_default();
            services.push(ClusterService {
                name,
                namespace: namespace.to_string(),
                labels: string_map(item.metadata.labels.as_ref()),
                annotations: string_map(item.metadata.annotations.as_ref()),
                selector: string_map(spec.selector.as_ref()),
                ports: spec
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| ClusterServicePort { name: p.name.unwrap_or_default(), port: p.port })
                    .collect(),
            });
        }
        Ok(services)
    }

    async fn get_pod_list(&self, namespace: &str) -> Result<Vec<ClusterPod>, PlatformError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await.map_err(map_kube_error)?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|pod| {
                pod.metadata.name.map(|name| ClusterPod {
                    name,
                    labels: string_map(pod.metadata.labels.as_ref()),
                })
            })
            .collect())
    }

    async fn get_route(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ClusterRoute>, PlatformError> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.route_resource);
        let route = match api.get_opt(name).await.map_err(map_kube_error)? {
            Some(route) => route,
            None => {
                debug!("Route {} not found in namespace {}", name, namespace);
                return Ok(None);
            }
        };
        let host = route
            .data
            .get("spec")
            .and_then(|spec| spec.get("host"))
            .and_then(|host| host.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(Some(ClusterRoute {
            name: route.metadata.name.unwrap_or_else(|| name.to_string()),
            namespace: namespace.to_string(),
            host,
        }))
    }
}
