//! Service listings that bypass the discovery cache: name/id pairs and
//! detailed items straight from the live platform state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::CustomError;
use crate::model::service::{ServiceItem, ServiceNameItem};
use crate::platform::PlatformService;

use super::engine::{all_labels_for_service, build_base_url, pods_for_selector, service_name_from};
use super::{make_agent_id, make_custom_proxy_path};

pub struct ListService {
    cloud_name: String,
    agent_namespace: String,
    exclude_labels: Vec<String>,
    platform: Arc<dyn PlatformService>,
}

impl ListService {
    pub fn new(
        cloud_name: String,
        agent_namespace: String,
        exclude_labels: Vec<String>,
        platform: Arc<dyn PlatformService>,
    ) -> Self {
        ListService { cloud_name, agent_namespace, exclude_labels, platform }
    }

    pub async fn list_service_names(&self, namespace: &str) -> Result<Vec<ServiceNameItem>, CustomError> {
        let list = self
            .platform
            .get_service_list(namespace)
            .await
            .map_err(CustomError::from)?;
        Ok(list
            .into_iter()
            .map(|svc| ServiceNameItem { name: service_name_from(&svc.name), id: svc.name })
            .collect())
    }

    pub async fn list_service_items(&self, namespace: &str) -> Result<Vec<ServiceItem>, CustomError> {
        let (services, pods) = tokio::join!(
            self.platform.get_service_list(namespace),
            self.platform.get_pod_list(namespace)
        );
        let services = services.map_err(CustomError::from)?;
        let pods = pods.map_err(CustomError::from)?;

        let agent_id = make_agent_id(&self.cloud_name, &self.agent_namespace);

        let mut result = Vec::new();
        for srv in services {
            let service_pods = pods_for_selector(&pods, &srv.selector);
            let labels = all_labels_for_service(&srv, &service_pods);
            debug!("Full list of labels for service {}: {:?}", srv.name, labels);

            if self.exclude_labels.iter().any(|label| labels.contains_key(label)) {
                info!("Service {} is excluded from discovery", srv.name);
                continue;
            }

            let service_id = srv.name.clone();
            result.push(ServiceItem {
                id: service_id.clone(),
                namespace: namespace.to_string(),
                name: service_name_from(&service_id),
                url: build_base_url(&srv),
                labels,
                annotations: srv.annotations.clone(),
                pods: service_pods.iter().map(|p| p.name.clone()).collect(),
                proxy_server_url: make_custom_proxy_path(&agent_id, namespace, &service_id),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ClusterPod, ClusterService, MockPlatformService, PlatformError};

    fn svc(name: &str) -> ClusterService {
        ClusterService { name: name.to_string(), namespace: "ns1".to_string(), ..Default::default() }
    }

    #[tokio::test]
    async fn names_strip_blue_green_suffix() {
        let mut platform = MockPlatformService::new();
        platform
            .expect_get_service_list()
            .returning(|_| Ok(vec![svc("orders-v3"), svc("billing")]));

        let list = ListService::new("c".into(), "ns".into(), vec![], Arc::new(platform));
        let names = list.list_service_names("ns1").await.unwrap();
        assert_eq!(names[0].id, "orders-v3");
        assert_eq!(names[0].name, "orders");
        assert_eq!(names[1].name, "billing");
    }

    #[tokio::test]
    async fn forbidden_platform_error_maps_to_catalog_entry() {
        let mut platform = MockPlatformService::new();
        platform
            .expect_get_service_list()
            .returning(|_| Err(PlatformError::Forbidden("rbac".into())));

        let list = ListService::new("c".into(), "ns".into(), vec![], Arc::new(platform));
        let err = list.list_service_names("ns1").await.unwrap_err();
        assert_eq!(err.status, 424);
        assert_eq!(err.code, crate::error::PAAS_OPERATION_FAILED_FORBIDDEN);
    }

    #[tokio::test]
    async fn excluded_services_are_missing_from_items() {
        let mut excluded = svc("gw");
        excluded.labels.insert("facadeGateway".into(), "true".into());
        let mut platform = MockPlatformService::new();
        platform
            .expect_get_service_list()
            .returning(move |_| Ok(vec![svc("app"), excluded.clone()]));
        platform.expect_get_pod_list().returning(|_| Ok(Vec::<ClusterPod>::new()));

        let list = ListService::new(
            "c".into(),
            "ns".into(),
            vec!["facadeGateway".into()],
            Arc::new(platform),
        );
        let items = list.list_service_items("ns1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "app");
        assert_eq!(items[0].proxy_server_url, "/agents/c_ns/namespaces/ns1/services/app/proxy/");
    }
}
