use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use agent::client::HttpApihubClient;
use agent::config::AgentConfig;
use agent::platform::{
    ClusterPod, ClusterRoute, ClusterService, PlatformError, PlatformService,
};
use agent::security::AuthManager;
use agent::state::AppState;

/// In-memory platform used by the integration tests.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub namespaces: Vec<String>,
    pub services: HashMap<String, Vec<ClusterService>>,
    pub pods: HashMap<String, Vec<ClusterPod>>,
    pub routes: HashMap<(String, String), ClusterRoute>,
}

#[async_trait]
impl PlatformService for FakePlatform {
    async fn get_namespaces(&self) -> Result<Vec<String>, PlatformError> {
        Ok(self.namespaces.clone())
    }

    async fn get_service_list(&self, namespace: &str) -> Result<Vec<ClusterService>, PlatformError> {
        Ok(self.services.get(namespace).cloned().unwrap_or_default())
    }

    async fn get_pod_list(&self, namespace: &str) -> Result<Vec<ClusterPod>, PlatformError> {
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn get_route(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ClusterRoute>, PlatformError> {
        Ok(self.routes.get(&(namespace.to_string(), name.to_string())).cloned())
    }
}

pub fn test_config(apihub_url: &str) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.apihub_url = apihub_url.to_string();
    config.apihub_access_token = "agent-token".to_string();
    config.cloud_name = "k8s".to_string();
    config.namespace = "agent-ns".to_string();
    config.discovery_timeout_sec = 2;
    config
}

pub fn build_state(config: AgentConfig, platform: FakePlatform) -> AppState {
    let apihub = Arc::new(HttpApihubClient::new(
        config.apihub_url.clone(),
        config.apihub_access_token.clone(),
    ));
    // key bytes are irrelevant until a JWT is actually presented
    let auth = Arc::new(AuthManager::from_rsa_der(apihub.clone(), &[48, 130, 1, 10]).unwrap());
    AppState::new(config, Arc::new(platform), apihub, auth)
}
