use async_trait::async_trait;

use super::{ClusterPod, ClusterRoute, ClusterService, PlatformError, PlatformService};

/// Cluster-less stand-in used when `STUB_PM` is set: local runs and CI
/// don't have a cluster API to talk to.
#[derive(Debug, Default)]
pub struct StubPlatformService;

#[async_trait]
impl PlatformService for StubPlatformService {
    async fn get_namespaces(&self) -> Result<Vec<String>, PlatformError> {
        Ok(Vec::new())
    }

    async fn get_service_list(&self, _namespace: &str) -> Result<Vec<ClusterService>, PlatformError> {
        Ok(Vec::new())
    }

    async fn get_pod_list(&self, _namespace: &str) -> Result<Vec<ClusterPod>, PlatformError> {
        Ok(Vec::new())
    }

    async fn get_route(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<ClusterRoute>, PlatformError> {
        Ok(None)
    }
}
