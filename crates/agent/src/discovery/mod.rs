//! Discovery: per-service document probing, the namespace engine, the
//! cloud-wide orchestrator and on-demand document retrieval.

pub mod cloud;
pub mod document;
pub mod documents;
pub mod engine;
pub mod list;
pub mod routes;

/// Path template of the service reverse proxy. `agentId` is
/// `lower(cloud)_lower(namespace)`.
pub const PROXY_PATH: &str = "/agents/{agentId}/namespaces/{name}/services/{serviceId}/proxy/";

pub fn make_agent_id(cloud: &str, agent_namespace: &str) -> String {
    format!("{}_{}", cloud.to_lowercase(), agent_namespace.to_lowercase())
}

pub fn make_custom_proxy_path(agent_id: &str, namespace: &str, service_id: &str) -> String {
    PROXY_PATH
        .replace("{agentId}", agent_id)
        .replace("{name}", namespace)
        .replace("{serviceId}", service_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_is_lowercased() {
        assert_eq!(make_agent_id("K8S", "Dev-NS"), "k8s_dev-ns");
    }

    #[test]
    fn proxy_path_substitutes_template_params() {
        assert_eq!(
            make_custom_proxy_path("k8s_ns", "ns1", "svcA"),
            "/agents/k8s_ns/namespaces/ns1/services/svcA/proxy/"
        );
    }
}
