use serde::{Deserialize, Serialize};

/// Keepalive wire format POSTed to the registry every registration tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentKeepaliveMessage {
    #[serde(rename = "cloud")]
    pub agent_deployment_cloud: String,
    #[serde(rename = "namespace")]
    pub agent_deployment_namespace: String,
    #[serde(rename = "url")]
    pub agent_url: String,
    #[serde(rename = "backendVersion")]
    pub backend_version: String,
    #[serde(rename = "name")]
    pub agent_name: String,
    #[serde(rename = "agentVersion")]
    pub agent_version: String,
}

/// The registry answers a keepalive with the agent version it expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeepaliveResponse {
    #[serde(default)]
    pub version: String,
}
