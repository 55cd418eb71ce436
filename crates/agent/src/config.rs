use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

static SLUG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[a-zA-Z0-9_-]+$").unwrap());

/// Agent configuration. Field names map 1:1 to the environment surface
/// (`APIHUB_URL`, `CLOUD_NAME`, `DISCOVERY_EXCLUDE_LABELS`, …).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub apihub_url: String,
    pub apihub_access_token: String,
    pub agent_url: String,
    pub agent_name: String,
    pub cloud_name: String,
    pub namespace: String,
    /// Services carrying any of these label keys are skipped entirely.
    pub discovery_exclude_labels: Vec<String>,
    /// Label keys propagated onto discovered service snapshots.
    pub discovery_grouping_labels: Vec<String>,
    pub discovery_timeout_sec: u64,
    pub listen_address: String,
    pub origin_allowed: String,
    pub log_level: String,
    pub log_file_path: String,
    /// Skip authentication on the service proxy.
    pub insecure_proxy: bool,
    /// Replace the cluster API client with a stub (local runs, CI).
    pub stub_pm: bool,
    pub base_path: String,
    pub artifact_descriptor_version: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            apihub_url: "https://qubership.localhost".to_string(),
            apihub_access_token: String::new(),
            agent_url: String::new(),
            agent_name: String::new(),
            cloud_name: "unknown".to_string(),
            namespace: "unknown".to_string(),
            discovery_exclude_labels: vec!["facadeGateway".to_string()],
            discovery_grouping_labels: vec![
                "app.kubernetes.io/part-of".to_string(),
                "app_name".to_string(),
                "application".to_string(),
                "app.kubernetes.io/version".to_string(),
                "version".to_string(),
            ],
            discovery_timeout_sec: 15,
            listen_address: ":8080".to_string(),
            origin_allowed: String::new(),
            log_level: "info".to_string(),
            log_file_path: String::new(),
            insecure_proxy: false,
            stub_pm: false,
            base_path: ".".to_string(),
            artifact_descriptor_version: "unknown".to_string(),
        }
    }
}

impl AgentConfig {
    /// Load configuration: compile-time defaults, then an optional YAML
    /// file, then environment variables on top.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = config::Config::try_from(&AgentConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        // Optional config files, production location first
        for path in ["/etc/apihub-agent/config", "config/agent"] {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Environment variables override everything; CSV lists split here
        builder = builder.add_source(
            config::Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("discovery_exclude_labels")
                .with_list_parse_key("discovery_grouping_labels"),
        );

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        if !SLUG_PATTERN.is_match(&self.cloud_name) {
            anyhow::bail!("CLOUD_NAME '{}' is not a valid slug", self.cloud_name);
        }
        if !SLUG_PATTERN.is_match(&self.namespace) {
            anyhow::bail!("NAMESPACE '{}' is not a valid slug", self.namespace);
        }
        self.listen_addr().context("Invalid LISTEN_ADDRESS")?;
        if self.discovery_timeout_sec == 0 {
            anyhow::bail!("DISCOVERY_TIMEOUT_SEC must be positive");
        }
        Ok(())
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_sec)
    }

    /// A bare `:8080` binds all interfaces.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };
        addr.parse::<SocketAddr>()
            .with_context(|| format!("cannot parse listen address '{}'", self.listen_address))
    }

    pub fn print(&self) {
        info!("Loaded configuration:");
        info!("apihubUrl={}", self.apihub_url);
        info!(
            "apihubAccessToken={}",
            if self.apihub_access_token.is_empty() { "" } else { "*****" }
        );
        info!("agentUrl={}", self.agent_url);
        info!("agentName={}", self.agent_name);
        info!("cloudName={}", self.cloud_name);
        info!("namespace={}", self.namespace);
        info!("discoveryExcludeLabels={:?}", self.discovery_exclude_labels);
        info!("discoveryGroupingLabels={:?}", self.discovery_grouping_labels);
        info!("discoveryTimeoutSec={}", self.discovery_timeout_sec);
        info!("listenAddress={}", self.listen_address);
        info!("insecureProxy={}", self.insecure_proxy);
        info!("stubPm={}", self.stub_pm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_contract() {
        let config = AgentConfig::default();
        assert_eq!(config.apihub_url, "https://qubership.localhost");
        assert_eq!(config.cloud_name, "unknown");
        assert_eq!(config.namespace, "unknown");
        assert_eq!(config.discovery_timeout_sec, 15);
        assert_eq!(config.discovery_exclude_labels, vec!["facadeGateway"]);
    }

    #[test]
    fn bare_port_listen_address_binds_all_interfaces() {
        let config = AgentConfig::default();
        assert_eq!(config.listen_addr().unwrap().port(), 8080);
        assert!(config.listen_addr().unwrap().ip().is_unspecified());
    }

    #[test]
    fn slug_validation_rejects_spaces() {
        let mut config = AgentConfig::default();
        config.cloud_name = "my cloud".to_string();
        assert!(config.validate().is_err());
        config.cloud_name = "my-cloud_1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = AgentConfig::default();
        config.discovery_timeout_sec = 0;
        assert!(config.validate().is_err());
    }
}
