//! Periodic keepalive to the registry plus the global disabling gate it
//! toggles when the registry expects a different agent version.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use semver::Version;
use tracing::{error, warn};

use crate::client::ApihubClient;
use crate::error::{CustomError, AGENT_VERSION};
use crate::model::registration::AgentKeepaliveMessage;
use crate::task::spawn_safe;

const AGENTS_BACKEND_EXTENSION_NAME: &str = "agents-backend";
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Global serving gate. While disabled, every request outside the health
/// endpoints is answered with the version-mismatch error.
#[derive(Debug, Default)]
pub struct DisablingService {
    state: RwLock<DisablingState>,
}

#[derive(Debug, Default)]
struct DisablingState {
    disabled: bool,
    apihub_version: String,
}

impl DisablingService {
    pub fn new() -> Self {
        DisablingService::default()
    }

    pub fn disabling_status(&self) -> Option<CustomError> {
        let state = self.state.read();
        if state.disabled {
            Some(CustomError::agent_version_mismatch(&state.apihub_version))
        } else {
            None
        }
    }

    pub fn disable_services(&self, disable: bool, apihub_version: &str) {
        let mut state = self.state.write();
        state.disabled = disable;
        state.apihub_version = apihub_version.to_string();
    }
}

pub struct RegistrationService {
    cloud_name: String,
    namespace: String,
    agent_url: String,
    backend_version: String,
    agent_name: String,

    apihub: Arc<dyn ApihubClient>,
    disabling: Arc<DisablingService>,
    agents_backend_path_prefix: RwLock<String>,
}

impl RegistrationService {
    pub fn new(
        cloud_name: String,
        namespace: String,
        agent_url: String,
        backend_version: String,
        agent_name: String,
        apihub: Arc<dyn ApihubClient>,
        disabling: Arc<DisablingService>,
    ) -> Self {
        RegistrationService {
            cloud_name,
            namespace,
            agent_url,
            backend_version,
            agent_name,
            apihub,
            disabling,
            agents_backend_path_prefix: RwLock::new(String::new()),
        }
    }

    pub fn run_agent_registration_process(self: Arc<Self>) {
        spawn_safe(async move {
            let message = AgentKeepaliveMessage {
                agent_deployment_cloud: self.cloud_name.clone(),
                agent_deployment_namespace: self.namespace.clone(),
                agent_url: self.agent_url.clone(),
                backend_version: self.backend_version.clone(),
                agent_name: self.agent_name.clone(),
                agent_version: AGENT_VERSION.to_string(),
            };
            let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let this = self.clone();
                let message = message.clone();
                spawn_safe(async move {
                    this.registration_tick(&message).await;
                });
            }
        });
    }

    async fn registration_tick(&self, message: &AgentKeepaliveMessage) {
        let path_prefix = self.agents_backend_path_prefix.read().clone();
        let path_prefix = if path_prefix.is_empty() {
            let configuration = match self.apihub.get_system_configuration().await {
                Ok(configuration) => configuration,
                Err(e) => {
                    error!("Registration failed: {}", e);
                    return;
                }
            };
            let prefix = configuration
                .extensions
                .iter()
                .find(|ext| ext.name == AGENTS_BACKEND_EXTENSION_NAME)
                .map(|ext| ext.path_prefix.clone());
            match prefix {
                Some(prefix) => {
                    *self.agents_backend_path_prefix.write() = prefix.clone();
                    prefix
                }
                None => {
                    error!("Registration failed: agents-backend is not registered as an extension in APIHUB");
                    return;
                }
            }
        } else {
            path_prefix
        };

        let version = match self.apihub.send_keepalive(&path_prefix, message).await {
            Ok(version) => version,
            Err(e) => {
                error!("Failed to send registration message: {}", e);
                return;
            }
        };

        self.disabling
            .disable_services(!is_agent_compatible_with_apihub(&version), &version);
    }
}

/// Equal versions are compatible, an empty remote or a different major
/// is not; minor/patch drift only warrants a warning.
pub fn is_agent_compatible_with_apihub(apihub_agent_version: &str) -> bool {
    if apihub_agent_version == AGENT_VERSION {
        return true;
    }
    if apihub_agent_version.is_empty() {
        error!(
            "Current version {} of Agent is incompatible with APIHUB (APIHUB is probably outdated). \
             Please, contact your System Administrator to update this Agent instance.",
            AGENT_VERSION
        );
        return false;
    }
    let (agent, apihub) = match (Version::parse(AGENT_VERSION), Version::parse(apihub_agent_version)) {
        (Ok(agent), Ok(apihub)) => (agent, apihub),
        _ => {
            error!(
                "Current version {} of Agent is incompatible with APIHUB. Please, contact your \
                 System Administrator to update this Agent instance to version {}.",
                AGENT_VERSION, apihub_agent_version
            );
            return false;
        }
    };
    if agent.major != apihub.major {
        error!(
            "Current version {} of Agent is incompatible with APIHUB. Please, contact your System \
             Administrator to update this Agent instance to version {}.",
            AGENT_VERSION, apihub_agent_version
        );
        return false;
    }
    if agent.minor != apihub.minor || agent.patch != apihub.patch {
        warn!(
            "Difference in minor/patch version of Agent detected. We recommend to contact your \
             System Administrator to update this Agent instance to version {}.",
            apihub_agent_version
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions_are_compatible() {
        assert!(is_agent_compatible_with_apihub(AGENT_VERSION));
    }

    #[test]
    fn empty_remote_version_is_incompatible() {
        assert!(!is_agent_compatible_with_apihub(""));
    }

    #[test]
    fn major_mismatch_is_incompatible() {
        assert!(!is_agent_compatible_with_apihub("2.0.0"));
    }

    #[test]
    fn minor_and_patch_drift_is_tolerated() {
        assert!(is_agent_compatible_with_apihub("1.1.0"));
        assert!(is_agent_compatible_with_apihub("1.0.7"));
    }

    #[test]
    fn unparseable_remote_version_is_incompatible() {
        assert!(!is_agent_compatible_with_apihub("not-a-version"));
    }

    #[test]
    fn disabling_gate_round_trip() {
        let gate = DisablingService::new();
        assert!(gate.disabling_status().is_none());

        gate.disable_services(true, "2.0.0");
        let err = gate.disabling_status().expect("gate must be closed");
        assert_eq!(err.status, 503);
        assert_eq!(err.params["recommended"], "2.0.0");

        gate.disable_services(false, "1.0.0");
        assert!(gate.disabling_status().is_none());
    }

    use crate::client::MockApihubClient;
    use crate::model::package::{Extension, SystemConfiguration};

    fn registration_with(apihub: MockApihubClient) -> (RegistrationService, Arc<DisablingService>) {
        let disabling = Arc::new(DisablingService::new());
        let service = RegistrationService::new(
            "cloud".to_string(),
            "agent-ns".to_string(),
            "http://agent:8080".to_string(),
            "unknown".to_string(),
            "agent".to_string(),
            Arc::new(apihub),
            disabling.clone(),
        );
        (service, disabling)
    }

    fn keepalive_message() -> AgentKeepaliveMessage {
        AgentKeepaliveMessage {
            agent_deployment_cloud: "cloud".to_string(),
            agent_deployment_namespace: "agent-ns".to_string(),
            agent_url: "http://agent:8080".to_string(),
            backend_version: "unknown".to_string(),
            agent_name: "agent".to_string(),
            agent_version: AGENT_VERSION.to_string(),
        }
    }

    fn configuration_with_extension() -> SystemConfiguration {
        SystemConfiguration {
            default_workspace_id: "WS".to_string(),
            extensions: vec![Extension {
                name: "agents-backend".to_string(),
                base_url: String::new(),
                path_prefix: "/apihub-nc".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn matching_version_keeps_the_gate_open() {
        let mut apihub = MockApihubClient::new();
        apihub
            .expect_get_system_configuration()
            .times(1)
            .returning(|| Ok(configuration_with_extension()));
        apihub
            .expect_send_keepalive()
            .withf(|prefix, _| prefix == "/apihub-nc")
            .times(2)
            .returning(|_, _| Ok(AGENT_VERSION.to_string()));

        let (service, disabling) = registration_with(apihub);
        let message = keepalive_message();
        service.registration_tick(&message).await;
        assert!(disabling.disabling_status().is_none());

        // the extension path prefix is resolved once and then cached
        service.registration_tick(&message).await;
        assert!(disabling.disabling_status().is_none());
    }

    #[tokio::test]
    async fn major_version_mismatch_disables_serving() {
        let mut apihub = MockApihubClient::new();
        apihub
            .expect_get_system_configuration()
            .returning(|| Ok(configuration_with_extension()));
        apihub.expect_send_keepalive().returning(|_, _| Ok("2.0.0".to_string()));

        let (service, disabling) = registration_with(apihub);
        service.registration_tick(&keepalive_message()).await;

        let err = disabling.disabling_status().expect("gate must close on mismatch");
        assert_eq!(err.code, crate::error::AGENT_VERSION_MISMATCH);
        assert_eq!(err.params["recommended"], "2.0.0");
    }

    #[tokio::test]
    async fn missing_extension_skips_the_keepalive() {
        let mut apihub = MockApihubClient::new();
        apihub
            .expect_get_system_configuration()
            .returning(|| Ok(SystemConfiguration::default()));
        apihub.expect_send_keepalive().never();

        let (service, disabling) = registration_with(apihub);
        service.registration_tick(&keepalive_message()).await;
        assert!(disabling.disabling_status().is_none());
    }
}
