use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::cache::{NamespaceListCache, ServiceListCache};
use crate::client::ApihubClient;
use crate::config::AgentConfig;
use crate::discovery::cloud::CloudService;
use crate::discovery::document::DocumentService;
use crate::discovery::documents::DocumentsDiscoveryService;
use crate::discovery::engine::DiscoveryService;
use crate::discovery::list::ListService;
use crate::discovery::routes::RoutesService;
use crate::platform::PlatformService;
use crate::registration::{DisablingService, RegistrationService};
use crate::security::AuthManager;
use crate::task::spawn_safe;

const NAMESPACE_CACHE_TTL: Duration = Duration::from_secs(60);
const CLOUD_DISCOVERY_POLL: Duration = Duration::from_secs(5);

/// Startup gate flipped once the initial platform checks pass.
#[derive(Debug, Default)]
pub struct HealthState {
    startup_ok: AtomicBool,
}

impl HealthState {
    pub fn startup_ok(&self) -> bool {
        self.startup_ok.load(Ordering::Acquire)
    }

    pub fn set_startup_ok(&self, ok: bool) {
        self.startup_ok.store(ok, Ordering::Release);
    }
}

/// Shared application state (thread-safe).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub platform: Arc<dyn PlatformService>,
    pub apihub: Arc<dyn ApihubClient>,
    pub namespace_cache: Arc<NamespaceListCache>,
    pub service_cache: Arc<ServiceListCache>,
    pub discovery: Arc<DiscoveryService>,
    pub cloud: Arc<CloudService>,
    pub document_service: Arc<DocumentService>,
    pub list_service: Arc<ListService>,
    pub routes_service: Arc<RoutesService>,
    pub disabling: Arc<DisablingService>,
    pub auth: Arc<AuthManager>,
    pub health: Arc<HealthState>,
}

impl AppState {
    pub fn new(
        config: AgentConfig,
        platform: Arc<dyn PlatformService>,
        apihub: Arc<dyn ApihubClient>,
        auth: Arc<AuthManager>,
    ) -> Self {
        let config = Arc::new(config);
        let disabling = Arc::new(DisablingService::new());
        let namespace_cache = Arc::new(NamespaceListCache::new(
            config.cloud_name.clone(),
            platform.clone(),
            NAMESPACE_CACHE_TTL,
        ));
        let service_cache = Arc::new(ServiceListCache::new());
        let documents_discovery = Arc::new(DocumentsDiscoveryService::new(config.discovery_timeout()));
        let discovery = Arc::new(DiscoveryService::new(
            config.cloud_name.clone(),
            config.namespace.clone(),
            config.apihub_url.clone(),
            config.discovery_exclude_labels.clone(),
            config.discovery_grouping_labels.clone(),
            namespace_cache.clone(),
            service_cache.clone(),
            platform.clone(),
            documents_discovery,
            apihub.clone(),
        ));
        let cloud = Arc::new(CloudService::new(
            discovery.clone(),
            service_cache.clone(),
            namespace_cache.clone(),
            CLOUD_DISCOVERY_POLL,
        ));
        let document_service =
            Arc::new(DocumentService::new(service_cache.clone(), config.discovery_timeout()));
        let list_service = Arc::new(ListService::new(
            config.cloud_name.clone(),
            config.namespace.clone(),
            config.discovery_exclude_labels.clone(),
            platform.clone(),
        ));
        let routes_service = Arc::new(RoutesService::new(platform.clone()));

        AppState {
            config,
            platform,
            apihub,
            namespace_cache,
            service_cache,
            discovery,
            cloud,
            document_service,
            list_service,
            routes_service,
            disabling,
            auth,
            health: Arc::new(HealthState::default()),
        }
    }

    /// Kick off background work: registration keepalive and the startup
    /// checks gating `/startup`.
    pub fn start_background_tasks(&self) {
        let registration = Arc::new(RegistrationService::new(
            self.config.cloud_name.clone(),
            self.config.namespace.clone(),
            self.config.agent_url.clone(),
            self.config.artifact_descriptor_version.clone(),
            self.config.agent_name.clone(),
            self.apihub.clone(),
            self.disabling.clone(),
        ));
        registration.run_agent_registration_process();

        let namespace_cache = self.namespace_cache.clone();
        let health = self.health.clone();
        spawn_safe(async move {
            info!("Executing startup check 'list namespaces'");
            let ok = match namespace_cache.list_namespaces().await {
                Ok(_) => true,
                Err(e) => {
                    error!("Failed to list namespaces: {}", e);
                    false
                }
            };
            info!("Startup check 'list namespaces' returned result: {}", ok);
            health.set_startup_ok(ok);
        });
    }
}
