//! Cloud-wide discovery across all namespaces.
//!
//! Namespaces run strictly one by one: parallel runs used to starve the
//! network and produced incomplete documents, so each namespace must
//! leave the running state before the next one starts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::cache::{NamespaceListCache, ServiceListCache};
use crate::error::CustomError;
use crate::model::service::{AllServiceListResponse, DiscoveryStatus, ServiceListResponse};
use crate::secctx::SecurityContext;
use crate::task::spawn_safe;

use super::engine::DiscoveryService;

#[derive(Debug, Default)]
struct CloudRunState {
    status: DiscoveryStatus,
    errors: Vec<String>,
    started: Option<Instant>,
    finished: Option<Instant>,
}

pub struct CloudService {
    discovery: Arc<DiscoveryService>,
    service_cache: Arc<ServiceListCache>,
    namespace_cache: Arc<NamespaceListCache>,
    poll_interval: Duration,
    state: Mutex<CloudRunState>,
}

impl CloudService {
    pub fn new(
        discovery: Arc<DiscoveryService>,
        service_cache: Arc<ServiceListCache>,
        namespace_cache: Arc<NamespaceListCache>,
        poll_interval: Duration,
    ) -> Self {
        CloudService {
            discovery,
            service_cache,
            namespace_cache,
            poll_interval,
            state: Mutex::new(CloudRunState::default()),
        }
    }

    pub fn start_all_discovery(
        self: &Arc<Self>,
        ctx: SecurityContext,
        workspace_id: &str,
    ) -> Result<(), CustomError> {
        {
            let mut state = self.state.lock();
            match state.status {
                DiscoveryStatus::None => info!("Starting all namespaces discovery"),
                DiscoveryStatus::Running => {
                    info!("Do not start all discovery since it's already running");
                    return Ok(());
                }
                DiscoveryStatus::Complete | DiscoveryStatus::Error => {
                    info!("Restarting all namespaces discovery")
                }
            }
            state.status = DiscoveryStatus::Running;
            state.errors.clear();
            state.started = Some(Instant::now());
            state.finished = None;
        }

        let this = self.clone();
        let workspace_id = workspace_id.to_string();
        spawn_safe(async move {
            this.run_all_discovery_one_by_one(ctx, &workspace_id).await;
        });
        Ok(())
    }

    async fn run_all_discovery_one_by_one(self: &Arc<Self>, ctx: SecurityContext, workspace_id: &str) {
        let namespaces = match self.namespace_cache.list_namespaces().await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                error!("Unable to start all discovery: failed to list namespaces: {}", e);
                let mut state = self.state.lock();
                state.status = DiscoveryStatus::Error;
                state
                    .errors
                    .push(format!("Unable to start all discovery: failed to list namespaces: {e}"));
                state.finished = Some(Instant::now());
                return;
            }
        };

        info!("Clearing services cache");
        for ns in &namespaces {
            self.service_cache.clear_results_for_namespace(ns, workspace_id);
        }

        info!("Namespaces to discover: {:?}", namespaces);
        for ns in &namespaces {
            if let Err(e) = self.discovery.start_discovery(ctx.clone(), ns, workspace_id).await {
                error!("Failed to start discovery for namespace {}: {}", ns, e);
                self.state
                    .lock()
                    .errors
                    .push(format!("failed to start discovery for namespace {ns}: {e}"));
                continue;
            }
            self.wait_for_namespace(ns, workspace_id).await;
        }

        let mut state = self.state.lock();
        state.status = if state.errors.is_empty() {
            DiscoveryStatus::Complete
        } else {
            DiscoveryStatus::Error
        };
        state.finished = Some(Instant::now());
    }

    async fn wait_for_namespace(&self, ns: &str, workspace_id: &str) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            let (_, status, details) = self.service_cache.get_services_list(ns, workspace_id);
            match status {
                DiscoveryStatus::Running | DiscoveryStatus::None => {
                    debug!("waitForNamespace {} running", ns);
                }
                DiscoveryStatus::Error => {
                    debug!("waitForNamespace {} error", ns);
                    self.state
                        .lock()
                        .errors
                        .push(format!("failed discovery for namespace {ns}: {details}"));
                    return;
                }
                DiscoveryStatus::Complete => {
                    debug!("waitForNamespace {} complete", ns);
                    return;
                }
            }
        }
    }

    #[cfg(test)]
    fn status(&self) -> DiscoveryStatus {
        self.state.lock().status
    }

    pub async fn get_all_services_list(&self, workspace_id: &str) -> AllServiceListResponse {
        let mut result = AllServiceListResponse::default();
        {
            let state = self.state.lock();
            result.status = state.status;
        }

        if result.status == DiscoveryStatus::None {
            return result;
        }

        let namespaces = match self.namespace_cache.list_namespaces().await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                result.status = DiscoveryStatus::Error;
                result.debug = format!("Unable to get all discovery status: failed to list namespaces: {e}");
                return result;
            }
        };

        let mut namespace_data = HashMap::new();
        for ns in &namespaces {
            let (services, status, details) = self.service_cache.get_services_list(ns, workspace_id);
            namespace_data.insert(
                ns.clone(),
                ServiceListResponse { services, status, debug: details },
            );
        }

        result.total_namespaces = namespace_data.len();
        let mut completed = 0;
        for data in namespace_data.values() {
            if data.status == DiscoveryStatus::Complete || data.status == DiscoveryStatus::Error {
                completed += 1;
            }
            result.total_services += data.services.len();
            for svc in &data.services {
                if svc.baseline.is_some() {
                    result.total_services_with_baselines += 1;
                }
                result.total_documents += svc.documents.len();
            }
        }
        result.progress = format!("{}/{}", completed, result.total_namespaces);

        {
            let state = self.state.lock();
            result.debug = state.errors.join(" | ");
            result.elapsed_sec = match (state.started, state.finished) {
                (Some(started), Some(finished)) => finished.duration_since(started).as_secs(),
                (Some(started), None) => started.elapsed().as_secs(),
                _ => 0,
            };
        }
        result.namespace_data = namespace_data;

        result
    }
}
