use dashmap::DashMap;
use tracing::warn;

use crate::model::service::{DiscoveryStatus, Service};

const KEY_SEP: &str = "@||@";

#[derive(Debug, Default, Clone)]
struct CacheEntry {
    services: Vec<Service>,
    status: DiscoveryStatus,
    details: String,
}

/// Discovery state per (namespace, workspace): the running/completed
/// service list plus status and diagnostic details.
///
/// Probe workers append concurrently; the terminal transition only fires
/// while the entry is still running, so a late worker can never overwrite
/// a terminal verdict. Entries never expire: a running discovery must
/// not be evicted and everything is rebuilt on restart anyway.
#[derive(Debug, Default)]
pub struct ServiceListCache {
    entries: DashMap<String, CacheEntry>,
}

fn entry_key(namespace: &str, workspace_id: &str) -> String {
    format!("{namespace}{KEY_SEP}{workspace_id}")
}

impl ServiceListCache {
    pub fn new() -> Self {
        ServiceListCache { entries: DashMap::new() }
    }

    pub fn get_services_list(
        &self,
        namespace: &str,
        workspace_id: &str,
    ) -> (Vec<Service>, DiscoveryStatus, String) {
        match self.entries.get(&entry_key(namespace, workspace_id)) {
            Some(entry) => (entry.services.clone(), entry.status, entry.details.clone()),
            None => (Vec::new(), DiscoveryStatus::None, String::new()),
        }
    }

    pub fn handle_discovery_start(&self, namespace: &str, workspace_id: &str) {
        self.entries.insert(
            entry_key(namespace, workspace_id),
            CacheEntry { services: Vec::new(), status: DiscoveryStatus::Running, details: String::new() },
        );
    }

    pub fn clear_results_for_namespace(&self, namespace: &str, workspace_id: &str) {
        self.entries.insert(entry_key(namespace, workspace_id), CacheEntry::default());
    }

    pub fn add_service(&self, namespace: &str, workspace_id: &str, service: Service) {
        let mut entry = self.entries.entry(entry_key(namespace, workspace_id)).or_default();
        entry.services.push(service);
        entry.services.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Terminal transition guard: only a running entry moves to
    /// complete/error, late updates are silently dropped.
    pub fn set_result_status(
        &self,
        namespace: &str,
        workspace_id: &str,
        status: DiscoveryStatus,
        details: &str,
    ) {
        match self.entries.get_mut(&entry_key(namespace, workspace_id)) {
            Some(mut entry) => {
                if entry.status == DiscoveryStatus::Running {
                    entry.status = status;
                    entry.details = details.to_string();
                }
            }
            None => {
                warn!(
                    "Trying to update missing entry cache status for namespace {} and workspaceId {}",
                    namespace, workspace_id
                );
            }
        }
    }
}
