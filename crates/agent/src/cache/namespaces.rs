use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::CustomError;
use crate::platform::PlatformService;

#[derive(Debug, Clone)]
struct CachedNamespaces {
    namespaces: Vec<String>,
    fetched_at: Instant,
}

/// TTL-bounded cache of the platform's namespace list.
pub struct NamespaceListCache {
    cloud_name: String,
    ttl: Duration,
    platform: Arc<dyn PlatformService>,
    slot: RwLock<Option<CachedNamespaces>>,
}

impl NamespaceListCache {
    pub fn new(cloud_name: String, platform: Arc<dyn PlatformService>, ttl: Duration) -> Self {
        NamespaceListCache { cloud_name, ttl, platform, slot: RwLock::new(None) }
    }

    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    pub async fn namespace_exists(&self, namespace: &str) -> Result<bool, CustomError> {
        let namespaces = self.list_namespaces().await?;
        Ok(namespaces.iter().any(|ns| ns == namespace))
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>, CustomError> {
        if let Some(cached) = self.slot.read().as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.namespaces.clone());
            }
        }

        let namespaces = self.platform.get_namespaces().await.map_err(CustomError::from)?;
        *self.slot.write() = Some(CachedNamespaces {
            namespaces: namespaces.clone(),
            fetched_at: Instant::now(),
        });
        Ok(namespaces)
    }
}
