//! Abstract platform interface over the cluster API.
//!
//! Namespace/service/pod enumeration goes through [`PlatformService`] so
//! the discovery engine never talks to the cluster directly; the real
//! implementation lives in [`kube`], and a stub replaces it when the
//! agent runs outside a cluster.

pub mod kube;
pub mod stub;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::CustomError;

/// Cluster service object, trimmed to what discovery needs.
#[derive(Debug, Clone, Default)]
pub struct ClusterService {
    pub name: String,
    pub namespace: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub selector: HashMap<String, String>,
    pub ports: Vec<ClusterServicePort>,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterServicePort {
    pub name: String,
    pub port: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterPod {
    pub name: String,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterRoute {
    pub name: String,
    pub namespace: String,
    pub host: String,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform operation forbidden: {0}")]
    Forbidden(String),
    #[error("platform operation failed: {0}")]
    Operation(String),
}

impl From<PlatformError> for CustomError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Forbidden(debug) => CustomError::paas_operation_failed_forbidden(debug),
            PlatformError::Operation(debug) => CustomError::paas_operation_failed(debug),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformService: Send + Sync {
    async fn get_namespaces(&self) -> Result<Vec<String>, PlatformError>;
    async fn get_service_list(&self, namespace: &str) -> Result<Vec<ClusterService>, PlatformError>;
    async fn get_pod_list(&self, namespace: &str) -> Result<Vec<ClusterPod>, PlatformError>;
    async fn get_route(&self, namespace: &str, name: &str)
        -> Result<Option<ClusterRoute>, PlatformError>;
}
