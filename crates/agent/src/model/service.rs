use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::document::Document;
use super::urls::ServiceDiagnostic;

/// Discovery run state for one (namespace, workspace) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStatus {
    #[default]
    None,
    Running,
    Complete,
    Error,
}

/// One workload snapshot produced by a discovery run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "serviceName")]
    pub name: String,
    pub url: String,
    pub documents: Vec<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Baseline>,
    #[serde(rename = "serviceLabels", skip_serializing_if = "HashMap::is_empty", default)]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub proxy_server_url: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic_info: Option<ServiceDiagnostic>,
}

/// Registry-side package associated with a service by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub package_id: String,
    pub name: String,
    pub url: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListResponse {
    pub services: Vec<Service>,
    pub status: DiscoveryStatus,
    pub debug: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllServiceListResponse {
    pub status: DiscoveryStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub debug: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub progress: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub elapsed_sec: u64,
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub total_namespaces: usize,
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub total_services: usize,
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub total_services_with_baselines: usize,
    #[serde(skip_serializing_if = "is_zero_usize")]
    pub total_documents: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub namespace_data: HashMap<String, ServiceListResponse>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn is_zero_usize(v: &usize) -> bool {
    *v == 0
}

/// Lightweight service listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceNameItem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNamesResponse {
    pub service_names: Vec<ServiceNameItem>,
}

/// Detailed service listing entry, undistilled view of the cluster object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    pub id: String,
    pub namespace: String,
    #[serde(rename = "serviceName")]
    pub name: String,
    pub url: String,
    #[serde(rename = "serviceLabels", skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(rename = "serviceAnnotations", skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde(rename = "servicePods", skip_serializing_if = "Vec::is_empty")]
    pub pods: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proxy_server_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItemsResponse {
    pub service_items: Vec<ServiceItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespacesListResponse {
    pub namespaces: Vec<String>,
    pub cloud_name: String,
}

/// Platform route exposed to the catalog UI.
#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    pub name: String,
    pub namespace: String,
    pub host: String,
}

/// Workspace used by the v1 API which predates workspace scoping.
pub const DEFAULT_WORKSPACE_ID: &str = "QS";
