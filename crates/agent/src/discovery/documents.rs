//! Per-service document discovery: probe the APIHUB meta-config first,
//! then run every registered runner in parallel and merge their outputs
//! in registration order.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api_type::file_id::FileIdSet;
use crate::api_type::{
    runners, DiscoveryRunner, RunnerContext, RunnerOutput, CONFIG_NAME_FIELD, CONFIG_TYPE_FIELD,
    CONFIG_URLS_FIELD, CONFIG_URL_FIELD, CONFIG_X_API_KIND_FIELD,
};
use crate::api_type::escape_spaces;
use crate::fetch::DiscoveryClient;
use crate::model::document::{doc_type_to_api_type, valid_document_type, Document};
use crate::model::urls::{DiscoveryResult, DocumentDiscoveryUrls, DocumentRef, EndpointCallInfo};
use crate::task::join_all_safe;
use crate::tree::Tree;

pub struct DocumentsDiscoveryService {
    runners: Vec<Arc<dyn DiscoveryRunner>>,
    discovery_timeout: Duration,
    client: Arc<DiscoveryClient>,
}

impl DocumentsDiscoveryService {
    pub fn new(discovery_timeout: Duration) -> Self {
        DocumentsDiscoveryService {
            runners: runners(),
            discovery_timeout,
            client: Arc::new(DiscoveryClient::new()),
        }
    }

    /// Discover all documents of one service. Documents produced before a
    /// runner failed are retained; runner errors are merged into one
    /// combined message.
    pub async fn retrieve_documents(
        &self,
        base_url: &str,
        urls: &DocumentDiscoveryUrls,
    ) -> (DiscoveryResult, Option<String>) {
        // check apihub config first
        let (apihub_config, config_path, apihub_config_calls) =
            get_apihub_config_from_urls(&self.client, base_url, &urls.apihub_config, self.discovery_timeout)
                .await;

        let refs_from_apihub_config = apihub_config
            .map(|config| document_refs_from_apihub_config(&config, self.discovery_timeout))
            .unwrap_or_default();

        let file_ids = Arc::new(FileIdSet::new());

        // process each supported type in parallel
        let tasks: Vec<_> = self
            .runners
            .iter()
            .map(|runner| {
                let runner = runner.clone();
                let cx = RunnerContext { client: self.client.clone(), file_ids: file_ids.clone() };
                let base_url = base_url.to_string();
                let urls = urls.clone();
                let refs = refs_from_apihub_config.clone();
                let config_path = config_path.clone();
                let timeout = self.discovery_timeout;
                async move {
                    debug!("Starting runner {}", runner.name());
                    let output = if !refs.is_empty() {
                        // just get documents from known urls
                        runner.documents_by_refs(&cx, &base_url, &refs, &config_path).await
                    } else {
                        runner.discover_documents(&cx, &base_url, &urls, timeout).await
                    };
                    debug!("Runner {} finished", runner.name());
                    output
                }
            })
            .collect();

        let outputs = join_all_safe(tasks).await;

        // merge in registration order to keep document ordering stable
        let mut documents: Vec<Document> = Vec::new();
        let mut calls: Vec<EndpointCallInfo> = apihub_config_calls;
        let mut errors: Vec<String> = Vec::new();
        for output in outputs {
            let RunnerOutput { documents: docs, calls: runner_calls, error } =
                output.unwrap_or_default();
            documents.extend(docs);
            calls.extend(runner_calls);
            if let Some(error) = error {
                errors.push(error);
            }
        }

        let documents = remove_duplicate_documents(documents);

        let error = if errors.is_empty() { None } else { Some(errors.join(" | ")) };
        (DiscoveryResult { documents, endpoint_calls: calls }, error)
    }
}

/// Duplicate `docPath`s keep the first occurrence.
fn remove_duplicate_documents(documents: Vec<Document>) -> Vec<Document> {
    let mut seen = std::collections::HashSet::new();
    documents
        .into_iter()
        .filter(|doc| seen.insert(doc.doc_path.clone()))
        .collect()
}

/// Translate the meta-config into authoritative refs. Entries with an
/// unrecognized type are dropped; config-directed endpoints are expected
/// to hold the spec, hence the extended timeout.
fn document_refs_from_apihub_config(config: &Tree, timeout: Duration) -> Vec<DocumentRef> {
    let mut refs = Vec::new();

    // single url case
    let url = config.get_string(CONFIG_URL_FIELD);
    if !url.is_empty() {
        refs.push(DocumentRef {
            url: escape_spaces(&url),
            x_api_kind: config.get_string(CONFIG_X_API_KIND_FIELD),
            name: config.get_string(CONFIG_NAME_FIELD),
            required: true,
            timeout: timeout * 10,
            ..Default::default()
        });
        return refs;
    }

    // multiple urls case
    for entry in config.get_objects_array(CONFIG_URLS_FIELD) {
        let document_type = entry.get_string(CONFIG_TYPE_FIELD);
        if !valid_document_type(&document_type) {
            warn!("Unknown document type - {}", document_type);
            continue;
        }
        refs.push(DocumentRef {
            url: escape_spaces(&entry.get_string(CONFIG_URL_FIELD)),
            x_api_kind: entry.get_string(CONFIG_X_API_KIND_FIELD),
            name: entry.get_string(CONFIG_NAME_FIELD),
            api_type: doc_type_to_api_type(&document_type),
            required: true,
            timeout: timeout * 10,
        });
    }
    refs
}

/// Probe the apihub-config paths in order; the first parseable JSON
/// document wins. The meta-config is JSON only, no YAML fallback.
async fn get_apihub_config_from_urls(
    client: &DiscoveryClient,
    base_url: &str,
    paths: &[String],
    timeout: Duration,
) -> (Option<Tree>, String, Vec<EndpointCallInfo>) {
    let mut calls = Vec::new();

    for path in paths {
        let url = format!("{base_url}{path}");
        debug!("Trying to get apihub config from url: {}", url);
        let bytes = match client.get_document(&url, "rest", timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                calls.push(EndpointCallInfo {
                    path: path.clone(),
                    status_code: e.status_code(),
                    error_summary: format!("Failed to get APIHUB config: {e}"),
                });
                continue;
            }
        };
        if bytes.is_empty() {
            calls.push(EndpointCallInfo {
                path: path.clone(),
                status_code: None,
                error_summary: "Failed to get APIHUB config: response body is empty".to_string(),
            });
            continue;
        }
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Object(map)) => {
                return (Some(Tree::from(map)), path.clone(), calls);
            }
            Ok(_) => {
                calls.push(EndpointCallInfo {
                    path: path.clone(),
                    status_code: None,
                    error_summary: "Failed to get APIHUB config: invalid JSON: not an object".to_string(),
                });
            }
            Err(e) => {
                debug!("Failed to unmarshal apihub config from url {} with error: {}", url, e);
                calls.push(EndpointCallInfo {
                    path: path.clone(),
                    status_code: None,
                    error_summary: format!("Failed to get APIHUB config: invalid JSON: {e}"),
                });
            }
        }
    }
    (None, String::new(), calls)
}
