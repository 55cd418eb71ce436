//! Type-specific discovery runners, one per API family.
//!
//! A runner knows which default probe paths to try, how to interpret a
//! config-index document and how to validate a candidate body. Runners
//! execute concurrently but their outputs are merged in the fixed
//! registration order from [`runners`].

pub mod asyncapi;
pub mod file_id;
pub mod graphql;
pub mod json_schema;
pub mod markdown;
pub mod rest;
pub mod smartplug;
pub mod unknown;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::fetch::DiscoveryClient;
use crate::model::document::{extension_for_doc_type, ApiType, Document};
use crate::model::urls::{DocumentDiscoveryUrls, DocumentRef, EndpointCallInfo};
use crate::task::join_all_safe;
use crate::tree::{parse_tree, Tree};
use file_id::FileIdSet;

pub const CONFIG_URL_FIELD: &str = "url";
pub const CONFIG_NAME_FIELD: &str = "name";
pub const CONFIG_X_API_KIND_FIELD: &str = "x-api-kind";
pub const CONFIG_URLS_FIELD: &str = "urls";
pub const CONFIG_TYPE_FIELD: &str = "type";

/// Shared per-service state handed to every runner of one discovery.
#[derive(Clone)]
pub struct RunnerContext {
    pub client: Arc<DiscoveryClient>,
    pub file_ids: Arc<FileIdSet>,
}

#[derive(Debug, Default)]
pub struct RunnerOutput {
    pub documents: Vec<Document>,
    pub calls: Vec<EndpointCallInfo>,
    pub error: Option<String>,
}

#[async_trait]
pub trait DiscoveryRunner: Send + Sync {
    /// Probe the runner's default paths; used when no config steered
    /// discovery.
    async fn discover_documents(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        urls: &DocumentDiscoveryUrls,
        timeout: Duration,
    ) -> RunnerOutput;

    /// Retrieve documents from already-known refs.
    async fn documents_by_refs(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        refs: &[DocumentRef],
        config_path: &str,
    ) -> RunnerOutput;

    /// Retain only refs for this runner's family.
    fn filter_refs(&self, refs: &[DocumentRef]) -> Vec<DocumentRef>;

    fn name(&self) -> &'static str;
}

/// Registration order fixes how per-runner outputs are concatenated.
pub fn runners() -> Vec<Arc<dyn DiscoveryRunner>> {
    vec![
        Arc::new(rest::RestDiscoveryRunner),
        Arc::new(graphql::GraphqlDiscoveryRunner),
        Arc::new(asyncapi::AsyncApiDiscoveryRunner),
        Arc::new(markdown::MarkdownDiscoveryRunner),
        Arc::new(unknown::UnknownDiscoveryRunner),
        Arc::new(json_schema::JsonSchemaDiscoveryRunner),
        Arc::new(smartplug::SmartplugDiscoveryRunner),
    ]
}

pub fn escape_spaces(s: &str) -> String {
    s.replace(' ', "%20")
}

pub fn make_refs_from_urls(
    urls: &[String],
    api_type: ApiType,
    required: bool,
    timeout: Duration,
) -> Vec<DocumentRef> {
    urls.iter()
        .map(|url| DocumentRef {
            url: url.clone(),
            api_type,
            required,
            timeout,
            ..Default::default()
        })
        .collect()
}

pub fn filter_refs_for_api_type(refs: &[DocumentRef], target: ApiType) -> Vec<DocumentRef> {
    refs.iter().filter(|r| r.api_type == target).cloned().collect()
}

fn join_error_strings(errors: Vec<String>) -> Option<String> {
    let filtered: Vec<String> = errors.into_iter().filter(|e| !e.is_empty()).collect();
    if filtered.is_empty() {
        None
    } else {
        Some(filtered.join(" | "))
    }
}

/// Fetch a URL and parse the body as a generic JSON/YAML tree.
pub async fn get_tree_from_url(
    client: &DiscoveryClient,
    url: &str,
    timeout: Duration,
) -> Result<(Tree, &'static str), String> {
    let bytes = client
        .get_document(url, ApiType::Rest.as_str(), timeout)
        .await
        .map_err(|e| e.to_string())?;
    parse_tree(&bytes).map_err(|e| e.to_string())
}

/// Read a runner-local config index (`url` or `urls[]`) into refs. The
/// caller stamps family and required-ness; config-directed refs get the
/// extended timeout since such endpoints are expected to hold the spec.
pub async fn get_refs_from_config(
    client: &DiscoveryClient,
    base_url: &str,
    config_url: &str,
    timeout: Duration,
) -> Vec<DocumentRef> {
    let full_url = format!("{base_url}{config_url}");
    let tree = match get_tree_from_url(client, &full_url, timeout).await {
        Ok((tree, _)) => tree,
        Err(e) => {
            debug!("Failed to read config from {}: {}", full_url, e);
            return Vec::new();
        }
    };

    let mut refs = Vec::new();
    // single url case
    let url = tree.get_string(CONFIG_URL_FIELD);
    if !url.is_empty() {
        refs.push(DocumentRef {
            url: escape_spaces(&url),
            x_api_kind: tree.get_string(CONFIG_X_API_KIND_FIELD),
            name: tree.get_string(CONFIG_NAME_FIELD),
            timeout: timeout * 10,
            ..Default::default()
        });
        return refs;
    }
    // multiple urls case
    for entry in tree.get_objects_array(CONFIG_URLS_FIELD) {
        refs.push(DocumentRef {
            url: escape_spaces(&entry.get_string(CONFIG_URL_FIELD)),
            x_api_kind: entry.get_string(CONFIG_X_API_KIND_FIELD),
            name: entry.get_string(CONFIG_NAME_FIELD),
            timeout: timeout * 10,
            ..Default::default()
        });
    }
    refs
}

/// Raw retrieval shared by the config-only families (markdown, unknown,
/// json-schema, smartplug): any non-empty body becomes a document whose
/// format is the family extension, or `format_override` when forced.
pub async fn get_any_docs_by_refs(
    cx: &RunnerContext,
    base_url: &str,
    refs: Vec<DocumentRef>,
    config_path: &str,
    format_override: Option<&'static str>,
) -> RunnerOutput {
    if refs.is_empty() {
        return RunnerOutput::default();
    }

    let tasks: Vec<_> = refs
        .into_iter()
        .map(|doc_ref| {
            let cx = cx.clone();
            let base_url = base_url.to_string();
            let config_path = config_path.to_string();
            async move {
                let name = if doc_ref.name.is_empty() {
                    doc_ref.url.rsplit('/').next().unwrap_or(&doc_ref.url).to_string()
                } else {
                    doc_ref.name.clone()
                };

                let full_url = format!("{}{}", base_url, doc_ref.url);
                let doc_type = doc_ref.api_type.as_str().to_string();

                match cx.client.get_document(&full_url, &doc_type, doc_ref.timeout).await {
                    Ok(data) if !data.is_empty() => {
                        let format = format_override.unwrap_or_else(|| extension_for_doc_type(&doc_type));
                        let file_id = cx.file_ids.generate(&name, format);
                        let doc = Document {
                            name,
                            format: format.to_string(),
                            file_id,
                            doc_type,
                            x_api_kind: doc_ref.x_api_kind.clone(),
                            doc_path: doc_ref.url.clone(),
                            config_path,
                        };
                        (Some(doc), None, None)
                    }
                    Ok(_) => (
                        None,
                        Some(EndpointCallInfo {
                            path: doc_ref.url.clone(),
                            status_code: None,
                            error_summary: "Failed to get document: response body is empty".to_string(),
                        }),
                        None,
                    ),
                    Err(e) => {
                        debug!("Failed to get document from url {}: {}", full_url, e);
                        let error = doc_ref.required.then(|| {
                            format!("Failed to get required document from url {}: {}", doc_ref.url, e)
                        });
                        (
                            None,
                            Some(EndpointCallInfo {
                                path: doc_ref.url.clone(),
                                status_code: e.status_code(),
                                error_summary: format!("Failed to get document: {e}"),
                            }),
                            error,
                        )
                    }
                }
            }
        })
        .collect();

    collect_ref_results(join_all_safe(tasks).await)
}

/// Fold ordered per-ref task results into one runner output.
pub(crate) fn collect_ref_results(
    results: Vec<Option<(Option<Document>, Option<EndpointCallInfo>, Option<String>)>>,
) -> RunnerOutput {
    let mut output = RunnerOutput::default();
    let mut errors = Vec::new();
    for slot in results.into_iter().flatten() {
        let (doc, call, error) = slot;
        if let Some(doc) = doc {
            output.documents.push(doc);
        }
        if let Some(call) = call {
            output.calls.push(call);
        }
        if let Some(error) = error {
            errors.push(error);
        }
    }
    output.error = join_error_strings(errors);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refs_are_filtered_by_family() {
        let refs = vec![
            DocumentRef { url: "/a".into(), api_type: ApiType::Rest, ..Default::default() },
            DocumentRef { url: "/b".into(), api_type: ApiType::Graphql, ..Default::default() },
            DocumentRef { url: "/c".into(), api_type: ApiType::Rest, ..Default::default() },
        ];
        let rest = filter_refs_for_api_type(&refs, ApiType::Rest);
        assert_eq!(rest.len(), 2);
        assert!(rest.iter().all(|r| r.api_type == ApiType::Rest));
    }

    #[test]
    fn error_strings_join_with_pipes() {
        assert_eq!(join_error_strings(vec![]), None);
        assert_eq!(join_error_strings(vec![String::new()]), None);
        assert_eq!(
            join_error_strings(vec!["a".into(), String::new(), "b".into()]),
            Some("a | b".into())
        );
    }

    #[test]
    fn spaces_are_escaped_in_config_urls() {
        assert_eq!(escape_spaces("/docs/my spec.json"), "/docs/my%20spec.json");
    }

    #[test]
    fn registration_order_is_fixed() {
        let names: Vec<&str> = runners().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            vec!["rest", "graphql", "asyncapi", "markdown", "unknown", "json-schema", "smartplug"]
        );
    }
}
