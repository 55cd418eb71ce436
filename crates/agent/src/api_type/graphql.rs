use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::bytes::Regex;
use tracing::debug;

use crate::model::document::{
    ApiType, Document, FORMAT_GRAPHQL, FORMAT_JSON, GRAPHQL_EXTENSION, GRAPHQL_TYPE, JSON_EXTENSION,
};
use crate::model::urls::{DocumentDiscoveryUrls, DocumentRef, EndpointCallInfo};
use crate::task::join_all_safe;

use super::{
    collect_ref_results, filter_refs_for_api_type, get_refs_from_config, make_refs_from_urls,
    DiscoveryRunner, RunnerContext, RunnerOutput,
};

pub const DEFAULT_GRAPHQL_SPEC_NAME: &str = "Graphql specification";

// A body declaring at least one type block is taken for a GraphQL schema.
static GRAPHQL_SCHEMA_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"type\s+?\S+?\s+?\{").unwrap());

pub struct GraphqlDiscoveryRunner;

#[async_trait]
impl DiscoveryRunner for GraphqlDiscoveryRunner {
    async fn discover_documents(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        urls: &DocumentDiscoveryUrls,
        timeout: Duration,
    ) -> RunnerOutput {
        for config_url in &urls.graphql_config {
            let refs = get_refs_from_graphql_config(cx, base_url, config_url, timeout).await;
            if !refs.is_empty() {
                // Graphql config found
                return self.documents_by_refs(cx, base_url, &refs, config_url).await;
            }
        }

        let mut refs = make_refs_from_urls(&urls.graphql_schema, ApiType::Graphql, false, timeout);
        refs.extend(make_refs_from_urls(&urls.graphql_introspection, ApiType::Graphql, false, timeout));
        self.documents_by_refs(cx, base_url, &refs, "").await
    }

    async fn documents_by_refs(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        refs: &[DocumentRef],
        config_path: &str,
    ) -> RunnerOutput {
        let filtered = self.filter_refs(refs);
        if filtered.is_empty() {
            return RunnerOutput::default();
        }

        let tasks: Vec<_> = filtered
            .into_iter()
            .map(|doc_ref| {
                let cx = cx.clone();
                let base_url = base_url.to_string();
                let config_path = config_path.to_string();
                async move {
                    let url = format!("{}{}", base_url, doc_ref.url);
                    let name = if doc_ref.name.is_empty() {
                        DEFAULT_GRAPHQL_SPEC_NAME.to_string()
                    } else {
                        doc_ref.name.clone()
                    };

                    // introspection first, raw schema as the fallback
                    let introspection_err = match check_graphql_introspection(&cx, &url, doc_ref.timeout).await {
                        Ok(()) => {
                            let file_id = cx.file_ids.generate(&name, JSON_EXTENSION);
                            let doc = Document {
                                name,
                                format: FORMAT_JSON.to_string(),
                                file_id,
                                doc_type: GRAPHQL_TYPE.to_string(),
                                x_api_kind: doc_ref.x_api_kind.clone(),
                                doc_path: doc_ref.url.clone(),
                                config_path,
                            };
                            return (Some(doc), None, None);
                        }
                        Err(e) => e,
                    };
                    debug!("Failed to read graphql introspection from {}: {}", url, introspection_err);

                    match check_graphql_spec(&cx, &url, doc_ref.timeout).await {
                        Ok(()) => {
                            let file_id = cx.file_ids.generate(&name, GRAPHQL_EXTENSION);
                            let doc = Document {
                                name,
                                format: FORMAT_GRAPHQL.to_string(),
                                file_id,
                                doc_type: GRAPHQL_TYPE.to_string(),
                                x_api_kind: doc_ref.x_api_kind.clone(),
                                doc_path: doc_ref.url.clone(),
                                config_path,
                            };
                            (Some(doc), None, None)
                        }
                        Err(e) => {
                            debug!("Failed to read graphql spec from {}: {}", url, e);
                            let error = doc_ref.required.then(|| {
                                format!("Failed to read required graphql spec from {}: {}", doc_ref.url, e)
                            });
                            let call = EndpointCallInfo {
                                path: doc_ref.url.clone(),
                                status_code: None,
                                error_summary: e,
                            };
                            (None, Some(call), error)
                        }
                    }
                }
            })
            .collect();

        collect_ref_results(join_all_safe(tasks).await)
    }

    fn filter_refs(&self, refs: &[DocumentRef]) -> Vec<DocumentRef> {
        filter_refs_for_api_type(refs, ApiType::Graphql)
    }

    fn name(&self) -> &'static str {
        "graphql"
    }
}

/// POST introspection; a JSON body with a top-level `data` key passes.
async fn check_graphql_introspection(
    cx: &RunnerContext,
    spec_url: &str,
    timeout: Duration,
) -> Result<(), String> {
    debug!("Sending graphql introspection discovery request to {}", spec_url);
    let bytes = cx
        .client
        .post_introspection(spec_url, timeout)
        .await
        .map_err(|e| format!("failed to get graphql introspection from '{spec_url}': {e}"))?;

    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) if value.get("data").is_some() => Ok(()),
        _ => Err(format!("incorrect graphql introspection found at url `{spec_url}`")),
    }
}

/// GET the URL and sniff the body for a schema type declaration.
async fn check_graphql_spec(cx: &RunnerContext, spec_url: &str, timeout: Duration) -> Result<(), String> {
    debug!("Sending graphql spec discovery request to {}", spec_url);
    let bytes = cx
        .client
        .get_document(spec_url, ApiType::Graphql.as_str(), timeout)
        .await
        .map_err(|e| format!("failed to get graphql specification from '{spec_url}': {e}"))?;

    if GRAPHQL_SCHEMA_REGEXP.is_match(&bytes) {
        Ok(())
    } else {
        Err(format!("incorrect graphql spec found at url `{spec_url}`"))
    }
}

async fn get_refs_from_graphql_config(
    cx: &RunnerContext,
    base_url: &str,
    config_url: &str,
    timeout: Duration,
) -> Vec<DocumentRef> {
    let mut refs = get_refs_from_config(&cx.client, base_url, config_url, timeout).await;
    for doc_ref in &mut refs {
        doc_ref.api_type = ApiType::Graphql;
        doc_ref.required = true;
    }
    refs
}
