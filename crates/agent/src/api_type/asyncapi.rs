use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::model::document::{ApiType, Document, ASYNCAPI30_TYPE};
use crate::model::urls::{DocumentDiscoveryUrls, DocumentRef, EndpointCallInfo};
use crate::task::join_all_safe;

use super::{
    collect_ref_results, filter_refs_for_api_type, get_tree_from_url, make_refs_from_urls,
    DiscoveryRunner, RunnerContext, RunnerOutput,
};

pub const DEFAULT_ASYNCAPI_SPEC_NAME: &str = "AsyncAPI specification";

static ASYNCAPI3_REGEXP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^3\.0").unwrap());

pub struct AsyncApiDiscoveryRunner;

#[async_trait]
impl DiscoveryRunner for AsyncApiDiscoveryRunner {
    async fn discover_documents(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        urls: &DocumentDiscoveryUrls,
        timeout: Duration,
    ) -> RunnerOutput {
        let refs = make_refs_from_urls(&urls.asyncapi, ApiType::Asyncapi, false, timeout);
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
                    match get_asyncapi_spec_info(&cx, &url, doc_ref.timeout).await {
                        Ok((version, title, format)) => {
                            debug!("Got valid asyncapi spec from: {}", url);
                            let name = if !doc_ref.name.is_empty() {
                                doc_ref.name.clone()
                            } else if !title.is_empty() {
                                title
                            } else {
                                DEFAULT_ASYNCAPI_SPEC_NAME.to_string()
                            };
                            let file_id = cx.file_ids.generate(&name, format);
                            let doc = Document {
                                name,
                                format: format.to_string(),
                                file_id,
                                doc_type: version.to_string(),
                                x_api_kind: doc_ref.x_api_kind.clone(),
                                doc_path: doc_ref.url.clone(),
                                config_path,
                            };
                            (Some(doc), None, None)
                        }
                        Err(e) => {
                            debug!("Failed to read asyncapi spec from {}: {}", url, e);
                            let error = doc_ref.required.then(|| {
                                format!("Failed to read required asyncapi spec from {}: {}", doc_ref.url, e)
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
        filter_refs_for_api_type(refs, ApiType::Asyncapi)
    }

    fn name(&self) -> &'static str {
        "asyncapi"
    }
}

async fn get_asyncapi_spec_info(
    cx: &RunnerContext,
    spec_url: &str,
    timeout: Duration,
) -> Result<(&'static str, String, &'static str), String> {
    let (spec, format) = get_tree_from_url(&cx.client, spec_url, timeout)
        .await
        .map_err(|e| format!("failed to get specification from '{spec_url}': {e}"))?;

    let asyncapi_version = spec.get_string("asyncapi");
    if asyncapi_version.is_empty() {
        return Err(format!("not an asyncapi spec at '{spec_url}': missing 'asyncapi' field"));
    }

    let info = spec.get_object("info");
    let title = info.get_string("title");
    let version = info.get_string("version");
    let spec_title = if version.is_empty() { title } else { format!("{title} {version}") };

    if ASYNCAPI3_REGEXP.is_match(&asyncapi_version) {
        return Ok((ASYNCAPI30_TYPE, spec_title, format));
    }

    Err(format!(
        "unsupported AsyncAPI version at '{spec_url}': version '{asyncapi_version}'"
    ))
}
