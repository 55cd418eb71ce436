use std::time::Duration;

use async_trait::async_trait;

use crate::model::document::{ApiType, MARKDOWN_EXTENSION};
use crate::model::urls::{DocumentDiscoveryUrls, DocumentRef};

use super::{
    filter_refs_for_api_type, get_any_docs_by_refs, get_refs_from_config, DiscoveryRunner,
    RunnerContext, RunnerOutput,
};

/// Smartplug endpoints serve markdown no matter what extension their
/// config advertises, so every retrieved document is forced to `md`.
pub struct SmartplugDiscoveryRunner;

#[async_trait]
impl DiscoveryRunner for SmartplugDiscoveryRunner {
    async fn discover_documents(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        urls: &DocumentDiscoveryUrls,
        timeout: Duration,
    ) -> RunnerOutput {
        for config_url in &urls.smartplug_config {
            let mut refs = get_refs_from_config(&cx.client, base_url, config_url, timeout).await;
            for doc_ref in &mut refs {
                doc_ref.api_type = ApiType::Smartplug;
            }
            if !refs.is_empty() {
                // config found
                return self.documents_by_refs(cx, base_url, &refs, config_url).await;
            }
        }
        RunnerOutput::default()
    }

    async fn documents_by_refs(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        refs: &[DocumentRef],
        config_path: &str,
    ) -> RunnerOutput {
        get_any_docs_by_refs(
            cx,
            base_url,
            self.filter_refs(refs),
            config_path,
            Some(MARKDOWN_EXTENSION),
        )
        .await
    }

    fn filter_refs(&self, refs: &[DocumentRef]) -> Vec<DocumentRef> {
        filter_refs_for_api_type(refs, ApiType::Smartplug)
    }

    fn name(&self) -> &'static str {
        "smartplug"
    }
}
