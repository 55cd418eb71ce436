use std::time::Duration;

use async_trait::async_trait;

use crate::model::document::ApiType;
use crate::model::urls::{DocumentDiscoveryUrls, DocumentRef};

use super::{
    filter_refs_for_api_type, get_any_docs_by_refs, DiscoveryRunner, RunnerContext, RunnerOutput,
};

pub struct JsonSchemaDiscoveryRunner;

#[async_trait]
impl DiscoveryRunner for JsonSchemaDiscoveryRunner {
    async fn discover_documents(
        &self,
        _cx: &RunnerContext,
        _base_url: &str,
        _urls: &DocumentDiscoveryUrls,
        _timeout: Duration,
    ) -> RunnerOutput {
        // No default paths for this type
        RunnerOutput::default()
    }

    async fn documents_by_refs(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        refs: &[DocumentRef],
        config_path: &str,
    ) -> RunnerOutput {
        get_any_docs_by_refs(cx, base_url, self.filter_refs(refs), config_path, None).await
    }

    fn filter_refs(&self, refs: &[DocumentRef]) -> Vec<DocumentRef> {
        filter_refs_for_api_type(refs, ApiType::JsonSchema)
    }

    fn name(&self) -> &'static str {
        "json-schema"
    }
}
