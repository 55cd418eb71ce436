use std::time::Duration;

use async_trait::async_trait;

use crate::model::document::ApiType;
use crate::model::urls::{DocumentDiscoveryUrls, DocumentRef};

use super::{
    filter_refs_for_api_type, get_any_docs_by_refs, DiscoveryRunner, RunnerContext, RunnerOutput,
};

pub struct MarkdownDiscoveryRunner;

#[async_trait]
impl DiscoveryRunner for MarkdownDiscoveryRunner {
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
        filter_refs_for_api_type(refs, ApiType::Markdown)
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_type::file_id::FileIdSet;
    use crate::fetch::DiscoveryClient;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn retrieves_markdown_by_ref() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/readme.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Title"))
            .mount(&server)
            .await;

        let cx = RunnerContext {
            client: Arc::new(DiscoveryClient::new()),
            file_ids: Arc::new(FileIdSet::new()),
        };
        let refs = vec![DocumentRef {
            url: "/docs/readme.md".into(),
            name: "Readme".into(),
            api_type: ApiType::Markdown,
            timeout: Duration::from_secs(5),
            ..Default::default()
        }];
        let out = MarkdownDiscoveryRunner
            .documents_by_refs(&cx, &server.uri(), &refs, "/cfg")
            .await;

        assert_eq!(out.documents.len(), 1);
        let doc = &out.documents[0];
        assert_eq!(doc.format, "md");
        assert_eq!(doc.file_id, "Readme.md");
        assert_eq!(doc.doc_type, "markdown");
        assert_eq!(doc.config_path, "/cfg");
    }
}
