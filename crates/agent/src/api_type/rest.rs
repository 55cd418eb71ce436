use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::model::document::{ApiType, Document, OPENAPI20_TYPE, OPENAPI30_TYPE, OPENAPI31_TYPE};
use crate::model::urls::{DocumentDiscoveryUrls, DocumentRef, EndpointCallInfo};
use crate::task::join_all_safe;

use super::{
    collect_ref_results, filter_refs_for_api_type, get_refs_from_config, get_tree_from_url,
    make_refs_from_urls, DiscoveryRunner, RunnerContext, RunnerOutput,
};

pub const DEFAULT_OPENAPI_SPEC_NAME: &str = "default";

static OPENAPI3_REGEXP: LazyLock<Regex> = LazyLock::new(|| Regex::new("3.0+").unwrap());
static OPENAPI31_REGEXP: LazyLock<Regex> = LazyLock::new(|| Regex::new("3.1+").unwrap());
static OPENAPI2_REGEXP: LazyLock<Regex> = LazyLock::new(|| Regex::new("2.*").unwrap());

pub struct RestDiscoveryRunner;

#[async_trait]
impl DiscoveryRunner for RestDiscoveryRunner {
    async fn discover_documents(
        &self,
        cx: &RunnerContext,
        base_url: &str,
        urls: &DocumentDiscoveryUrls,
        timeout: Duration,
    ) -> RunnerOutput {
        // find swagger-config, etc..
        for config_url in &urls.swagger_config {
            let refs = get_refs_from_swagger_config(cx, base_url, config_url, timeout).await;
            if !refs.is_empty() {
                // Swagger config found
                return self.documents_by_refs(cx, base_url, &refs, config_url).await;
            }
        }
        // Swagger config not found, generate refs list from openapi urls
        let refs = make_refs_from_urls(&urls.openapi, ApiType::Rest, false, timeout);
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
                    match get_spec_version_and_title(&cx, &url, doc_ref.timeout).await {
                        Ok((version, title, format)) => {
                            debug!("Got valid openapi spec from: {}", url);
                            let name = if !doc_ref.name.is_empty() {
                                doc_ref.name.clone()
                            } else if !title.is_empty() {
                                title
                            } else {
                                DEFAULT_OPENAPI_SPEC_NAME.to_string()
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
                            debug!("Failed to read openapi spec from {}: {}", url, e);
                            let error = doc_ref.required.then(|| {
                                format!("Failed to read required openapi spec from {}: {}", doc_ref.url, e)
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
        filter_refs_for_api_type(refs, ApiType::Rest)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

async fn get_refs_from_swagger_config(
    cx: &RunnerContext,
    base_url: &str,
    config_url: &str,
    timeout: Duration,
) -> Vec<DocumentRef> {
    let mut refs = get_refs_from_config(&cx.client, base_url, config_url, timeout).await;
    for doc_ref in &mut refs {
        doc_ref.api_type = ApiType::Rest;
        doc_ref.required = true;
    }
    refs
}

async fn get_spec_version_and_title(
    cx: &RunnerContext,
    spec_url: &str,
    timeout: Duration,
) -> Result<(&'static str, String, &'static str), String> {
    let (spec, format) = get_tree_from_url(&cx.client, spec_url, timeout)
        .await
        .map_err(|e| format!("failed to get specification from '{spec_url}': {e}"))?;

    let info = spec.get_object("info");
    let title = format!("{} {}", info.get_string("title"), info.get_string("version"))
        .trim()
        .to_string();

    let openapi_version = spec.get_string("openapi");
    if OPENAPI3_REGEXP.is_match(&openapi_version) {
        return Ok((OPENAPI30_TYPE, title, format));
    }
    if OPENAPI31_REGEXP.is_match(&openapi_version) {
        return Ok((OPENAPI31_TYPE, title, format));
    }
    if OPENAPI2_REGEXP.is_match(&spec.get_string("swagger")) || OPENAPI2_REGEXP.is_match(&openapi_version) {
        return Ok((OPENAPI20_TYPE, title, format));
    }

    Err(format!("failed to get openapi version from spec at `{spec_url}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_type::file_id::FileIdSet;
    use crate::fetch::DiscoveryClient;
    use crate::model::document::FORMAT_JSON;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> RunnerContext {
        RunnerContext {
            client: Arc::new(DiscoveryClient::new()),
            file_ids: Arc::new(FileIdSet::new()),
        }
    }

    fn urls_with_only(openapi: Vec<String>, swagger_config: Vec<String>) -> DocumentDiscoveryUrls {
        DocumentDiscoveryUrls { openapi, swagger_config, ..Default::default() }
    }

    #[tokio::test]
    async fn discovers_openapi_30_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/api-docs"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"openapi":"3.0.1","info":{"title":"X","version":"1"}}"#,
            ))
            .mount(&server)
            .await;

        let cx = context();
        let urls = urls_with_only(vec!["/v3/api-docs?format=json".into()], vec![]);
        let out = RestDiscoveryRunner
            .discover_documents(&cx, &server.uri(), &urls, Duration::from_secs(5))
            .await;

        assert_eq!(out.documents.len(), 1);
        let doc = &out.documents[0];
        assert_eq!(doc.name, "X 1");
        assert_eq!(doc.doc_type, OPENAPI30_TYPE);
        assert_eq!(doc.format, FORMAT_JSON);
        assert_eq!(doc.file_id, "X 1.json");
        assert_eq!(doc.doc_path, "/v3/api-docs?format=json");
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn detects_swagger_20_and_31() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/api-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"swagger":"2.0","info":{"title":"Old","version":"2"}}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"openapi":"3.1.0","info":{"title":"New","version":"3"}}"#,
            ))
            .mount(&server)
            .await;

        let cx = context();
        let urls = urls_with_only(vec!["/v2/api-docs".into(), "/api-docs".into()], vec![]);
        let out = RestDiscoveryRunner
            .discover_documents(&cx, &server.uri(), &urls, Duration::from_secs(5))
            .await;

        assert_eq!(out.documents.len(), 2);
        assert_eq!(out.documents[0].doc_type, OPENAPI20_TYPE);
        assert_eq!(out.documents[1].doc_type, OPENAPI31_TYPE);
    }

    #[tokio::test]
    async fn swagger_config_steers_probing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/api-docs/swagger-config"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"urls":[{"url":"/specs/a.json","name":"A"}]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/specs/a.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"openapi":"3.0.0","info":{"title":"A","version":"1"}}"#,
            ))
            .mount(&server)
            .await;

        let cx = context();
        let urls = urls_with_only(
            vec!["/unused".into()],
            vec!["/v3/api-docs/swagger-config".into()],
        );
        let out = RestDiscoveryRunner
            .discover_documents(&cx, &server.uri(), &urls, Duration::from_secs(5))
            .await;

        // the default openapi url must not be probed once the config matched
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.documents[0].name, "A");
        assert_eq!(out.documents[0].config_path, "/v3/api-docs/swagger-config");
    }

    #[tokio::test]
    async fn document_without_version_fields_is_a_diagnostic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"info":{"title":"X"}}"#))
            .mount(&server)
            .await;

        let cx = context();
        let urls = urls_with_only(vec!["/api-docs".into()], vec![]);
        let out = RestDiscoveryRunner
            .discover_documents(&cx, &server.uri(), &urls, Duration::from_secs(5))
            .await;

        assert!(out.documents.is_empty());
        assert_eq!(out.calls.len(), 1);
        assert!(out.calls[0].error_summary.contains("failed to get openapi version"));
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn required_ref_failure_becomes_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cx = context();
        let refs = vec![DocumentRef {
            url: "/spec.json".into(),
            api_type: ApiType::Rest,
            required: true,
            timeout: Duration::from_secs(5),
            ..Default::default()
        }];
        let out = RestDiscoveryRunner.documents_by_refs(&cx, &server.uri(), &refs, "/cfg").await;

        assert!(out.documents.is_empty());
        let error = out.error.expect("required failure must elevate");
        assert!(error.contains("required openapi spec"));
    }

    #[tokio::test]
    async fn yaml_spec_is_supported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "openapi: 3.0.3\ninfo:\n  title: Yaml API\n  version: \"0.1\"\n",
            ))
            .mount(&server)
            .await;

        let cx = context();
        let urls = urls_with_only(vec!["/api-docs".into()], vec![]);
        let out = RestDiscoveryRunner
            .discover_documents(&cx, &server.uri(), &urls, Duration::from_secs(5))
            .await;

        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.documents[0].format, "yaml");
        assert_eq!(out.documents[0].file_id, "Yaml API 0.1.yaml");
    }
}
