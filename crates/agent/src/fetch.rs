//! Raw HTTP retrieval of candidate documents from in-cluster endpoints.

use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::CustomError;

/// What the failed call was trying to retrieve; picks the catalog entry
/// the failure maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Spec,
    Document,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("incorrect response code: {code}")]
    Status { code: u16, kind: FetchKind },
    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { code, .. } => Some(*code),
            FetchError::Transport(_) => None,
        }
    }

    pub fn to_custom_error(&self, url: &str) -> CustomError {
        match self {
            FetchError::Status { code, kind: FetchKind::Spec } => CustomError::failed_to_download_spec(
                *code,
                format!("unable to get graphql introspection from url {url}: incorrect response code: {code}"),
            ),
            FetchError::Status { code, kind: FetchKind::Document } => CustomError::failed_to_download_document(
                *code,
                format!("unable to get document from url {url}: incorrect response code: {code}"),
            ),
            FetchError::Transport(e) => {
                CustomError::internal("Failed to download document", format!("{url}: {e}"))
            }
        }
    }
}

/// HTTP client used for all discovery probes. Redirects are not followed
/// (the first response is surfaced, 3xx included) and certificate
/// verification is off: probe targets are in-cluster services.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    client: reqwest::Client,
}

impl Default for DiscoveryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()
            .expect("failed to build discovery http client");
        DiscoveryClient { client }
    }

    /// GET the document body; non-2xx becomes a typed fetch error.
    pub async fn get_document(
        &self,
        url: &str,
        document_type: &str,
        timeout: Duration,
    ) -> Result<Bytes, FetchError> {
        let start = Instant::now();
        let result = self.client.get(url).timeout(timeout).send().await;
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                log_slow(start, timeout, url, Some(&e));
                return Err(FetchError::Transport(e.to_string()));
            }
        };
        let status = resp.status();
        if status.as_u16() != 200 {
            log_slow(start, timeout, url, None);
            debug!("Failed to get document with type {} from url {}: code {}", document_type, url, status);
            return Err(FetchError::Status { code: status.as_u16(), kind: FetchKind::Document });
        }
        let bytes = resp.bytes().await.map_err(|e| FetchError::Transport(e.to_string()))?;
        log_slow(start, timeout, url, None);
        Ok(bytes)
    }

    /// POST with an empty body, used exclusively for GraphQL
    /// introspection endpoints.
    pub async fn post_introspection(&self, url: &str, timeout: Duration) -> Result<Bytes, FetchError> {
        let start = Instant::now();
        let result = self.client.post(url).timeout(timeout).send().await;
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                log_slow(start, timeout, url, Some(&e));
                return Err(FetchError::Transport(e.to_string()));
            }
        };
        let status = resp.status();
        if status.as_u16() != 200 {
            log_slow(start, timeout, url, None);
            return Err(FetchError::Status { code: status.as_u16(), kind: FetchKind::Spec });
        }
        let bytes = resp.bytes().await.map_err(|e| FetchError::Transport(e.to_string()))?;
        log_slow(start, timeout, url, None);
        Ok(bytes)
    }
}

// A probe that overran its own timeout (plus scheduling slack) points at
// network contention, worth surfacing.
fn log_slow(start: Instant, timeout: Duration, url: &str, err: Option<&reqwest::Error>) {
    let elapsed = start.elapsed();
    if elapsed > timeout + Duration::from_millis(500) {
        match err {
            Some(e) => warn!("Slow probe ({}ms) for {} failed: {}", elapsed.as_millis(), url, e),
            None => warn!("Slow probe ({}ms) for {}", elapsed.as_millis(), url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_returns_body_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/api-docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"openapi\":\"3.0.1\"}"))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let body = client
            .get_document(&format!("{}/v3/api-docs", server.uri()), "rest", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"openapi\":\"3.0.1\"}");
    }

    #[tokio::test]
    async fn non_2xx_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let err = client
            .get_document(&format!("{}/missing", server.uri()), "rest", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        let custom = err.to_custom_error("/missing");
        assert_eq!(custom.status, 424);
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let err = client
            .get_document(&format!("{}/old", server.uri()), "rest", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(302));
    }

    #[tokio::test]
    async fn introspection_uses_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\":{}}"))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let body = client
            .post_introspection(&format!("{}/graphql", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"data\":{}}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = DiscoveryClient::new();
        let err = client
            .get_document("http://127.0.0.1:1/nope", "rest", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert_eq!(err.status_code(), None);
    }
}
