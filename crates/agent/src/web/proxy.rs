//! Service reverse proxy: resolves the target service against the live
//! platform state, rewrites the request and streams the upstream
//! response back.

use std::collections::HashMap;
use std::sync::LazyLock;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tracing::{debug, error};
use url::Url;

use crate::discovery::make_custom_proxy_path;
use crate::error::CustomError;
use crate::security::{CUSTOM_API_KEY_HEADER, CUSTOM_JWT_AUTH_HEADER, CUSTOM_PROXY_ERROR_HEADER};
use crate::state::AppState;

const MAX_HEADERS: usize = 100;
const MAX_HEADER_VALUES: usize = 1000;

static PROXY_ROUTE_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&make_custom_proxy_path(".*", ".*", ".*")).unwrap());

static PROXY_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .danger_accept_invalid_certs(true)
        .build()
        .expect("failed to build proxy http client")
});

pub async fn proxy(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request,
) -> Response {
    let namespace = params.get("name").cloned().unwrap_or_default();
    let service_id = params.get("serviceId").cloned().unwrap_or_default();

    // always resolve against the live platform, never the discovery cache
    let server_url = match state.discovery.get_service_url(&namespace, &service_id).await {
        Ok(url) => url,
        Err(e) => {
            error!("Failed to proxy a request to namespace {} service {}: {}", namespace, service_id, e);
            return proxy_error_response(
                e,
                format!("Failed to proxy a request to namespace {namespace} service {service_id}"),
            );
        }
    };

    let (mut parts, body) = req.into_parts();
    strip_proxy_headers(&mut parts.headers);

    let target_url = make_full_target_url(&server_url, parts.uri.path(), parts.uri.query());
    let url = match Url::parse(&target_url) {
        Ok(url) => url,
        Err(e) => {
            return proxy_error_response(
                CustomError::invalid_url(&target_url, e.to_string()),
                format!("Failed to proxy a request to namespace {namespace} service {service_id}"),
            );
        }
    };

    debug!("Sending proxy request to {}", url);
    let upstream = PROXY_CLIENT
        .request(parts.method.clone(), url.clone())
        .headers(parts.headers.clone())
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await;

    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(e) => {
            return proxy_error_response(
                CustomError::proxy_failed(url.as_str(), e.to_string()),
                format!("Failed to proxy a request to namespace {namespace} service {service_id}"),
            );
        }
    };

    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    if let Err(e) = copy_headers_checked(&mut response_headers, upstream.headers()) {
        return proxy_error_response(
            e,
            format!("Failed to proxy a request to namespace {namespace} service {service_id}"),
        );
    }

    let mut response = Response::builder()
        .status(status)
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    *response.headers_mut() = response_headers;
    response
}

/// The custom auth headers are meant for the agent, not the upstream.
fn strip_proxy_headers(headers: &mut HeaderMap) {
    headers.remove(CUSTOM_JWT_AUTH_HEADER);
    headers.remove(CUSTOM_API_KEY_HEADER);
    // hop-by-hop values the client rebuilds itself
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
}

/// Delete the templated proxy prefix from the request path and graft the
/// remainder onto the resolved base URL.
fn make_full_target_url(server_url: &str, path: &str, query: Option<&str>) -> String {
    let remainder = PROXY_ROUTE_REGEXP.replace_all(path, "");
    let mut target = format!("{server_url}/{remainder}");
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Header copy with resource-exhaustion limits from security scans.
fn copy_headers_checked(dst: &mut HeaderMap, src: &HeaderMap) -> Result<(), CustomError> {
    if src.keys_len() > MAX_HEADERS {
        return Err(CustomError::headers_limit_exceeded(MAX_HEADERS));
    }
    for key in src.keys() {
        let values = src.get_all(key);
        if values.iter().count() > MAX_HEADER_VALUES {
            return Err(CustomError::header_values_limit_exceeded(key.as_str(), MAX_HEADER_VALUES));
        }
        for value in values {
            dst.append(key.clone(), value.clone());
        }
    }
    Ok(())
}

fn proxy_error_response(err: CustomError, summary: String) -> Response {
    let header_text = format!("{summary}: {}", err.message);
    let mut response = err.into_response();
    if let Ok(value) = HeaderValue::from_str(&header_text) {
        response.headers_mut().insert(CUSTOM_PROXY_ERROR_HEADER, value);
    }
    response
}
