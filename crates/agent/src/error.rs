use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const AGENT_VERSION: &str = "1.0.0";

// Error code catalog. Codes are stable strings consumed by the portal UI,
// messages keep their `$param` placeholders with the values in `params`.
pub const INVALID_URL_ESCAPE: &str = "6";
pub const INVALID_URL_ESCAPE_MSG: &str = "Failed to unescape parameter $param";

pub const NAMESPACE_DOESNT_EXIST: &str = "100";
pub const NAMESPACE_DOESNT_EXIST_MSG: &str = "Namespace $namespace doesn't exist";

pub const ROUTE_DOESNT_EXIST: &str = "101";
pub const ROUTE_DOESNT_EXIST_MSG: &str = "Route $route doesn't exist";

pub const NO_APIHUB_ACCESS: &str = "200";
pub const NO_APIHUB_ACCESS_MSG: &str =
    "No access to Apihub with code: $code. Not sufficient rights or incorrect agent configuration(api-key).";

pub const FAILED_TO_DOWNLOAD_SPEC: &str = "201";
pub const FAILED_TO_DOWNLOAD_SPEC_MSG: &str = "Failed to download specification. Response code: $code.";

pub const DOCUMENT_NOT_FOUND: &str = "202";
pub const DOCUMENT_NOT_FOUND_MSG: &str = "Document not found by fileId $fileId";

pub const INVALID_URL: &str = "300";
pub const INVALID_URL_MSG: &str = "Url '$url' is not a valid url";

pub const NAMESPACE_SERVICE_DOESNT_EXIST: &str = "400";
pub const NAMESPACE_SERVICE_DOESNT_EXIST_MSG: &str = "Service $service doesn't exist in namespace $namespace";

pub const PROXY_FAILED: &str = "500";
pub const PROXY_FAILED_MSG: &str = "Failed to proxy the request to $url";

pub const FAILED_TO_DOWNLOAD_DOCUMENT: &str = "510";
pub const FAILED_TO_DOWNLOAD_DOCUMENT_MSG: &str = "Failed to download document. Response code: $code.";

pub const HEADERS_LIMIT_EXCEEDED: &str = "520";
pub const HEADERS_LIMIT_EXCEEDED_MSG: &str = "Response contains more than $maxHeaders headers";

pub const HEADER_VALUES_LIMIT_EXCEEDED: &str = "521";
pub const HEADER_VALUES_LIMIT_EXCEEDED_MSG: &str = "Response header $key contains more than $maxValues values";

pub const PAAS_OPERATION_FAILED: &str = "600";
pub const PAAS_OPERATION_FAILED_MSG: &str = "Paas operation failed";

pub const PAAS_OPERATION_FAILED_FORBIDDEN: &str = "601";
pub const PAAS_OPERATION_FAILED_FORBIDDEN_MSG: &str = "Paas operation forbidden";

pub const AGENT_VERSION_MISMATCH: &str = "700";
pub const AGENT_VERSION_MISMATCH_MSG: &str =
    "Current version $version of Agent not supported by APIHUB. Please, update this instance to version $recommended.";

/// Catalog error rendered to clients as
/// `{status, code, message, params, debug}`.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct CustomError {
    pub status: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub debug: String,
}

impl CustomError {
    pub fn new(status: u16, code: &str, message: &str) -> Self {
        CustomError {
            status,
            code: code.to_string(),
            message: message.to_string(),
            params: Map::new(),
            debug: String::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = debug.into();
        self
    }

    /// Non-catalog failure surfaced as HTTP 500.
    pub fn internal(message: &str, debug: impl Into<String>) -> Self {
        CustomError {
            status: 500,
            code: String::new(),
            message: message.to_string(),
            params: Map::new(),
            debug: debug.into(),
        }
    }

    pub fn invalid_url_escape(param: &str, debug: impl Into<String>) -> Self {
        Self::new(400, INVALID_URL_ESCAPE, INVALID_URL_ESCAPE_MSG)
            .param("param", param)
            .with_debug(debug)
    }

    pub fn namespace_doesnt_exist(namespace: &str) -> Self {
        Self::new(400, NAMESPACE_DOESNT_EXIST, NAMESPACE_DOESNT_EXIST_MSG).param("namespace", namespace)
    }

    pub fn route_doesnt_exist(route: &str) -> Self {
        Self::new(404, ROUTE_DOESNT_EXIST, ROUTE_DOESNT_EXIST_MSG).param("route", route)
    }

    pub fn no_apihub_access(status_code: u16) -> Self {
        Self::new(424, NO_APIHUB_ACCESS, NO_APIHUB_ACCESS_MSG).param("code", status_code.to_string())
    }

    pub fn failed_to_download_spec(status_code: u16, debug: impl Into<String>) -> Self {
        Self::new(424, FAILED_TO_DOWNLOAD_SPEC, FAILED_TO_DOWNLOAD_SPEC_MSG)
            .param("code", status_code.to_string())
            .with_debug(debug)
    }

    pub fn failed_to_download_document(status_code: u16, debug: impl Into<String>) -> Self {
        Self::new(424, FAILED_TO_DOWNLOAD_DOCUMENT, FAILED_TO_DOWNLOAD_DOCUMENT_MSG)
            .param("code", status_code.to_string())
            .with_debug(debug)
    }

    pub fn document_not_found(file_id: &str) -> Self {
        Self::new(404, DOCUMENT_NOT_FOUND, DOCUMENT_NOT_FOUND_MSG).param("fileId", file_id)
    }

    pub fn invalid_url(url: &str, debug: impl Into<String>) -> Self {
        Self::new(400, INVALID_URL, INVALID_URL_MSG).param("url", url).with_debug(debug)
    }

    pub fn namespace_service_doesnt_exist(service: &str, namespace: &str) -> Self {
        Self::new(400, NAMESPACE_SERVICE_DOESNT_EXIST, NAMESPACE_SERVICE_DOESNT_EXIST_MSG)
            .param("service", service)
            .param("namespace", namespace)
    }

    pub fn proxy_failed(url: &str, debug: impl Into<String>) -> Self {
        Self::new(424, PROXY_FAILED, PROXY_FAILED_MSG).param("url", url).with_debug(debug)
    }

    pub fn headers_limit_exceeded(max_headers: usize) -> Self {
        Self::new(502, HEADERS_LIMIT_EXCEEDED, HEADERS_LIMIT_EXCEEDED_MSG)
            .param("maxHeaders", max_headers)
    }

    pub fn header_values_limit_exceeded(key: &str, max_values: usize) -> Self {
        Self::new(502, HEADER_VALUES_LIMIT_EXCEEDED, HEADER_VALUES_LIMIT_EXCEEDED_MSG)
            .param("key", key)
            .param("maxValues", max_values)
    }

    pub fn paas_operation_failed(debug: impl Into<String>) -> Self {
        Self::new(424, PAAS_OPERATION_FAILED, PAAS_OPERATION_FAILED_MSG).with_debug(debug)
    }

    pub fn paas_operation_failed_forbidden(debug: impl Into<String>) -> Self {
        Self::new(424, PAAS_OPERATION_FAILED_FORBIDDEN, PAAS_OPERATION_FAILED_FORBIDDEN_MSG).with_debug(debug)
    }

    pub fn agent_version_mismatch(recommended: &str) -> Self {
        Self::new(503, AGENT_VERSION_MISMATCH, AGENT_VERSION_MISMATCH_MSG)
            .param("version", AGENT_VERSION)
            .param("recommended", recommended)
    }
}

impl IntoResponse for CustomError {
    fn into_response(self) -> Response {
        debug!(
            "Request failed. Code = {}. Message = {}. Params: {:?}. Debug: {}",
            self.status, self.message, self.params, self.debug
        );
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
