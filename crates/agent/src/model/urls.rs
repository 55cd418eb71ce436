use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::document::{ApiType, Document};

const DEFAULT_APIHUB_CONFIG_URLS: &[&str] = &["/v3/api-docs/apihub-swagger-config"];
const DEFAULT_SWAGGER_CONFIG_URLS: &[&str] = &["/v3/api-docs/swagger-config", "/swagger-resources"];
const DEFAULT_OPENAPI_URLS: &[&str] = &[
    "/q/openapi?format=json",
    "/v3/api-docs?format=json",
    "/v2/api-docs",
    "/swagger-ui/swagger.json",
    "/swagger-ui/doc.json",
    "/api-docs",
    "/v1/api-docs",
];
const DEFAULT_GRAPHQL_URLS: &[&str] = &["/api/graphql-server/schema", "/graphql"];
const DEFAULT_GRAPHQL_INT_URLS: &[&str] = &["/graphql/introspection"];
const DEFAULT_GRAPHQL_CONFIG_URLS: &[&str] = &["/api/graphql-server/schema/domains"];
const DEFAULT_SMARTPLUG_CONFIG_URLS: &[&str] = &["/smartplug/v1/api/config"];

pub const CUSTOM_APIHUB_CONFIG_URL: &str = "apihub-config-url";
pub const CUSTOM_SWAGGER_CONFIG_URL: &str = "apihub-swagger-config-url";
pub const CUSTOM_OPENAPI_URL: &str = "apihub-openapi-url";
pub const CUSTOM_GRAPHQL_URL: &str = "apihub-graphql-url";
pub const CUSTOM_GRAPHQL_INT_URL: &str = "apihub-graphql-int-url";
pub const CUSTOM_GRAPHQL_CONFIG_URL: &str = "apihub-graphql-config-url";
pub const CUSTOM_ASYNCAPI_URL: &str = "apihub-asyncapi-url";

/// Merged per-service probe plan: annotation-driven URLs prepended to the
/// built-in defaults, duplicates removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentDiscoveryUrls {
    pub apihub_config: Vec<String>,
    pub swagger_config: Vec<String>,
    pub openapi: Vec<String>,
    pub graphql_config: Vec<String>,
    pub graphql_schema: Vec<String>,
    pub graphql_introspection: Vec<String>,
    pub asyncapi: Vec<String>,
    pub smartplug_config: Vec<String>,
}

impl DocumentDiscoveryUrls {
    pub fn from_annotations(annotations: &HashMap<String, String>) -> Self {
        let pick = |key: &str, defaults: &[&str]| -> Vec<String> {
            let mut urls = Vec::new();
            if let Some(value) = annotations.get(key) {
                urls.push(value.clone());
            }
            for d in defaults {
                if !urls.iter().any(|u| u == d) {
                    urls.push((*d).to_string());
                }
            }
            urls
        };

        DocumentDiscoveryUrls {
            apihub_config: pick(CUSTOM_APIHUB_CONFIG_URL, DEFAULT_APIHUB_CONFIG_URLS),
            swagger_config: pick(CUSTOM_SWAGGER_CONFIG_URL, DEFAULT_SWAGGER_CONFIG_URLS),
            openapi: pick(CUSTOM_OPENAPI_URL, DEFAULT_OPENAPI_URLS),
            graphql_config: pick(CUSTOM_GRAPHQL_CONFIG_URL, DEFAULT_GRAPHQL_CONFIG_URLS),
            graphql_schema: pick(CUSTOM_GRAPHQL_URL, DEFAULT_GRAPHQL_URLS),
            graphql_introspection: pick(CUSTOM_GRAPHQL_INT_URL, DEFAULT_GRAPHQL_INT_URLS),
            // AsyncAPI has no built-in probe paths, the annotation is the
            // only way to opt a service in outside of config-driven refs.
            asyncapi: pick(CUSTOM_ASYNCAPI_URL, &[]),
            smartplug_config: pick("", DEFAULT_SMARTPLUG_CONFIG_URLS),
        }
    }
}

/// The intent to discover a single document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRef {
    pub url: String,
    pub x_api_kind: String,
    pub name: String,
    pub api_type: ApiType,
    pub required: bool,
    pub timeout: Duration,
}

/// Diagnostic record of one unsuccessful probe. Never emitted for
/// successful probes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCallInfo {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub error_summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDiagnostic {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub endpoint_calls: Vec<EndpointCallInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub documents: Vec<Document>,
    pub endpoint_calls: Vec<EndpointCallInfo>,
}
