use serde::{Deserialize, Serialize};

pub const FORMAT_JSON: &str = "json";
pub const FORMAT_YAML: &str = "yaml";
pub const FORMAT_GRAPHQL: &str = "graphql";

pub const OPENAPI31_TYPE: &str = "openapi-3-1";
pub const OPENAPI30_TYPE: &str = "openapi-3-0";
pub const OPENAPI20_TYPE: &str = "openapi-2-0";
pub const ASYNCAPI30_TYPE: &str = "asyncapi-3-0";
pub const JSON_SCHEMA_TYPE: &str = "json-schema";
pub const MARKDOWN_TYPE: &str = "markdown";
pub const GRAPHQL_SCHEMA_TYPE: &str = "graphql-schema";
pub const GRAPHAPI_TYPE: &str = "graphapi";
pub const GRAPHQL_TYPE: &str = "graphql";
pub const INTROSPECTION_TYPE: &str = "introspection";
pub const UNKNOWN_TYPE: &str = "unknown";

pub const JSON_EXTENSION: &str = "json";
pub const MARKDOWN_EXTENSION: &str = "md";
pub const GRAPHQL_EXTENSION: &str = "graphql";
pub const UNKNOWN_EXTENSION: &str = "unknown";

/// Discovery runner family. Every document ref is tagged with the family
/// whose runner is responsible for fetching and validating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiType {
    Rest,
    Graphql,
    Asyncapi,
    Markdown,
    JsonSchema,
    Smartplug,
    #[default]
    Unknown,
}

impl ApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::Rest => "rest",
            ApiType::Graphql => "graphql",
            ApiType::Asyncapi => "asyncapi",
            ApiType::Markdown => "markdown",
            ApiType::JsonSchema => "json-schema",
            ApiType::Smartplug => "smartplug",
            ApiType::Unknown => "unknown",
        }
    }
}

/// One discovered API artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    pub format: String,
    pub file_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub x_api_kind: String,
    pub doc_path: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub config_path: String,
}

pub fn valid_document_type(document_type: &str) -> bool {
    matches!(
        document_type,
        OPENAPI31_TYPE
            | OPENAPI30_TYPE
            | OPENAPI20_TYPE
            | ASYNCAPI30_TYPE
            | JSON_SCHEMA_TYPE
            | MARKDOWN_TYPE
            | GRAPHQL_SCHEMA_TYPE
            | GRAPHAPI_TYPE
            | INTROSPECTION_TYPE
            | GRAPHQL_TYPE
            | UNKNOWN_TYPE
    )
}

pub fn doc_type_to_api_type(document_type: &str) -> ApiType {
    match document_type {
        OPENAPI31_TYPE | OPENAPI30_TYPE | OPENAPI20_TYPE => ApiType::Rest,
        GRAPHQL_SCHEMA_TYPE | GRAPHAPI_TYPE | GRAPHQL_TYPE | INTROSPECTION_TYPE => ApiType::Graphql,
        ASYNCAPI30_TYPE => ApiType::Asyncapi,
        MARKDOWN_TYPE => ApiType::Markdown,
        JSON_SCHEMA_TYPE => ApiType::JsonSchema,
        _ => ApiType::Unknown,
    }
}

/// Extension used for the raw download of a typed document.
pub fn extension_for_doc_type(document_type: &str) -> &'static str {
    match document_type {
        MARKDOWN_TYPE => MARKDOWN_EXTENSION,
        JSON_SCHEMA_TYPE => JSON_EXTENSION,
        _ => UNKNOWN_EXTENSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_to_runner_family() {
        assert_eq!(doc_type_to_api_type("openapi-3-1"), ApiType::Rest);
        assert_eq!(doc_type_to_api_type("openapi-2-0"), ApiType::Rest);
        assert_eq!(doc_type_to_api_type("graphql"), ApiType::Graphql);
        assert_eq!(doc_type_to_api_type("introspection"), ApiType::Graphql);
        assert_eq!(doc_type_to_api_type("asyncapi-3-0"), ApiType::Asyncapi);
        assert_eq!(doc_type_to_api_type("markdown"), ApiType::Markdown);
        assert_eq!(doc_type_to_api_type("json-schema"), ApiType::JsonSchema);
        assert_eq!(doc_type_to_api_type("whatever"), ApiType::Unknown);
    }

    #[test]
    fn unknown_config_types_are_rejected() {
        assert!(valid_document_type("openapi-3-0"));
        assert!(valid_document_type("unknown"));
        assert!(!valid_document_type("openapi"));
        assert!(!valid_document_type(""));
    }

    #[test]
    fn document_serializes_with_wire_names() {
        let doc = Document {
            name: "Petstore 1.0".into(),
            format: "json".into(),
            file_id: "Petstore 1.0.json".into(),
            doc_type: OPENAPI30_TYPE.into(),
            x_api_kind: String::new(),
            doc_path: "/v3/api-docs".into(),
            config_path: String::new(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["fileId"], "Petstore 1.0.json");
        assert_eq!(json["type"], "openapi-3-0");
        assert_eq!(json["docPath"], "/v3/api-docs");
        assert!(json.get("xApiKind").is_none());
        assert!(json.get("configPath").is_none());
    }
}
