use serde::{Deserialize, Serialize};

/// Registry package as returned by the package search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplePackage {
    #[serde(rename = "packageId")]
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub default_release_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimplePackages {
    pub packages: Vec<SimplePackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedVersion {
    pub version: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "versionFolder", default)]
    pub folder: String,
    #[serde(default)]
    pub previous_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishedVersions {
    pub versions: Vec<PublishedVersion>,
}

/// Registry system configuration, consulted for the agents-backend
/// extension path prefix and the default workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfiguration {
    #[serde(default)]
    pub default_workspace_id: String,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    pub path_prefix: String,
}
