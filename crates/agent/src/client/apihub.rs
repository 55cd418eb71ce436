//! HTTP client for the central registry (APIHUB).

use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::error::CustomError;
use crate::model::package::{PublishedVersions, SimplePackage, SimplePackages, SystemConfiguration};
use crate::model::registration::{AgentKeepaliveMessage, KeepaliveResponse};
use crate::secctx::SecurityContext;

pub const ACCESS_TOKEN_COOKIE: &str = "apihub-access-token";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApihubClient: Send + Sync {
    async fn get_versions(
        &self,
        ctx: &SecurityContext,
        package_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Option<PublishedVersions>, CustomError>;

    async fn get_package_by_service_name(
        &self,
        ctx: &SecurityContext,
        workspace_id: &str,
        service_name: &str,
    ) -> Result<Option<SimplePackage>, CustomError>;

    async fn get_system_configuration(&self) -> Result<SystemConfiguration, CustomError>;

    async fn get_rsa_public_key(&self) -> Result<Vec<u8>, CustomError>;

    async fn check_api_key_valid(&self, api_key: &str) -> Result<bool, CustomError>;

    async fn check_auth_token(&self, token: &str) -> Result<bool, CustomError>;

    async fn send_keepalive(
        &self,
        path_prefix: &str,
        message: &AgentKeepaliveMessage,
    ) -> Result<String, CustomError>;
}

pub struct HttpApihubClient {
    apihub_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl HttpApihubClient {
    pub fn new(apihub_url: String, access_token: String) -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build apihub http client");
        HttpApihubClient { apihub_url, access_token, client }
    }

    fn authorized(&self, req: reqwest::RequestBuilder, ctx: &SecurityContext) -> reqwest::RequestBuilder {
        if !ctx.user_token().is_empty() {
            req.header("Authorization", format!("Bearer {}", ctx.user_token()))
        } else {
            req.header("api-key", self.access_token.clone())
        }
    }
}

/// 401/403 from the registry means the agent key or the user's rights are
/// wrong; both surface as a dedicated catalog error.
fn check_unauthorized(status: reqwest::StatusCode, url: &str) -> Result<(), CustomError> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        error!("Not sufficient rights or incorrect api key. Code = {}. Request = {}", status, url);
        return Err(CustomError::no_apihub_access(status.as_u16()));
    }
    Ok(())
}

#[async_trait]
impl ApihubClient for HttpApihubClient {
    async fn get_versions(
        &self,
        ctx: &SecurityContext,
        package_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Option<PublishedVersions>, CustomError> {
        let url = format!(
            "{}/api/v3/packages/{}/versions?page={}&limit={}",
            self.apihub_url,
            urlencoding::encode(package_id),
            page,
            limit
        );
        let resp = self
            .authorized(self.client.get(&url), ctx)
            .send()
            .await
            .map_err(|e| CustomError::internal(&format!("failed to get versions for {package_id}"), e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            check_unauthorized(status, &url)?;
            return Err(CustomError::internal(
                &format!("failed to get versions for {package_id}: status code {status}"),
                String::new(),
            ));
        }
        let versions: PublishedVersions = resp
            .json()
            .await
            .map_err(|e| CustomError::internal("failed to parse versions response", e.to_string()))?;
        Ok(Some(versions))
    }

    async fn get_package_by_service_name(
        &self,
        ctx: &SecurityContext,
        workspace_id: &str,
        service_name: &str,
    ) -> Result<Option<SimplePackage>, CustomError> {
        let url = format!(
            "{}/api/v2/packages?kind=package&serviceName={}&parentId={}&showAllDescendants=true",
            self.apihub_url,
            urlencoding::encode(service_name),
            workspace_id
        );
        let resp = self.authorized(self.client.get(&url), ctx).send().await.map_err(|e| {
            CustomError::internal(
                &format!("failed to get package by service name {service_name}"),
                e.to_string(),
            )
        })?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            check_unauthorized(status, &url)?;
            return Err(CustomError::internal(
                &format!("failed to get package by service name - {service_name}: status code {status}"),
                String::new(),
            ));
        }
        let packages: SimplePackages = resp
            .json()
            .await
            .map_err(|e| CustomError::internal("failed to parse packages response", e.to_string()))?;

        match packages.packages.len() {
            0 => Ok(None),
            1 => Ok(packages.packages.into_iter().next()),
            n => Err(CustomError::internal(
                &format!("unable to get package by service name: unexpected number of packages returned {n}"),
                String::new(),
            )),
        }
    }

    async fn get_system_configuration(&self) -> Result<SystemConfiguration, CustomError> {
        let url = format!("{}/api/v2/system/configuration", self.apihub_url);
        let resp = self
            .authorized(self.client.get(&url), &SecurityContext::system())
            .send()
            .await
            .map_err(|e| {
                CustomError::internal("failed to get APIHUB system configuration", e.to_string())
            })?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(CustomError::internal(
                &format!("failed to get APIHUB system configuration: status code {}", resp.status()),
                String::new(),
            ));
        }
        resp.json()
            .await
            .map_err(|e| CustomError::internal("failed to parse system configuration", e.to_string()))
    }

    async fn get_rsa_public_key(&self) -> Result<Vec<u8>, CustomError> {
        let url = format!("{}/api/v2/auth/publicKey", self.apihub_url);
        let resp = self
            .authorized(self.client.get(&url), &SecurityContext::system())
            .send()
            .await
            .map_err(|e| CustomError::internal("failed to get rsa public key from apihub", e.to_string()))?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            check_unauthorized(status, &url)?;
            return Err(CustomError::internal(
                &format!("failed to get rsa public key from apihub: status code {status}"),
                String::new(),
            ));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CustomError::internal("failed to read rsa public key", e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn check_api_key_valid(&self, api_key: &str) -> Result<bool, CustomError> {
        let url = format!("{}/api/v1/system/info", self.apihub_url);
        let resp = self.client.get(&url).header("api-key", api_key).send().await;
        match resp {
            Ok(resp) => Ok(resp.status() == reqwest::StatusCode::OK),
            Err(e) => Err(CustomError::internal("failed to check api key", e.to_string())),
        }
    }

    async fn check_auth_token(&self, token: &str) -> Result<bool, CustomError> {
        let url = format!("{}/api/v1/auth/token", self.apihub_url);
        let resp = self
            .client
            .get(&url)
            .header("Cookie", format!("{ACCESS_TOKEN_COOKIE}={token}"))
            .send()
            .await;
        match resp {
            Ok(resp) => Ok(resp.status() == reqwest::StatusCode::OK),
            Err(e) => Err(CustomError::internal("failed to check auth token", e.to_string())),
        }
    }

    async fn send_keepalive(
        &self,
        path_prefix: &str,
        message: &AgentKeepaliveMessage,
    ) -> Result<String, CustomError> {
        let url = format!("{}{}/api/v2/agents", self.apihub_url, path_prefix);
        let resp = self
            .authorized(self.client.post(&url), &SecurityContext::system())
            .json(message)
            .send()
            .await
            .map_err(|e| CustomError::internal("failed to send registration message", e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            check_unauthorized(status, &url)?;
            return Err(CustomError::internal(
                &format!("failed to send registration message with error code {status}"),
                String::new(),
            ));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| CustomError::internal("failed to read keepalive response", e.to_string()))?;
        if body.is_empty() {
            return Ok(String::new());
        }
        let version: KeepaliveResponse = serde_json::from_slice(&body)
            .map_err(|e| CustomError::internal("failed to parse keepalive response", e.to_string()))?;
        Ok(version.version)
    }
}
