//! Authentication: registry-issued JWT, registry API keys and cookie
//! session tokens, tried in that order. Proxy paths use a parallel chain
//! reading the `X-Apihub-*` headers so end-user credentials never mix
//! with the credentials meant for the proxied service.

pub mod middleware;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::client::{ApihubClient, ACCESS_TOKEN_COOKIE};
use crate::secctx::SecurityContext;

pub const CUSTOM_JWT_AUTH_HEADER: &str = "X-Apihub-Authorization";
pub const CUSTOM_API_KEY_HEADER: &str = "X-Apihub-ApiKey";
pub const CUSTOM_PROXY_ERROR_HEADER: &str = "X-Apihub-Proxy-Error";

const JWT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const API_KEY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedUser {
    user_id: String,
    cached_at: Instant,
}

pub struct AuthManager {
    apihub: Arc<dyn ApihubClient>,
    decoding_key: DecodingKey,
    validation: Validation,
    // verified tokens are cached so each request doesn't pay for a full
    // signature check (and the proxy api-key chain doesn't pay a registry
    // round-trip)
    jwt_cache: DashMap<String, CachedUser>,
    api_key_cache: DashMap<String, Instant>,
}

impl AuthManager {
    /// Fetch the registry's RSA public key and build the verifier.
    pub async fn setup(apihub: Arc<dyn ApihubClient>) -> anyhow::Result<Self> {
        let der = apihub
            .get_rsa_public_key()
            .await
            .map_err(|e| anyhow::anyhow!("rsa public key error - {e}"))?;
        if der.is_empty() {
            anyhow::bail!("rsa public key is empty");
        }
        Ok(Self::from_rsa_der(apihub, &der)?)
    }

    pub fn from_rsa_der(apihub: Arc<dyn ApihubClient>, der: &[u8]) -> anyhow::Result<Self> {
        let decoding_key = DecodingKey::from_rsa_der(der);
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        Ok(AuthManager {
            apihub,
            decoding_key,
            validation,
            jwt_cache: DashMap::new(),
            api_key_cache: DashMap::new(),
        })
    }

    /// Default chain: `Authorization: Bearer`, then `api-key`, then the
    /// session cookie. The first strategy producing a user wins.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<SecurityContext, String> {
        let mut failures = Vec::new();

        match self.bearer_jwt(headers, "authorization").await {
            Ok(ctx) => return Ok(ctx),
            Err(e) => failures.push(e),
        }
        match self.registry_api_key(headers, "api-key").await {
            Ok(ctx) => return Ok(ctx),
            Err(e) => failures.push(e),
        }
        match self.cookie_token(headers).await {
            Ok(ctx) => return Ok(ctx),
            Err(e) => failures.push(e),
        }

        Err(failures.join("; "))
    }

    /// Proxy chain: same strategies, custom headers.
    pub async fn authenticate_proxy(&self, headers: &HeaderMap) -> Result<SecurityContext, String> {
        let mut failures = Vec::new();

        match self.bearer_jwt(headers, CUSTOM_JWT_AUTH_HEADER).await {
            Ok(ctx) => return Ok(ctx),
            Err(e) => failures.push(e),
        }
        match self.registry_api_key(headers, CUSTOM_API_KEY_HEADER).await {
            Ok(ctx) => return Ok(ctx),
            Err(e) => failures.push(e),
        }
        match self.cookie_token(headers).await {
            Ok(ctx) => return Ok(ctx),
            Err(e) => failures.push(e),
        }

        Err(failures.join("; "))
    }

    async fn bearer_jwt(&self, headers: &HeaderMap, header: &str) -> Result<SecurityContext, String> {
        let value = headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| format!("authentication failed: {header} is empty"))?;
        let token = value.strip_prefix("Bearer ").unwrap_or(value);
        if token.is_empty() {
            return Err(format!("authentication failed: {header} is empty"));
        }
        let user_id = self.verify_jwt(token)?;
        Ok(SecurityContext::new(user_id, token))
    }

    fn verify_jwt(&self, token: &str) -> Result<String, String> {
        if let Some(cached) = self.jwt_cache.get(token) {
            if cached.cached_at.elapsed() < JWT_CACHE_TTL {
                return Ok(cached.user_id.clone());
            }
        }

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| format!("invalid token: {e}"))?;
        let user_id = data.claims.sub.unwrap_or_default();
        self.jwt_cache.insert(
            token.to_string(),
            CachedUser { user_id: user_id.clone(), cached_at: Instant::now() },
        );
        Ok(user_id)
    }

    async fn registry_api_key(&self, headers: &HeaderMap, header: &str) -> Result<SecurityContext, String> {
        let api_key = headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("authentication failed: {header} is empty"))?;

        if let Some(checked_at) = self.api_key_cache.get(api_key) {
            if checked_at.elapsed() < API_KEY_CACHE_TTL {
                return Ok(SecurityContext::new("", ""));
            }
        }

        let valid = self
            .apihub
            .check_api_key_valid(api_key)
            .await
            .map_err(|e| format!("api key check failed: {e}"))?;
        if !valid {
            return Err("authentication failed: api key is not valid".to_string());
        }
        self.api_key_cache.insert(api_key.to_string(), Instant::now());
        Ok(SecurityContext::new("", ""))
    }

    async fn cookie_token(&self, headers: &HeaderMap) -> Result<SecurityContext, String> {
        let token = cookie_value(headers, ACCESS_TOKEN_COOKIE)
            .ok_or_else(|| "authentication failed: access token cookie not found".to_string())?;

        let valid = self
            .apihub
            .check_auth_token(&token)
            .await
            .map_err(|e| format!("auth token check failed: {e}"))?;
        if !valid {
            return Err("authentication failed, token from cookie is incorrect".to_string());
        }

        // the registry already vouched for the token, claims are only
        // read for the user id
        let user_id = unverified_subject(&token).unwrap_or_default();
        debug!("cookie session accepted for user '{}'", user_id);
        Ok(SecurityContext::new(user_id, ""))
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    for pair in cookies.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Claims extraction without signature verification.
fn unverified_subject(token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = Default::default();
    let key = DecodingKey::from_secret(&[]);
    jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .ok()
        .and_then(|data| data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockApihubClient;

    #[tokio::test]
    async fn api_key_chain_hits_registry_once() {
        let mut apihub = MockApihubClient::new();
        apihub.expect_check_api_key_valid().times(1).returning(|_| Ok(true));
        let manager =
            AuthManager::from_rsa_der(Arc::new(apihub), &[48, 130, 1, 10]).expect("manager");

        let mut headers = HeaderMap::new();
        headers.insert("api-key", "the-key".parse().unwrap());

        assert!(manager.authenticate(&headers).await.is_ok());
        // second request is served from the validated-key cache
        assert!(manager.authenticate(&headers).await.is_ok());
    }

    #[tokio::test]
    async fn empty_headers_fail_every_strategy() {
        let mut apihub = MockApihubClient::new();
        apihub.expect_check_api_key_valid().never();
        apihub.expect_check_auth_token().never();
        let manager =
            AuthManager::from_rsa_der(Arc::new(apihub), &[48, 130, 1, 10]).expect("manager");

        let err = manager.authenticate(&HeaderMap::new()).await.unwrap_err();
        assert!(err.contains("authorization is empty"));
        assert!(err.contains("cookie not found"));
    }

    #[tokio::test]
    async fn invalid_api_key_is_rejected() {
        let mut apihub = MockApihubClient::new();
        apihub.expect_check_api_key_valid().returning(|_| Ok(false));
        let manager =
            AuthManager::from_rsa_der(Arc::new(apihub), &[48, 130, 1, 10]).expect("manager");

        let mut headers = HeaderMap::new();
        headers.insert("api-key", "wrong".parse().unwrap());
        assert!(manager.authenticate(&headers).await.is_err());
    }

    #[test]
    fn cookie_parsing_finds_the_access_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            "other=1; apihub-access-token=tok123; trailing=x".parse().unwrap(),
        );
        assert_eq!(cookie_value(&headers, ACCESS_TOKEN_COOKIE).unwrap(), "tok123");
        assert!(cookie_value(&headers, "missing").is_none());
    }
}
