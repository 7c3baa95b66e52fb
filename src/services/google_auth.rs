//! Google service-account authentication
//!
//! Signs a short-lived RS256 assertion with the service account's private
//! key and trades it for an OAuth access token at the key's token endpoint.
//! The token is cached and reused until shortly before it expires.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{ServiceError, ServiceResult};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scope that covers Cloud Vision
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Lifetime requested for each signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A cached token is refreshed this long before it expires
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Fields of a service-account key file used by the token flow
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parse the JSON key downloaded from the Cloud console
    pub fn from_json(json: &str) -> ServiceResult<Self> {
        let key: Self = serde_json::from_str(json)?;
        match key.key_type.as_deref() {
            None | Some("service_account") => Ok(key),
            Some(other) => Err(ServiceError::Credentials(format!(
                "expected a service_account key, got '{}'",
                other
            ))),
        }
    }

    /// Read and parse a key file
    pub fn from_file(path: &Path) -> ServiceResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

fn assertion_claims<'a>(
    key: &'a ServiceAccountKey,
    scope: &'a str,
    now: i64,
) -> AssertionClaims<'a> {
    AssertionClaims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone, PartialEq)]
struct CachedToken {
    value: String,
    /// Unix seconds
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now + EXPIRY_MARGIN_SECS < self.expires_at
    }
}

fn parse_token_response(body: &str, now: i64) -> ServiceResult<CachedToken> {
    let response: TokenResponse = serde_json::from_str(body)?;
    Ok(CachedToken {
        value: response.access_token,
        expires_at: now + response.expires_in,
    })
}

/// Access-token source for one service account and scope
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scope: String,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_email", &self.key.client_email)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountAuth {
    /// Fails when the key's private key is not a valid RSA PEM
    pub fn new(key: ServiceAccountKey, scope: &str) -> ServiceResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            key,
            scope: scope.to_string(),
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn sign_assertion(&self, now: i64) -> ServiceResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let claims = assertion_claims(&self.key, &self.scope, now);
        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// A valid bearer token, fetching a new one when the cached one is stale
    pub async fn access_token(&self) -> ServiceResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        tracing::debug!("Requesting access token for {}", self.key.client_email);
        let token = self.exchange(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn exchange(&self, now: i64) -> ServiceResult<CachedToken> {
        let assertion = self.sign_assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: "Google OAuth",
                status: status.as_u16(),
                body,
            });
        }

        parse_token_response(&body, now)
    }
}
