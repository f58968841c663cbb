use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jiff::Timestamp;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::error::{Result, TtsError};
use crate::signer;

pub(crate) const DEFAULT_BOOTSTRAP_URL: &str = "https://dev.microsofttranslator.com/apps/endpoint?api-version=1.0";

/// Seconds a credential is considered expired ahead of its actual expiry
const EXPIRY_MARGIN_SECONDS: i64 = 300;

/// Short-lived session credential for the vendor's speech endpoints
#[derive(Debug, Clone)]
pub struct Credential {
    /// Region code scoping the voices/synthesis endpoints
    pub region: String,
    /// Bearer token sent verbatim in the Authorization header
    pub token: SecretString,
    /// Effective expiry, already reduced by the safety margin
    pub expires_at: Timestamp,
}

impl Credential {
    fn is_valid(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }

    /// Value sent verbatim in the Authorization header of vendor calls
    pub(crate) fn authorization(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Source of session credentials, injectable so tests can substitute fakes
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Return a currently valid credential, refreshing if necessary
    async fn credential(&self) -> Result<Credential>;

    /// Drop the cached credential so the next call is forced to refresh
    ///
    /// Only called in reaction to an authentication-class rejection from
    /// the synthesis endpoint.
    async fn invalidate(&self);
}

/// Caches one credential for the whole process and serializes refreshes
pub struct CredentialManager {
    client: reqwest::Client,
    bootstrap_url: String,
    cached: RwLock<Option<Credential>>,
}

impl CredentialManager {
    pub fn new(client: reqwest::Client, bootstrap_url: Option<String>) -> Self {
        Self {
            client,
            bootstrap_url: bootstrap_url.unwrap_or_else(|| DEFAULT_BOOTSTRAP_URL.to_string()),
            cached: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<Credential> {
        let signature = signer::sign(&self.bootstrap_url);

        let response = self
            .client
            .post(&self.bootstrap_url)
            .header("Accept-Language", "zh-Hans")
            .header("X-ClientVersion", signer::CLIENT_VERSION)
            .header("X-UserId", signer::random_user_id())
            .header("X-HomeGeographicRegion", signer::HOME_GEOGRAPHIC_REGION)
            .header("X-ClientTraceId", uuid::Uuid::new_v4().to_string())
            .header("X-MT-Signature", signature)
            .header("User-Agent", signer::USER_AGENT)
            .header("Content-Type", "application/json; charset=utf-8")
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| TtsError::Credential(format!("bootstrap request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Credential(format!(
                "bootstrap returned {status}: {body}"
            )));
        }

        let bootstrap: BootstrapResponse = response
            .json()
            .await
            .map_err(|e| TtsError::Credential(format!("undecodable bootstrap response: {e}")))?;

        let expiry = token_expiry(&bootstrap.token)?;
        let expires_at = Timestamp::from_second(expiry.as_second() - EXPIRY_MARGIN_SECONDS)
            .map_err(|e| TtsError::Credential(format!("token expiry out of range: {e}")))?;

        tracing::debug!(
            region = %bootstrap.region,
            valid_for = %(expiry - Timestamp::now()),
            "credential refreshed"
        );

        Ok(Credential {
            region: bootstrap.region,
            token: SecretString::from(bootstrap.token),
            expires_at,
        })
    }
}

#[async_trait]
impl CredentialSource for CredentialManager {
    async fn credential(&self) -> Result<Credential> {
        // Fast path: concurrent readers share a valid cached credential
        {
            let guard = self.cached.read().await;
            if let Some(credential) = guard.as_ref()
                && credential.is_valid(Timestamp::now())
            {
                return Ok(credential.clone());
            }
        }

        let mut guard = self.cached.write().await;

        // Re-check under the exclusive lock: another caller may have
        // completed the refresh while we waited
        if let Some(credential) = guard.as_ref()
            && credential.is_valid(Timestamp::now())
        {
            return Ok(credential.clone());
        }

        let fresh = self.fetch().await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    async fn invalidate(&self) {
        let mut guard = self.cached.write().await;
        *guard = None;
        tracing::debug!("cached credential invalidated");
    }
}

#[derive(serde::Deserialize)]
struct BootstrapResponse {
    #[serde(rename = "r")]
    region: String,
    #[serde(rename = "t")]
    token: String,
}

#[derive(serde::Deserialize)]
struct TokenClaims {
    exp: Option<i64>,
}

/// Extract the expiry claim from the bearer token's JWT payload
fn token_expiry(token: &str) -> Result<Timestamp> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| TtsError::Credential("token is not a JWT".to_string()))?;

    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TtsError::Credential(format!("undecodable token payload: {e}")))?;

    let claims: TokenClaims = serde_json::from_slice(&decoded)
        .map_err(|e| TtsError::Credential(format!("unparseable token claims: {e}")))?;

    let exp = claims
        .exp
        .ok_or_else(|| TtsError::Credential("token carries no exp claim".to_string()))?;

    Timestamp::from_second(exp).map_err(|e| TtsError::Credential(format!("exp claim out of range: {e}")))
}
