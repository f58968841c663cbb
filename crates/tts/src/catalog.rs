use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::RwLock;

use crate::credentials::CredentialSource;
use crate::error::{Result, TtsError};
use crate::signer;
use crate::types::Voice;

pub(crate) const DEFAULT_VOICES_URL_TEMPLATE: &str =
    "https://{region}.tts.speech.microsoft.com/cognitiveservices/voices/list";

/// How long one voices snapshot stays fresh
const SNAPSHOT_TTL_SECONDS: i64 = 8 * 3600;

struct CatalogCache {
    voices: Vec<Voice>,
    expires_at: Timestamp,
    /// Memoized per-locale filter results, bounded by the snapshot TTL
    locale_index: HashMap<String, Vec<Voice>>,
}

impl CatalogCache {
    fn is_valid(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// Source of voice listings, injectable so tests can substitute fakes
#[async_trait]
pub trait VoiceSource: Send + Sync {
    /// List voices, filtered to `locale` when non-empty
    async fn list(&self, locale: &str) -> Result<Vec<Voice>>;

    /// Prime the cache at startup; failure is logged, never fatal
    async fn warmup(&self);
}

/// Caches the vendor's voice inventory and serves locale-filtered views
pub struct VoiceCatalog {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialSource>,
    url_template: String,
    cache: RwLock<Option<CatalogCache>>,
}

impl VoiceCatalog {
    pub fn new(
        client: reqwest::Client,
        credentials: Arc<dyn CredentialSource>,
        url_template: Option<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            url_template: url_template.unwrap_or_else(|| DEFAULT_VOICES_URL_TEMPLATE.to_string()),
            cache: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<Vec<Voice>> {
        let credential = self.credentials.credential().await?;
        let url = self.url_template.replace("{region}", &credential.region);

        let response = self
            .client
            .get(&url)
            .header("Authorization", credential.authorization())
            .header("User-Agent", signer::USER_AGENT)
            .send()
            .await
            .map_err(|e| TtsError::Connection(format!("voices request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TtsError::ProviderApi { status: status.as_u16(), message });
        }

        let records: Vec<VendorVoice> = response
            .json()
            .await
            .map_err(|e| TtsError::ProviderApi {
                status: status.as_u16(),
                message: format!("undecodable voices response: {e}"),
            })?;

        Ok(records.into_iter().map(VendorVoice::into_voice).collect())
    }
}

#[async_trait]
impl VoiceSource for VoiceCatalog {
    /// A locale of "en" matches voices whose locale is exactly "en" or
    /// starts with "en-"
    async fn list(&self, locale: &str) -> Result<Vec<Voice>> {
        let now = Timestamp::now();

        {
            let guard = self.cache.read().await;
            if let Some(cache) = guard.as_ref()
                && cache.is_valid(now)
            {
                if locale.is_empty() {
                    return Ok(cache.voices.clone());
                }
                if let Some(filtered) = cache.locale_index.get(locale) {
                    return Ok(filtered.clone());
                }
            }
        }

        let mut guard = self.cache.write().await;

        // Someone else may have refreshed while we waited for the lock
        let needs_fetch = !guard.as_ref().is_some_and(|c| c.is_valid(now));
        if needs_fetch {
            let voices = self.fetch().await?;
            tracing::debug!(count = voices.len(), "voice catalog refreshed");
            *guard = Some(CatalogCache {
                voices,
                expires_at: now
                    .checked_add(jiff::Span::new().seconds(SNAPSHOT_TTL_SECONDS))
                    .map_err(|e| TtsError::Internal(Some(format!("catalog expiry overflow: {e}"))))?,
                locale_index: HashMap::new(),
            });
        }

        let cache = guard
            .as_mut()
            .ok_or_else(|| TtsError::Internal(Some("catalog cache vanished".to_string())))?;

        if locale.is_empty() {
            return Ok(cache.voices.clone());
        }

        let filtered = cache
            .locale_index
            .entry(locale.to_string())
            .or_insert_with(|| filter_by_locale(&cache.voices, locale));
        Ok(filtered.clone())
    }

    async fn warmup(&self) {
        if let Err(error) = self.list("").await {
            tracing::warn!(%error, "voice catalog warmup failed");
        }
    }
}

fn filter_by_locale(voices: &[Voice], locale: &str) -> Vec<Voice> {
    let prefix = format!("{locale}-");
    voices
        .iter()
        .filter(|v| v.locale == locale || v.locale.starts_with(&prefix))
        .cloned()
        .collect()
}

/// Vendor catalog record, `PascalCase` on the wire
#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VendorVoice {
    name: String,
    display_name: String,
    local_name: String,
    short_name: String,
    gender: String,
    locale: String,
    locale_name: String,
    #[serde(default)]
    style_list: Vec<String>,
    sample_rate_hertz: String,
}

impl VendorVoice {
    fn into_voice(self) -> Voice {
        Voice {
            name: self.name,
            display_name: self.display_name,
            local_name: self.local_name,
            short_name: self.short_name,
            gender: self.gender,
            locale: self.locale,
            locale_name: self.locale_name,
            style_list: self.style_list,
            sample_rate_hertz: self.sample_rate_hertz,
        }
    }
}
