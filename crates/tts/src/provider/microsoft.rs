use std::sync::Arc;

use async_trait::async_trait;
use murmur_config::TtsConfig;

use crate::credentials::CredentialSource;
use crate::error::{Result, TtsError};
use crate::provider::TtsProvider;
use crate::signer;
use crate::ssml::{self, SsmlEscaper};
use crate::types::{SpeechRequest, SpeechResponse, content_type_for_format};

pub(crate) const DEFAULT_SYNTHESIS_URL_TEMPLATE: &str =
    "https://{region}.tts.speech.microsoft.com/cognitiveservices/v1";

/// Synthesizes speech through the region-scoped vendor endpoint
pub struct MicrosoftProvider {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialSource>,
    escaper: SsmlEscaper,
    url_template: String,
    default_voice: String,
    default_rate: String,
    default_pitch: String,
    default_style: String,
    default_locale: String,
    output_format: String,
    max_text_length: usize,
}

impl MicrosoftProvider {
    pub fn new(
        client: reqwest::Client,
        credentials: Arc<dyn CredentialSource>,
        config: &TtsConfig,
    ) -> Result<Self> {
        Ok(Self {
            client,
            credentials,
            escaper: SsmlEscaper::new(&config.preserve_tags)?,
            url_template: config
                .synthesis_url_template
                .clone()
                .unwrap_or_else(|| DEFAULT_SYNTHESIS_URL_TEMPLATE.to_string()),
            default_voice: config.default_voice.clone(),
            default_rate: config.default_rate.clone(),
            default_pitch: config.default_pitch.clone(),
            default_style: config.default_style.clone(),
            default_locale: config.default_locale.clone(),
            output_format: config.default_format.clone(),
            max_text_length: config.max_text_length,
        })
    }

    fn render_ssml(&self, request: &SpeechRequest) -> String {
        let voice = non_empty(request.voice.as_deref()).unwrap_or(&self.default_voice);
        let rate = non_empty(request.rate.as_deref()).unwrap_or(&self.default_rate);
        let pitch = non_empty(request.pitch.as_deref()).unwrap_or(&self.default_pitch);
        let style = non_empty(request.style.as_deref()).unwrap_or(&self.default_style);
        let locale = locale_of(voice).unwrap_or(&self.default_locale);

        let escaped = self.escaper.escape(&request.text);
        ssml::build_document(locale, voice, style, rate, pitch, &escaped)
    }
}

#[async_trait]
impl TtsProvider for MicrosoftProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse> {
        if request.text.trim().is_empty() {
            return Err(TtsError::InvalidRequest("text must not be empty".to_string()));
        }
        let char_count = request.text.chars().count();
        if char_count > self.max_text_length {
            return Err(TtsError::InvalidRequest(format!(
                "text is {char_count} characters, limit is {}",
                self.max_text_length
            )));
        }

        let ssml = self.render_ssml(request);
        let mut retried = false;

        loop {
            let credential = self.credentials.credential().await?;
            let url = self.url_template.replace("{region}", &credential.region);

            let response = self
                .client
                .post(&url)
                .header("Authorization", credential.authorization())
                .header("Content-Type", "application/ssml+xml")
                .header("X-Microsoft-OutputFormat", &self.output_format)
                .header("User-Agent", signer::USER_AGENT)
                .body(ssml.clone())
                .send()
                .await
                .map_err(|e| TtsError::Connection(format!("synthesis request failed: {e}")))?;

            let status = response.status();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                self.credentials.invalidate().await;
                if retried {
                    return Err(TtsError::AuthRejected(format!(
                        "synthesis rejected with {status} after credential refresh"
                    )));
                }
                tracing::debug!(%status, "credential rejected, refreshing and retrying once");
                retried = true;
                continue;
            }

            if !status.is_success() {
                let request_id = response
                    .headers()
                    .get("x-ms-request-id")
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string);
                let mut message = response.text().await.unwrap_or_default();
                if let Some(id) = request_id {
                    message = format!("[request-id {id}] {message}");
                }
                return Err(TtsError::ProviderApi { status: status.as_u16(), message });
            }

            let audio = response
                .bytes()
                .await
                .map_err(|e| TtsError::Connection(format!("synthesis body read failed: {e}")))?;

            return Ok(SpeechResponse {
                audio: audio.to_vec(),
                content_type: content_type_for_format(&self.output_format).to_string(),
            });
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Locale implied by a voice id: first two hyphen-delimited segments
fn locale_of(voice: &str) -> Option<&str> {
    let mut hyphens = voice.match_indices('-');
    hyphens.next()?;
    let (second, _) = hyphens.next()?;
    Some(&voice[..second])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use jiff::Timestamp;
    use secrecy::SecretString;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credentials::Credential;
    use crate::http_client::http_client;

    #[derive(Default)]
    struct CountingCredentials {
        fetches: AtomicUsize,
        invalidations: AtomicUsize,
    }

    #[async_trait]
    impl CredentialSource for CountingCredentials {
        async fn credential(&self) -> Result<Credential> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Credential {
                region: "eastus".into(),
                token: SecretString::from("token-value"),
                expires_at: Timestamp::MAX,
            })
        }

        async fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn provider_for(server: &MockServer, credentials: Arc<CountingCredentials>) -> MicrosoftProvider {
        let config = TtsConfig {
            synthesis_url_template: Some(format!("{}/synth/{{region}}", server.uri())),
            ..TtsConfig::default()
        };
        MicrosoftProvider::new(http_client(Duration::from_secs(5)), credentials, &config).unwrap()
    }

    fn request(text: &str) -> SpeechRequest {
        SpeechRequest { text: text.to_string(), ..SpeechRequest::default() }
    }

    #[tokio::test]
    async fn success_returns_audio_with_mapped_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/synth/eastus"))
            .and(header("Content-Type", "application/ssml+xml"))
            .and(header("X-Microsoft-OutputFormat", "audio-24khz-48kbitrate-mono-mp3"))
            .and(body_string_contains("hello"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3data".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, Arc::new(CountingCredentials::default()));
        let response = provider.synthesize(&request("hello")).await.unwrap();
        assert_eq!(response.audio, b"mp3data");
        assert_eq!(response.content_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn auth_rejection_refreshes_and_retries_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"audio".to_vec()))
            .mount(&server)
            .await;

        let credentials = Arc::new(CountingCredentials::default());
        let provider = provider_for(&server, Arc::clone(&credentials));

        let response = provider.synthesize(&request("hello")).await.unwrap();
        assert_eq!(response.audio, b"audio");
        assert_eq!(credentials.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(credentials.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_auth_rejection_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;

        let credentials = Arc::new(CountingCredentials::default());
        let provider = provider_for(&server, Arc::clone(&credentials));

        let err = provider.synthesize(&request("hello")).await.unwrap_err();
        assert!(matches!(err, TtsError::AuthRejected(_)), "got {err:?}");
        assert_eq!(credentials.invalidations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .insert_header("x-ms-request-id", "req-123")
                    .set_body_string("bad ssml"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credentials = Arc::new(CountingCredentials::default());
        let provider = provider_for(&server, Arc::clone(&credentials));

        let err = provider.synthesize(&request("hello")).await.unwrap_err();
        match err {
            TtsError::ProviderApi { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("req-123"));
                assert!(message.contains("bad ssml"));
            }
            other => panic!("expected ProviderApi, got {other:?}"),
        }
        assert_eq!(credentials.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_text_fails_before_any_network_call() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, Arc::new(CountingCredentials::default()));

        let err = provider.synthesize(&request("   ")).await.unwrap_err();
        assert!(matches!(err, TtsError::InvalidRequest(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_text_is_rejected() {
        let server = MockServer::start().await;
        let provider = provider_for(&server, Arc::new(CountingCredentials::default()));

        let err = provider.synthesize(&request(&"x".repeat(20_001))).await.unwrap_err();
        assert!(matches!(err, TtsError::InvalidRequest(_)));
    }

    #[test]
    fn locale_falls_out_of_the_voice_id() {
        assert_eq!(locale_of("en-US-AriaNeural"), Some("en-US"));
        assert_eq!(locale_of("zh-CN-XiaoxiaoMultilingualNeural"), Some("zh-CN"));
        assert_eq!(locale_of("novoice"), None);
        assert_eq!(locale_of("en-US"), None);
    }
}
