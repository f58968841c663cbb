use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::catalog::{VoiceCatalog, VoiceSource};
use crate::coordinator::SegmentCoordinator;
use crate::credentials::{CredentialManager, CredentialSource};
use crate::error::{Result, TtsError};
use crate::http_client::http_client;
use crate::merge::merge_segments;
use crate::provider::{MicrosoftProvider, TtsProvider};
use crate::segment::segment;
use crate::types::{SpeechRequest, SpeechResponse, Voice, content_type_for_format};

/// TTS server tying the provider, catalog, and segmentation together
pub struct Server {
    provider: Arc<dyn TtsProvider>,
    catalog: Arc<dyn VoiceSource>,
    coordinator: SegmentCoordinator,
    segment_threshold: usize,
    min_sentence_length: usize,
    max_sentence_length: usize,
    max_text_length: usize,
    output_format: String,
}

impl Server {
    /// Synthesize text to speech, segmenting long inputs
    ///
    /// Texts longer than the configured threshold are split into
    /// sentence-aligned chunks, synthesized concurrently, and merged
    /// back into one stream. The cancellation token aborts in-flight
    /// segment work when the caller goes away.
    pub async fn synthesize(
        &self,
        request: &SpeechRequest,
        cancel: &CancellationToken,
    ) -> Result<SpeechResponse> {
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

        if char_count <= self.segment_threshold {
            return self.provider.synthesize(request).await;
        }

        let chunks = segment(&request.text, self.min_sentence_length, self.max_sentence_length);
        tracing::debug!(chars = char_count, chunks = chunks.len(), "synthesizing segmented text");

        if chunks.len() == 1 {
            return self.provider.synthesize(request).await;
        }

        let blobs = self.coordinator.run(request, chunks, cancel).await?;
        let audio = tokio::select! {
            () = cancel.cancelled() => return Err(TtsError::Cancelled),
            merged = merge_segments(blobs, &self.output_format) => merged?,
        };

        Ok(SpeechResponse {
            audio,
            content_type: content_type_for_format(&self.output_format).to_string(),
        })
    }

    /// List synthesizable voices, filtered to `locale` when non-empty
    pub async fn voices(&self, locale: &str) -> Result<Vec<Voice>> {
        self.catalog.list(locale).await
    }

    /// Prime the voice catalog; failure is logged, never fatal
    pub async fn warmup(&self) {
        self.catalog.warmup().await;
    }
}

/// Builder for constructing the TTS server from configuration
pub struct TtsServerBuilder<'a> {
    config: &'a murmur_config::Config,
}

impl<'a> TtsServerBuilder<'a> {
    pub const fn new(config: &'a murmur_config::Config) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<Server> {
        let tts = &self.config.tts;
        let client = http_client(Duration::from_secs(tts.request_timeout_seconds));

        let credentials: Arc<dyn CredentialSource> =
            Arc::new(CredentialManager::new(client.clone(), tts.bootstrap_url.clone()));

        let catalog: Arc<dyn VoiceSource> = Arc::new(VoiceCatalog::new(
            client.clone(),
            Arc::clone(&credentials),
            tts.voices_url_template.clone(),
        ));

        let provider: Arc<dyn TtsProvider> =
            Arc::new(MicrosoftProvider::new(client, credentials, tts)?);

        tracing::debug!(
            max_concurrent = tts.max_concurrent,
            segment_threshold = tts.segment_threshold,
            "TTS server initialized"
        );

        Ok(Server {
            coordinator: SegmentCoordinator::new(Arc::clone(&provider), tts.max_concurrent),
            provider,
            catalog,
            segment_threshold: tts.segment_threshold,
            min_sentence_length: tts.min_sentence_length,
            max_sentence_length: tts.max_sentence_length,
            max_text_length: tts.max_text_length,
            output_format: tts.default_format.clone(),
        })
    }
}
