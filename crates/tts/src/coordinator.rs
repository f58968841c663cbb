use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TtsError};
use crate::provider::TtsProvider;
use crate::types::{SpeechRequest, TextChunk};

/// Fans chunk synthesis out across a bounded pool of concurrent calls
///
/// Results come back in original chunk order regardless of completion
/// order. The first hard failure aborts all in-flight work; a fired
/// cancellation token yields `TtsError::Cancelled` and never partial
/// output.
pub struct SegmentCoordinator {
    provider: Arc<dyn TtsProvider>,
    max_concurrent: usize,
}

impl SegmentCoordinator {
    pub fn new(provider: Arc<dyn TtsProvider>, max_concurrent: usize) -> Self {
        Self { provider, max_concurrent }
    }

    pub async fn run(
        &self,
        base: &SpeechRequest,
        chunks: Vec<TextChunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<u8>>> {
        let total = chunks.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<Result<(usize, Vec<u8>)>> = JoinSet::new();

        for chunk in chunks {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let request = SpeechRequest { text: chunk.content, ..base.clone() };
            let index = chunk.index;

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    () = cancel.cancelled() => return Err(TtsError::Cancelled),
                    permit = semaphore.acquire_owned() => {
                        permit.map_err(|_| TtsError::Internal(Some("semaphore closed".to_string())))?
                    }
                };

                let started = Instant::now();
                let response = tokio::select! {
                    () = cancel.cancelled() => return Err(TtsError::Cancelled),
                    result = provider.synthesize(&request) => result?,
                };

                tracing::debug!(
                    index,
                    bytes = response.audio.len(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "segment synthesized"
                );
                Ok((index, response.audio))
            });
        }

        let mut slots: Vec<Option<Vec<u8>>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, audio))) => slots[index] = Some(audio),
                Ok(Err(error)) => {
                    tasks.abort_all();
                    return Err(error);
                }
                Err(join_error) => {
                    tasks.abort_all();
                    return Err(TtsError::Internal(Some(format!("segment task failed: {join_error}"))));
                }
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TtsError::Internal(Some("segment result slot left empty".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::types::SpeechResponse;

    /// Echoes chunk text back as bytes, slower for earlier indices so
    /// completion order inverts submission order
    struct EchoProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl TtsProvider for EchoProvider {
        async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);

            let delay = 50u64.saturating_sub(u64::try_from(request.text.len()).unwrap_or(0));
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(SpeechResponse {
                audio: request.text.as_bytes().to_vec(),
                content_type: "audio/mpeg".to_string(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl TtsProvider for FailingProvider {
        async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse> {
            if request.text == "poison" {
                return Err(TtsError::ProviderApi { status: 500, message: "boom".to_string() });
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(SpeechResponse { audio: vec![0], content_type: "audio/mpeg".to_string() })
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl TtsProvider for SlowProvider {
        async fn synthesize(&self, _request: &SpeechRequest) -> Result<SpeechResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(SpeechResponse { audio: vec![0], content_type: "audio/mpeg".to_string() })
        }
    }

    fn chunks(texts: &[&str]) -> Vec<TextChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| TextChunk { index, content: (*text).to_string() })
            .collect()
    }

    #[tokio::test]
    async fn output_order_matches_chunk_order() {
        let provider = Arc::new(EchoProvider::new());
        let coordinator = SegmentCoordinator::new(provider, 4);

        // Shorter texts sleep longer, so later chunks finish first
        let blobs = coordinator
            .run(
                &SpeechRequest::default(),
                chunks(&["a", "bb", "ccc", "dddd"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let texts: Vec<&[u8]> = blobs.iter().map(Vec::as_slice).collect();
        assert_eq!(texts, vec![b"a" as &[u8], b"bb", b"ccc", b"dddd"]);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_the_limit() {
        let provider = Arc::new(EchoProvider::new());
        let coordinator = SegmentCoordinator::new(Arc::clone(&provider) as Arc<dyn TtsProvider>, 2);

        let many: Vec<String> = (0..12).map(|i| format!("chunk-{i}")).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        coordinator
            .run(&SpeechRequest::default(), chunks(&refs), &CancellationToken::new())
            .await
            .unwrap();

        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn first_failure_fails_the_whole_request() {
        let coordinator = SegmentCoordinator::new(Arc::new(FailingProvider), 4);

        let err = coordinator
            .run(
                &SpeechRequest::default(),
                chunks(&["fine", "poison", "fine"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TtsError::ProviderApi { status: 500, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn cancellation_yields_cancelled_not_partial_output() {
        let coordinator = SegmentCoordinator::new(Arc::new(SlowProvider), 4);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = coordinator
            .run(&SpeechRequest::default(), chunks(&["a", "b", "c"]), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, TtsError::Cancelled), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_chunk_list_yields_empty_output() {
        let coordinator = SegmentCoordinator::new(Arc::new(EchoProvider::new()), 4);
        let blobs = coordinator
            .run(&SpeechRequest::default(), Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(blobs.is_empty());
    }
}
