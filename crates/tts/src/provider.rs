use async_trait::async_trait;

use crate::error::Result;
use crate::types::{SpeechRequest, SpeechResponse};

pub mod microsoft;

pub use microsoft::MicrosoftProvider;

/// A speech synthesis backend
///
/// The coordinator and server only ever talk to this trait, so tests can
/// substitute in-process fakes for the vendor.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize one request's text into a single audio blob
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse>;
}
