#![allow(clippy::must_use_candidate)]

mod loader;
pub mod server;
pub mod tts;

use serde::Deserialize;

pub use server::ServerConfig;
pub use tts::{PreserveTag, TtsConfig};

/// Top-level murmur configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Synthesis configuration
    #[serde(default)]
    pub tts: TtsConfig,
}
