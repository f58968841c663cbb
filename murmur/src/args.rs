use std::path::PathBuf;

use clap::Parser;

/// Murmur TTS gateway
#[derive(Debug, Parser)]
#[command(name = "murmur", about = "Segmenting text-to-speech gateway")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "murmur.toml", env = "MURMUR_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "MURMUR_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
