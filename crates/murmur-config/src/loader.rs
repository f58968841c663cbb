use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails,
    /// or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the segmentation bounds are contradictory or
    /// a preserve-tag pattern is not valid regex
    pub fn validate(&self) -> anyhow::Result<()> {
        let tts = &self.tts;

        if tts.max_text_length == 0 {
            anyhow::bail!("tts.max_text_length must be greater than 0");
        }

        if tts.min_sentence_length == 0 || tts.max_sentence_length == 0 {
            anyhow::bail!("tts.min_sentence_length and tts.max_sentence_length must be greater than 0");
        }

        if tts.min_sentence_length >= tts.max_sentence_length {
            anyhow::bail!(
                "tts.min_sentence_length ({}) must be below tts.max_sentence_length ({})",
                tts.min_sentence_length,
                tts.max_sentence_length
            );
        }

        if tts.segment_threshold > tts.max_text_length {
            anyhow::bail!(
                "tts.segment_threshold ({}) must not exceed tts.max_text_length ({})",
                tts.segment_threshold,
                tts.max_text_length
            );
        }

        if tts.max_concurrent == 0 {
            anyhow::bail!("tts.max_concurrent must be at least 1");
        }

        for tag in &tts.preserve_tags {
            regex::Regex::new(&tag.pattern)
                .map_err(|e| anyhow::anyhow!("invalid preserve_tags pattern '{}': {e}", tag.name))?;
        }

        Ok(())
    }
}
