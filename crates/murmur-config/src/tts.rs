use serde::Deserialize;

/// Synthesis configuration
///
/// Numeric limits are counted in characters, not bytes, so multi-byte
/// scripts are budgeted the same as ASCII.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// Voice used when a request does not name one
    #[serde(default = "default_voice")]
    pub default_voice: String,
    /// Speaking rate as a signed percentage, e.g. "0" or "+25"
    #[serde(default = "default_rate")]
    pub default_rate: String,
    /// Pitch as a signed percentage
    #[serde(default = "default_pitch")]
    pub default_pitch: String,
    /// Speaking style applied when the request has none
    #[serde(default = "default_style")]
    pub default_style: String,
    /// Vendor output format name, decides the response content type
    #[serde(default = "default_format")]
    pub default_format: String,
    /// Locale used when one cannot be derived from the voice name
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// Hard cap on request text length in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Text longer than this is split and synthesized in segments
    #[serde(default = "default_segment_threshold")]
    pub segment_threshold: usize,
    /// Segments are merged until they reach this many characters
    #[serde(default = "default_min_sentence_length")]
    pub min_sentence_length: usize,
    /// No merged segment grows beyond this many characters
    #[serde(default = "default_max_sentence_length")]
    pub max_sentence_length: usize,
    /// Concurrent per-segment synthesis calls per request
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Timeout for each outbound vendor call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Markup patterns passed through to the vendor without escaping
    #[serde(default)]
    pub preserve_tags: Vec<PreserveTag>,
    /// Override for the credential bootstrap endpoint
    #[serde(default)]
    pub bootstrap_url: Option<String>,
    /// Override for the voices endpoint, `{region}` is substituted
    #[serde(default)]
    pub voices_url_template: Option<String>,
    /// Override for the synthesis endpoint, `{region}` is substituted
    #[serde(default)]
    pub synthesis_url_template: Option<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            default_voice: default_voice(),
            default_rate: default_rate(),
            default_pitch: default_pitch(),
            default_style: default_style(),
            default_format: default_format(),
            default_locale: default_locale(),
            max_text_length: default_max_text_length(),
            segment_threshold: default_segment_threshold(),
            min_sentence_length: default_min_sentence_length(),
            max_sentence_length: default_max_sentence_length(),
            max_concurrent: default_max_concurrent(),
            request_timeout_seconds: default_request_timeout(),
            preserve_tags: Vec::new(),
            bootstrap_url: None,
            voices_url_template: None,
            synthesis_url_template: None,
        }
    }
}

/// A named markup pattern exempted from SSML escaping
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreserveTag {
    /// Name used in logs and placeholder tokens
    pub name: String,
    /// Regular expression matching the spans to pass through
    pub pattern: String,
}

fn default_voice() -> String {
    "zh-CN-XiaoxiaoMultilingualNeural".to_string()
}

fn default_rate() -> String {
    "0".to_string()
}

fn default_pitch() -> String {
    "0".to_string()
}

fn default_style() -> String {
    "general".to_string()
}

fn default_format() -> String {
    "audio-24khz-48kbitrate-mono-mp3".to_string()
}

fn default_locale() -> String {
    "zh-CN".to_string()
}

const fn default_max_text_length() -> usize {
    20_000
}

const fn default_segment_threshold() -> usize {
    300
}

const fn default_min_sentence_length() -> usize {
    200
}

const fn default_max_sentence_length() -> usize {
    400
}

const fn default_max_concurrent() -> usize {
    10
}

const fn default_request_timeout() -> u64 {
    30
}
