use serde::{Deserialize, Serialize};

/// Speech synthesis request
///
/// Optional prosody fields fall back to configured defaults when absent
/// or empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeechRequest {
    /// Text to synthesize into speech
    pub text: String,
    /// Voice identifier (e.g. "en-US-AriaNeural")
    #[serde(default)]
    pub voice: Option<String>,
    /// Speaking rate as a signed percentage (e.g. "+25")
    #[serde(default)]
    pub rate: Option<String>,
    /// Pitch as a signed percentage
    #[serde(default)]
    pub pitch: Option<String>,
    /// Speaking style (e.g. "cheerful")
    #[serde(default)]
    pub style: Option<String>,
}

/// Raw audio response from the synthesis pipeline
#[derive(Debug)]
pub struct SpeechResponse {
    /// Raw audio bytes
    pub audio: Vec<u8>,
    /// Content type of the audio (e.g. "audio/mpeg")
    pub content_type: String,
}

impl axum::response::IntoResponse for SpeechResponse {
    fn into_response(self) -> axum::response::Response {
        ([(http::header::CONTENT_TYPE, self.content_type)], self.audio).into_response()
    }
}

/// A synthesizable voice, normalized from the vendor's catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    /// Fully-qualified voice identifier
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Name localized to the voice's own language
    pub local_name: String,
    /// Short identifier used in synthesis requests
    pub short_name: String,
    /// "Female" or "Male"
    pub gender: String,
    /// BCP-47 locale (e.g. "en-US")
    pub locale: String,
    /// Localized locale display name
    pub locale_name: String,
    /// Speaking styles this voice supports
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub style_list: Vec<String>,
    /// Native sample rate as reported by the vendor
    pub sample_rate_hertz: String,
}

/// A contiguous, ordered slice of request text synthesized independently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 0-based position in the original text
    pub index: usize,
    /// Chunk text
    pub content: String,
}

/// Content type implied by a vendor output format name
pub fn content_type_for_format(format: &str) -> &'static str {
    match format {
        "raw-16khz-16bit-mono-pcm" | "raw-24khz-16bit-mono-pcm" => "audio/pcm",
        "raw-8khz-8bit-mono-mulaw" => "audio/basic",
        "riff-8khz-8bit-mono-alaw" => "audio/alaw",
        "riff-8khz-8bit-mono-mulaw" => "audio/mulaw",
        "riff-16khz-16bit-mono-pcm" | "riff-24khz-16bit-mono-pcm" => "audio/wav",
        "ogg-24khz-16bit-mono-opus" => "audio/ogg",
        "webm-24khz-16bit-mono-opus" => "audio/webm",
        _ => "audio/mpeg",
    }
}

/// File extension used for intermediate segment files during merge
pub(crate) fn extension_for_format(format: &str) -> &'static str {
    if format.contains("mp3") {
        "mp3"
    } else if format.starts_with("riff") {
        "wav"
    } else if format.starts_with("ogg") {
        "ogg"
    } else if format.starts_with("webm") {
        "webm"
    } else {
        "bin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp3_formats_map_to_mpeg() {
        assert_eq!(content_type_for_format("audio-24khz-48kbitrate-mono-mp3"), "audio/mpeg");
        assert_eq!(content_type_for_format("audio-16khz-64kbitrate-mono-mp3"), "audio/mpeg");
    }

    #[test]
    fn riff_formats_map_to_wav() {
        assert_eq!(content_type_for_format("riff-24khz-16bit-mono-pcm"), "audio/wav");
    }

    #[test]
    fn unknown_format_falls_back_to_mpeg() {
        assert_eq!(content_type_for_format("something-new"), "audio/mpeg");
    }

    #[test]
    fn merge_extension_tracks_format_family() {
        assert_eq!(extension_for_format("audio-24khz-48kbitrate-mono-mp3"), "mp3");
        assert_eq!(extension_for_format("riff-24khz-16bit-mono-pcm"), "wav");
        assert_eq!(extension_for_format("webm-24khz-16bit-mono-opus"), "webm");
    }
}
