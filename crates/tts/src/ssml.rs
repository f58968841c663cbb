use murmur_config::PreserveTag;
use regex::Regex;

use crate::error::{Result, TtsError};

/// Escapes text for SSML embedding while leaving configured markup spans
/// untouched
///
/// Spans matched by a preserve pattern are swapped for opaque
/// placeholders before the bulk XML escape and restored verbatim after,
/// so callers can pass through raw SSML fragments like `<break/>`.
#[derive(Debug)]
pub struct SsmlEscaper {
    patterns: Vec<(String, Regex)>,
}

impl SsmlEscaper {
    pub fn new(tags: &[PreserveTag]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(tags.len());
        for tag in tags {
            let regex = Regex::new(&tag.pattern).map_err(|e| {
                TtsError::Config(format!("invalid preserve pattern {:?}: {e}", tag.name))
            })?;
            patterns.push((tag.name.clone(), regex));
        }
        Ok(Self { patterns })
    }

    pub fn escape(&self, text: &str) -> String {
        let mut preserved: Vec<(String, String)> = Vec::new();
        let mut working = text.to_string();

        for (name, regex) in &self.patterns {
            let mut counter = 0usize;
            working = regex
                .replace_all(&working, |caps: &regex::Captures<'_>| {
                    let placeholder = format!("__SSML_PRESERVE_{name}_{counter}__");
                    preserved.push((placeholder.clone(), caps[0].to_string()));
                    counter += 1;
                    placeholder
                })
                .into_owned();
        }

        let mut escaped = xml_escape(&working);
        for (placeholder, original) in preserved {
            escaped = escaped.replace(&placeholder, &original);
        }
        escaped
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Normalize a rate/pitch value to a signed percentage ("25" -> "+25%")
fn signed_percent(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with('+') || trimmed.starts_with('-') {
        format!("{trimmed}%")
    } else {
        format!("+{trimmed}%")
    }
}

/// Render the vendor's SSML document for one chunk of escaped text
pub fn build_document(
    locale: &str,
    voice: &str,
    style: &str,
    rate: &str,
    pitch: &str,
    escaped_text: &str,
) -> String {
    format!(
        "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' \
         xmlns:mstts='http://www.w3.org/2001/mstts' xml:lang='{locale}'>\
         <voice name='{voice}'>\
         <mstts:express-as style='{style}'>\
         <prosody rate='{rate}' pitch='{pitch}'>{escaped_text}</prosody>\
         </mstts:express-as></voice></speak>",
        rate = signed_percent(rate),
        pitch = signed_percent(pitch),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaper(tags: &[(&str, &str)]) -> SsmlEscaper {
        let tags: Vec<PreserveTag> = tags
            .iter()
            .map(|(name, pattern)| PreserveTag {
                name: (*name).to_string(),
                pattern: (*pattern).to_string(),
            })
            .collect();
        SsmlEscaper::new(&tags).unwrap()
    }

    #[test]
    fn plain_text_is_xml_escaped() {
        let escaper = escaper(&[]);
        assert_eq!(
            escaper.escape("a < b & \"c\" > 'd'"),
            "a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;"
        );
    }

    #[test]
    fn preserved_spans_pass_through_verbatim() {
        let escaper = escaper(&[("break", r"<break\s*/>")]);
        let out = escaper.escape("pause <break/> then <b>bold</b>");
        assert_eq!(out, "pause <break/> then &lt;b&gt;bold&lt;/b&gt;");
    }

    #[test]
    fn repeated_preserved_spans_each_survive() {
        let escaper = escaper(&[("break", r"<break\s*/>")]);
        let out = escaper.escape("<break/> & <break />");
        assert_eq!(out, "<break/> &amp; <break />");
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let tags = vec![PreserveTag { name: "bad".into(), pattern: "(".into() }];
        let err = SsmlEscaper::new(&tags).unwrap_err();
        assert!(matches!(err, TtsError::Config(_)));
    }

    #[test]
    fn document_carries_signed_percentages() {
        let doc = build_document("en-US", "en-US-AriaNeural", "cheerful", "25", "-10", "hello");
        assert!(doc.contains("rate='+25%'"));
        assert!(doc.contains("pitch='-10%'"));
        assert!(doc.contains("xml:lang='en-US'"));
        assert!(doc.contains("<voice name='en-US-AriaNeural'>"));
        assert!(doc.contains("style='cheerful'"));
        assert!(doc.contains(">hello</prosody>"));
    }

    #[test]
    fn explicit_plus_is_not_doubled() {
        let doc = build_document("en-US", "v", "general", "+5", "0", "x");
        assert!(doc.contains("rate='+5%'"));
        assert!(doc.contains("pitch='+0%'"));
    }
}
