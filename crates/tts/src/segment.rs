use crate::types::TextChunk;

/// Texts shorter than this are never worth splitting
const TRIVIAL_LENGTH: usize = 100;

/// Characters that end a sentence and may close a chunk
const TERMINATORS: [char; 10] = ['.', '!', '?', ';', '\n', '。', '！', '？', '；', '…'];

/// Split `text` into ordered chunks suitable for independent synthesis
///
/// Chunks break on sentence terminators, then short fragments are merged
/// back together so each synthesis call carries a reasonable amount of
/// text. All lengths are counted in characters, not bytes. The chunks
/// concatenate back to the input modulo trimmed whitespace, and no chunk
/// exceeds `max_len` unless a single terminator-free run already did.
pub fn segment(text: &str, min_len: usize, max_len: usize) -> Vec<TextChunk> {
    if text.chars().count() < TRIVIAL_LENGTH {
        return vec![TextChunk { index: 0, content: text.to_string() }];
    }

    let sentences = hard_split(text, max_len);
    let merged = merge_short(sentences, min_len, max_len);

    merged
        .into_iter()
        .enumerate()
        .map(|(index, content)| TextChunk { index, content })
        .collect()
}

/// First pass: cut on sentence terminators, or at `max_len` as a last
/// resort for terminator-free runs
fn hard_split(text: &str, max_len: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let mut flush = |buf: &mut String, len: &mut usize| {
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
        buf.clear();
        *len = 0;
    };

    for ch in text.chars() {
        current.push(ch);
        current_len += 1;
        if TERMINATORS.contains(&ch) || current_len >= max_len {
            flush(&mut current, &mut current_len);
        }
    }
    flush(&mut current, &mut current_len);

    sentences
}

/// Second pass: grow each chunk to at least `min_len` without letting a
/// merge push it past `max_len`
fn merge_short(sentences: Vec<String>, min_len: usize, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for sentence in sentences {
        let sentence_len = sentence.chars().count();

        // The separator newline counts toward the bound
        if buffer_len > 0 && buffer_len + 1 + sentence_len > max_len {
            chunks.push(std::mem::take(&mut buffer));
            buffer_len = 0;
        }

        if buffer_len > 0 {
            buffer.push('\n');
            buffer_len += 1;
        }
        buffer.push_str(&sentence);
        buffer_len += sentence_len;

        if buffer_len >= min_len {
            chunks.push(std::mem::take(&mut buffer));
            buffer_len = 0;
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
}
