/// Split `text` into pieces of at most `limit` characters, in order.
///
/// Lengths count Unicode scalar values, so no piece ever splits a character.
/// Concatenating the pieces gives back `text` exactly. Empty text yields no
/// pieces. A `limit` of zero is treated as one.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    split_by(text, limit.max(1), |_| 1)
}

/// Like [`split_chunks`], but measured in UTF-16 code units, the unit Telegram
/// uses for its message limit. A character outside the BMP counts as two, so
/// `limit` is raised to at least two.
pub fn split_utf16(text: &str, limit: usize) -> Vec<String> {
    split_by(text, limit.max(2), char::len_utf16)
}

fn split_by(text: &str, limit: usize, width: impl Fn(char) -> usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut used = 0;

    for ch in text.chars() {
        let w = width(ch);
        if used + w > limit {
            chunks.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(ch);
        used += w;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
