//! Splitting oversized text input into request-sized pieces.
//!
//! Splits prefer natural sentence and paragraph boundaries found in the
//! last 20% of each window, so chunks stay close to the budget without
//! cutting mid-sentence when avoidable.

/// Break markers in priority order. The Devanagari danda, the ideographic
/// full stop, and the fullwidth full stop cover the East-Asian/Indic
/// scripts the UI languages include.
const SENTENCE_BREAKS: [&str; 7] = ["\n\n", "\u{0964}", "\u{3002}", "\u{FF0E}", ".", "\n", " "];

/// Split `text` into ordered chunks of at most `max_size` characters.
///
/// Line endings are normalized to `\n` first; concatenating the returned
/// chunks in order reproduces the normalized text exactly. Each chunk is
/// at most `max_size` characters, except that a window with no acceptable
/// break point is cut at exactly `max_size` (possibly mid-word).
///
/// `max_size` must be positive; callers validate the budget beforehand.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut chunks = Vec::new();
    let mut rest = normalized.as_str();

    loop {
        // Byte offset just past the first `max_size` characters; `None`
        // means the remainder fits in one chunk.
        let window_end = match rest.char_indices().nth(max_size) {
            Some((offset, _)) => offset,
            None => break,
        };
        let window = &rest[..window_end];

        // Only break points at or after 80% of the window are acceptable.
        let zone_chars = max_size * 4 / 5;
        let zone_start = window
            .char_indices()
            .nth(zone_chars)
            .map(|(offset, _)| offset)
            .unwrap_or(window.len());

        let mut split_at = None;
        for marker in SENTENCE_BREAKS {
            if let Some(position) = window[zone_start..].find(marker) {
                split_at = Some(zone_start + position + marker.len());
                break;
            }
        }

        let split_at = split_at.unwrap_or(window_end);
        chunks.push(rest[..split_at].to_string());
        rest = &rest[split_at..];
    }

    chunks.push(rest.to_string());
    chunks
}
