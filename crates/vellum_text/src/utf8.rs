//! Incremental UTF-8 decoding for the text cursor

pub const REPLACEMENT: char = '\u{FFFD}';

/// Decode the codepoint at the start of `bytes`.
///
/// Returns the character and the number of bytes it took. Malformed input
/// decodes to U+FFFD and consumes the invalid bytes (at least one), so a
/// caller always makes progress. `None` only for empty input.
pub fn decode(bytes: &[u8]) -> Option<(char, usize)> {
    let first = *bytes.first()?;
    if first < 0x80 {
        return Some((first as char, 1));
    }

    let window = &bytes[..bytes.len().min(4)];
    let valid = match std::str::from_utf8(window) {
        Ok(s) => s,
        Err(e) if e.valid_up_to() > 0 => {
            // Only the prefix is valid; it still starts with a whole codepoint
            std::str::from_utf8(&window[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(e) => return Some((REPLACEMENT, e.error_len().unwrap_or(window.len()))),
    };

    valid.chars().next().map(|c| (c, c.len_utf8()))
}
