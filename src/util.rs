/// Lossy UTF-8 decode, cut to at most `max_bytes`.
pub fn truncate_bytes(bytes: &[u8], max_bytes: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    truncate_string(&text, max_bytes)
}

/// Cut `text` to at most `max_bytes` without splitting a character.
pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    let end = text
        .char_indices()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_string("abc", 10), "abc");
        assert_eq!(truncate_string("abc", 0), "");
        assert_eq!(truncate_string("가나다", 7), "가나");
        assert_eq!(truncate_bytes(&[0x61, 0xff, 0x62], 100), "a\u{fffd}b");
    }
}
