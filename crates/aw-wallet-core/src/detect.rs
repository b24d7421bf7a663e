use aw_types::{ANTHROPIC_BASE_URL, OPENAI_BASE_URL};

/// Maps a raw API key to the provider base URL its shape implies.
///
/// `sk-` covers both classic OpenAI keys and project-scoped `sk-proj-`
/// keys, and is checked first, so a 39-character `sk-` key still counts
/// as OpenAI. The 39-character hyphenated form matches legacy Anthropic
/// keys. Anything else is unknown and the caller has to ask the user.
pub fn detect_endpoint(api_key: &str) -> Option<&'static str> {
    if api_key.starts_with("sk-") {
        return Some(OPENAI_BASE_URL);
    }
    if api_key.len() == 39 && api_key.contains('-') {
        return Some(ANTHROPIC_BASE_URL);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sk_prefixed_keys_map_to_openai() {
        assert_eq!(detect_endpoint("sk-test-123"), Some(OPENAI_BASE_URL));
        assert_eq!(detect_endpoint("sk-proj-abc123"), Some(OPENAI_BASE_URL));
    }

    #[test]
    fn thirty_nine_char_hyphenated_keys_map_to_anthropic() {
        let key = format!("{}-", "a".repeat(38));
        assert_eq!(key.len(), 39);
        assert_eq!(detect_endpoint(&key), Some(ANTHROPIC_BASE_URL));
    }

    #[test]
    fn sk_prefix_wins_over_the_length_rule() {
        let key = format!("sk-{}", "a".repeat(36));
        assert_eq!(key.len(), 39);
        assert_eq!(detect_endpoint(&key), Some(OPENAI_BASE_URL));
    }

    #[test]
    fn unknown_shapes_detect_nothing() {
        assert_eq!(detect_endpoint(""), None);
        assert_eq!(detect_endpoint("hello"), None);
        assert_eq!(detect_endpoint(&"a".repeat(39)), None, "39 chars but no hyphen");
        assert_eq!(detect_endpoint(&format!("{}-", "a".repeat(37))), None, "38 chars");
    }
}
