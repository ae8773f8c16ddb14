/// Canonical form of a topic used for matching and key derivation.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Reuse/cache key for a (topic, model) pair. Every place that derives a key
/// must go through this function so the cache and the store agree.
pub fn cache_key(topic: &str, model: &str) -> String {
    format!("{}:{}", normalize_topic(topic), model.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(
            cache_key("Photosynthesis ", "gpt-4o-mini"),
            cache_key("photosynthesis", "gpt-4o-mini")
        );
        assert_eq!(cache_key("  World War II\t", "claude-3-haiku"), "world war ii:claude-3-haiku");
    }

    #[test]
    fn key_distinguishes_models() {
        assert_ne!(cache_key("rust", "gpt-4o"), cache_key("rust", "gemini-1.5-flash"));
    }
}
