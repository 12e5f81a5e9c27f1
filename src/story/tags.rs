//! Hashtag extraction.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Upper bound on tags attached to one story.
pub const MAX_TAGS: usize = 8;

fn hashtag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"))
}

/// Pull every `#word` token out of `response` (Unicode word characters),
/// deduplicated in first-seen order and capped at [`MAX_TAGS`].
///
/// ```rust
/// use voice_to_story::story::extract_hashtags;
///
/// let tags = extract_hashtags("#travel #busan, #travel and #바다");
/// assert_eq!(tags, vec!["#travel", "#busan", "#바다"]);
/// ```
pub fn extract_hashtags(response: &str) -> Vec<String> {
    dedupe_capped(
        hashtag_pattern()
            .find_iter(response)
            .map(|m| m.as_str().to_string()),
        MAX_TAGS,
    )
}

/// Keep the first occurrence of each item, stopping after `max` items.
pub fn dedupe_capped<I>(items: I, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_seen_order() {
        let tags = extract_hashtags("#b #a #b #c #a");
        assert_eq!(tags, vec!["#b", "#a", "#c"]);
    }

    #[test]
    fn caps_at_eight_after_dedup() {
        let response = (0..20)
            .map(|i| format!("#tag{} #tag{}", i, i))
            .collect::<Vec<_>>()
            .join(" ");
        let tags = extract_hashtags(&response);
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags[0], "#tag0");
        assert_eq!(tags[7], "#tag7");
    }

    #[test]
    fn ignores_bare_hash_and_punctuation() {
        let tags = extract_hashtags("# nothing, #ok! (#also)");
        assert_eq!(tags, vec!["#ok", "#also"]);
    }

    #[test]
    fn no_tags_in_plain_text() {
        assert!(extract_hashtags("travel, beach, summer").is_empty());
    }

    #[test]
    fn dedupe_capped_respects_zero() {
        assert!(dedupe_capped(vec!["a".to_string()], 0).is_empty());
    }
}
