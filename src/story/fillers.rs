//! Filler-word (disfluency) bookkeeping for the cleanup stage.

/// Known fillers, English and Korean.
pub const FILLER_WORDS: &[&str] = &[
    "um", "uh", "erm", "hmm", "음", "어", "그", "뭐지", "그게", "아니", "잠깐",
];

/// Lower-cased token with surrounding punctuation removed.
fn normalise(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

fn contains_token(text: &str, word: &str) -> bool {
    text.split_whitespace().any(|t| normalise(t) == word)
}

/// Fillers present in `raw` but absent from `cleaned`, in [`FILLER_WORDS`]
/// order.
///
/// ```rust
/// use voice_to_story::story::removed_fillers;
///
/// let removed = removed_fillers("um so I, uh, left", "So I left.");
/// assert_eq!(removed, vec!["um", "uh"]);
/// ```
pub fn removed_fillers(raw: &str, cleaned: &str) -> Vec<String> {
    FILLER_WORDS
        .iter()
        .filter(|w| contains_token(raw, w) && !contains_token(cleaned, w))
        .map(|w| w.to_string())
        .collect()
}

/// Drop filler tokens and punctuation-only tokens from `text`, collapsing
/// whitespace.
pub fn strip_fillers(text: &str) -> String {
    text.split_whitespace()
        .filter(|t| {
            let n = normalise(t);
            !n.is_empty() && !FILLER_WORDS.contains(&n.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}
