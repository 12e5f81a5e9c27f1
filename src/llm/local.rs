//! Offline, rule-based [`TextTransformer`].
//!
//! Selected with `provider = "Local"`.  It never touches the network:
//!
//! * cleanup strips known filler words and collapses whitespace;
//! * structuring echoes the text, which is not JSON, so the structuring
//!   stage falls back to its single-section document;
//! * tag extraction ranks words by frequency and emits them as hashtags.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::llm::prompt::PromptVariant;
use crate::llm::transformer::{LlmError, TextTransformer};
use crate::story::{strip_fillers, MAX_TAGS};

/// Words too common to make useful tags.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "this", "that", "with", "have", "has", "had",
    "but", "not", "you", "your", "our", "they", "them", "then", "there", "from", "into", "just",
    "about", "what", "when", "which", "will", "would", "could", "should", "been", "its", "it's",
    "그리고", "그래서", "하지만", "그런데",
];

/// Shortest word (in characters) considered for a tag.
const MIN_TAG_CHARS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct LocalTransformer;

impl LocalTransformer {
    pub fn new() -> Self {
        Self
    }

    fn hashtags(text: &str) -> String {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let words = text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| w.chars().count() >= MIN_TAG_CHARS && !STOPWORDS.contains(&w.as_str()));

        for (position, word) in words.enumerate() {
            counts.entry(word).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(word, (count, first))| (word, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(MAX_TAGS)
            .map(|(word, _, _)| format!("#{word}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl TextTransformer for LocalTransformer {
    async fn transform(&self, text: &str, variant: PromptVariant) -> Result<String, LlmError> {
        Ok(match variant {
            PromptVariant::Cleanup => strip_fillers(text),
            PromptVariant::Structure => text.trim().to_string(),
            PromptVariant::Tags => Self::hashtags(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::{extract_hashtags, parse_document};

    #[tokio::test]
    async fn cleanup_strips_fillers() {
        let out = LocalTransformer::new()
            .transform("um so we, uh, went hiking", PromptVariant::Cleanup)
            .await
            .unwrap();
        assert_eq!(out, "so we, went hiking");
    }

    #[tokio::test]
    async fn structure_output_is_not_a_document() {
        let out = LocalTransformer::new()
            .transform("We went hiking.", PromptVariant::Structure)
            .await
            .unwrap();
        assert!(parse_document(&out).is_none());
    }

    #[tokio::test]
    async fn tags_rank_by_frequency_then_position() {
        let out = LocalTransformer::new()
            .transform(
                "Hiking Jirisan. The hiking trail was steep; Jirisan views, hiking again.",
                PromptVariant::Tags,
            )
            .await
            .unwrap();
        let tags = extract_hashtags(&out);
        assert_eq!(tags[0], "#hiking");
        assert_eq!(tags[1], "#jirisan");
        assert!(!tags.contains(&"#the".to_string()));
    }

    #[tokio::test]
    async fn tags_are_capped() {
        let text = (0..30).map(|i| format!("word{i:02}")).collect::<Vec<_>>().join(" ");
        let out = LocalTransformer::new()
            .transform(&text, PromptVariant::Tags)
            .await
            .unwrap();
        assert_eq!(extract_hashtags(&out).len(), MAX_TAGS);
    }
}
