//! Structured story document and its parsing rules.

use serde::{Deserialize, Serialize};

/// Title used when the collaborator's output could not be parsed.
const FALLBACK_TITLE: &str = "Untitled story";
/// Heading of the single section in a fallback document.
const FALLBACK_SECTION: &str = "Main story";
/// Characters of the text kept in a fallback summary.
const SUMMARY_CHARS: usize = 100;

/// One titled block of the story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "section_title", alias = "title", default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// A story organised into a title, a one-line summary and ordered sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub sections: Vec<Section>,
}

impl StructuredDocument {
    /// Section contents joined with single spaces, or `None` when the
    /// document has no sections.
    pub fn joined_content(&self) -> Option<String> {
        if self.sections.is_empty() {
            return None;
        }
        Some(
            self.sections
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

/// Parse a collaborator response into a document.
///
/// Models like to wrap JSON in prose or Markdown fences, so the outermost
/// `{ … }` span is extracted before deserialising.  Returns `None` when no
/// object with a `sections` array can be found.
pub fn parse_document(response: &str) -> Option<StructuredDocument> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<StructuredDocument>(&response[start..=end]) {
        Ok(doc) => Some(doc),
        Err(e) => {
            log::debug!("story: structured output rejected ({e})");
            None
        }
    }
}

/// Single-section document carrying `text` verbatim.
pub fn fallback_document(text: &str) -> StructuredDocument {
    let summary = if text.chars().count() > SUMMARY_CHARS {
        let head: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    };

    StructuredDocument {
        title: FALLBACK_TITLE.into(),
        summary,
        sections: vec![Section {
            title: FALLBACK_SECTION.into(),
            content: text.to_string(),
            key_points: Vec::new(),
        }],
    }
}
