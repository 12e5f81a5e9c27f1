//! Prompts for the three text-transformation stages.
//!
//! [`PromptBuilder::build_chat`] returns a `(system_msg, user_msg)` pair that
//! both the OpenAI-compatible and the native Ollama chat endpoints accept.
//! Every instruction asks the model to answer in the language of the input,
//! so one prompt set serves Korean, English and anything Whisper detects.

// ---------------------------------------------------------------------------
// PromptVariant
// ---------------------------------------------------------------------------

/// Which transformation a collaborator call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptVariant {
    /// Strip disfluencies and filler content.
    Cleanup,
    /// Organise text into a JSON story document.
    Structure,
    /// Extract hashtags.
    Tags,
}

impl PromptVariant {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cleanup => "cleanup",
            Self::Structure => "structure",
            Self::Tags => "tags",
        }
    }

    /// Sampling temperature for this variant.  Structuring must be
    /// deterministic to keep the JSON shape stable.
    pub fn temperature(self) -> f32 {
        match self {
            Self::Cleanup => 0.5,
            Self::Structure => 0.0,
            Self::Tags => 0.3,
        }
    }

    /// Response token budget.
    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Cleanup => 2048,
            Self::Structure => 4096,
            Self::Tags => 256,
        }
    }
}

impl std::fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const CLEANUP_INSTRUCTION: &str = "\
You tidy up speech-recognition transcripts.
Remove:
- filler words and hesitations (um, uh, 음, 어, 그게, 뭐지 …)
- accidental repetitions of the same word or phrase
- self-interruptions (\"no wait\", \"how do I say this\")
Rules:
1. Preserve the speaker's meaning and intent.
2. Rebuild natural, grammatical sentences.
3. Never drop substantive content.
4. Answer in the same language as the transcript.
5. Reply with ONLY the cleaned text, no explanation.";

const STRUCTURE_INSTRUCTION: &str = "\
You organise a spoken story into a logical structure.
Rules:
1. Split into paragraphs by topic or chronology.
2. Give each paragraph a fitting title.
3. Separate key sentences from supporting detail.
4. Answer in the same language as the text.
5. Reply with ONLY a JSON object of this exact shape:
{
  \"title\": \"overall title\",
  \"summary\": \"one-line summary\",
  \"sections\": [
    {\"section_title\": \"section title\", \"content\": \"section text\", \"key_points\": [\"point 1\", \"point 2\"]}
  ]
}";

const TAGS_INSTRUCTION: &str = "\
You turn a story into social-media hashtags.
Pick keywords for: key people, places and events; mood or emotion;
important ideas or themes; words with special meaning in the story.
Rules:
1. Between 3 and 8 hashtags.
2. Every hashtag starts with #.
3. Use the same language as the story.
4. Skip overly generic words.
5. Reply with ONLY the hashtags separated by spaces.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds chat messages for a [`PromptVariant`].
///
/// ```rust
/// use voice_to_story::llm::{PromptBuilder, PromptVariant};
///
/// let (system, user) = PromptBuilder::new().build_chat(PromptVariant::Tags, "We hiked Jirisan.");
/// assert!(system.contains("hashtags"));
/// assert!(user.contains("We hiked Jirisan."));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `(system_msg, user_msg)` for `variant` applied to `text`.
    pub fn build_chat(&self, variant: PromptVariant, text: &str) -> (String, String) {
        let (instruction, label, cue) = match variant {
            PromptVariant::Cleanup => (CLEANUP_INSTRUCTION, "Transcript", "Cleaned text"),
            PromptVariant::Structure => (STRUCTURE_INSTRUCTION, "Text", "Structured JSON"),
            PromptVariant::Tags => (TAGS_INSTRUCTION, "Story", "Hashtags"),
        };
        let user_msg = format!("{label}:\n{text}\n\n{cue}:\n");
        (instruction.to_string(), user_msg)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_prompt_mentions_fillers_and_language() {
        let (system, user) = PromptBuilder::new().build_chat(PromptVariant::Cleanup, "음 안녕");
        assert!(system.contains("filler words"));
        assert!(system.contains("same language"));
        assert!(user.contains("음 안녕"));
        assert!(user.contains("Cleaned text:"));
    }

    #[test]
    fn structure_prompt_describes_json_shape() {
        let (system, _) = PromptBuilder::new().build_chat(PromptVariant::Structure, "x");
        assert!(system.contains("\"section_title\""));
        assert!(system.contains("\"key_points\""));
        assert!(system.contains("JSON"));
    }

    #[test]
    fn tags_prompt_limits_count() {
        let (system, user) = PromptBuilder::new().build_chat(PromptVariant::Tags, "story");
        assert!(system.contains("3 and 8"));
        assert!(user.starts_with("Story:"));
    }

    #[test]
    fn structuring_is_deterministic() {
        assert_eq!(PromptVariant::Structure.temperature(), 0.0);
        assert!(PromptVariant::Cleanup.temperature() > 0.0);
    }

    #[test]
    fn labels_are_distinct() {
        let labels = [
            PromptVariant::Cleanup.label(),
            PromptVariant::Structure.label(),
            PromptVariant::Tags.label(),
        ];
        assert_eq!(
            labels.iter().collect::<std::collections::HashSet<_>>().len(),
            3
        );
    }
}
