//! Fact extraction through the service's completion endpoint.
//!
//! The remote model is asked for a JSON array but nothing guarantees it
//! answers with pure JSON, so the response is scanned for the first
//! bracketed array and anything unparseable counts as "no facts".

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use super::client::MemoryBackend;
use super::record::FactList;
use crate::text::take_chars;

/// Characters of conversation sent for analysis.
pub const MAX_TRANSCRIPT_CHARS: usize = 3000;

const EXTRACTION_PROMPT: &str = "Analyze this conversation and extract ONLY important facts worth remembering long-term.
Focus on:
- User preferences and habits
- Personal information (location, timezone, work)
- Important decisions made
- Technical details about projects
- Anything explicitly asked to remember

Return as JSON array of strings. If nothing important, return empty array [].
Max 3 facts per conversation.

Conversation:
";

fn array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[\s\S]*?\]").expect("static regex is valid"))
}

/// Pulls facts out of a conversation transcript.
pub struct FactExtractor {
    backend: Arc<dyn MemoryBackend>,
}

impl FactExtractor {
    /// Creates an extractor using `backend` for completions.
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self { backend }
    }

    /// Builds the instruction prompt for a (truncated) transcript.
    pub fn build_prompt(conversation: &str) -> String {
        format!(
            "{EXTRACTION_PROMPT}{}",
            take_chars(conversation, MAX_TRANSCRIPT_CHARS)
        )
    }

    /// Extracts facts; any failure yields an empty list.
    pub async fn extract(&self, conversation: &str) -> FactList {
        let prompt = Self::build_prompt(conversation);

        match self.backend.complete(&prompt).await {
            Ok(response) => {
                let facts = parse_fact_array(&response);
                debug!("Extracted {} facts", facts.len());
                facts
            },
            Err(e) => {
                warn!("Fact extraction failed: {}", e);
                Vec::new()
            },
        }
    }
}

/// Parses the first `[...]` in `text` as a JSON array of strings.
///
/// Non-string elements are skipped. No array, or an array that is not valid
/// JSON, gives an empty list.
pub fn parse_fact_array(text: &str) -> FactList {
    let Some(found) = array_pattern().find(text) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<Value>>(found.as_str()) {
        Ok(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Err(e) => {
            debug!("Completion contained an unparseable array: {}", e);
            Vec::new()
        },
    }
}
