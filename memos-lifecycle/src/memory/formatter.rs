//! Renders retrieved memories into prompt-ready text.

use serde::{Deserialize, Serialize};

use super::record::MemoryRecord;
use crate::text::truncate_with_ellipsis;

/// Maximum number of memories in a context block.
pub const MAX_CONTEXT_ENTRIES: usize = 5;
/// Maximum characters per memory before the ellipsis.
pub const MAX_ENTRY_CHARS: usize = 200;
/// First line of every context block.
pub const CONTEXT_HEADER: &str = "Recent context:";

/// Tag wrapping the block when it is prepended to a conversation.
pub const CONTEXT_TAG: &str = "user_memory_context";
/// Name of the virtual bootstrap file.
pub const BOOTSTRAP_FILE_NAME: &str = "MEMORY_CONTEXT.md";
/// Load order of the virtual bootstrap file.
pub const BOOTSTRAP_FILE_PRIORITY: i32 = 50;

/// A file the host injects into the system prompt without reading it from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapFile {
    /// File name shown to the agent
    pub name: String,
    /// Markdown content
    pub content: String,
    /// Always true: the file does not exist on disk
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    /// Lower loads earlier
    pub priority: i32,
}

/// Formats memory records for injection into a prompt.
pub struct ContextFormatter;

impl ContextFormatter {
    /// Builds the bulleted context block.
    ///
    /// Only the first [`MAX_CONTEXT_ENTRIES`] records are considered; records
    /// without content are skipped. Returns an empty string when nothing is
    /// left to show.
    pub fn format(records: &[MemoryRecord]) -> String {
        let bullets: Vec<String> = records
            .iter()
            .take(MAX_CONTEXT_ENTRIES)
            .filter(|record| record.has_content())
            .map(|record| format!("- {}", truncate_with_ellipsis(&record.content, MAX_ENTRY_CHARS)))
            .collect();

        if bullets.is_empty() {
            return String::new();
        }

        let mut output = String::from(CONTEXT_HEADER);
        for bullet in bullets {
            output.push('\n');
            output.push_str(&bullet);
        }
        output
    }

    /// Wraps a block in the delimiter tag used for prepended context.
    pub fn wrap_for_prompt(block: &str) -> String {
        format!("<{CONTEXT_TAG}>\nRelevant memories from MemOS:\n{block}\n</{CONTEXT_TAG}>")
    }

    /// Wraps a block as the virtual `MEMORY_CONTEXT.md` bootstrap file.
    pub fn bootstrap_file(block: &str) -> BootstrapFile {
        BootstrapFile {
            name: BOOTSTRAP_FILE_NAME.to_string(),
            content: format!("# Memory Context (auto-loaded from MemOS)\n\n{block}"),
            is_virtual: true,
            priority: BOOTSTRAP_FILE_PRIORITY,
        }
    }
}
