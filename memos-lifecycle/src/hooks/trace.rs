//! Tool trace capture.
//!
//! Every completed tool call is stored as a small `tool_trace` memory. The
//! memory system's own tools are excluded, otherwise each search would
//! record a trace that the next search finds, and so on.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::memory::{MemoryBackend, TraceRecord};
use crate::text::truncate_value;
use crate::types::ToolResultEvent;

/// Characters of tool input kept in a trace.
pub const MAX_TRACE_INPUT_CHARS: usize = 300;
/// Characters of tool output kept in a trace.
pub const MAX_TRACE_OUTPUT_CHARS: usize = 500;

const EXCLUDED_PREFIXES: [&str; 3] = ["memos", "memory", "search_memories"];

const EXCLUDED_TOOLS: [&str; 17] = [
    "memos_search",
    "memos_add",
    "memos_update",
    "memos_delete",
    "search_memories",
    "add_memory",
    "update_memory",
    "delete_memory",
    "get_user_info",
    "create_cube",
    "list_cubes",
    "add_preference",
    "get_preferences",
    "add_tool_trace",
    "search_tool_traces",
    "memory_search",
    "memory_save",
];

/// Decides which tools belong to the memory system.
///
/// A tool is excluded if its name is in the exact set or starts with one of
/// the namespace prefixes.
#[derive(Debug, Clone)]
pub struct ToolExclusion {
    names: HashSet<String>,
    prefixes: Vec<String>,
}

impl Default for ToolExclusion {
    fn default() -> Self {
        Self {
            names: EXCLUDED_TOOLS.iter().map(|s| s.to_string()).collect(),
            prefixes: EXCLUDED_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ToolExclusion {
    /// Adds an exact tool name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    /// Adds a namespace prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Whether traces for `tool_name` must not be stored.
    pub fn is_excluded(&self, tool_name: &str) -> bool {
        self.names.contains(tool_name)
            || self
                .prefixes
                .iter()
                .any(|prefix| tool_name.starts_with(prefix.as_str()))
    }
}

/// Records tool invocations as memories.
pub struct ToolTraceRecorder {
    backend: Arc<dyn MemoryBackend>,
    exclusion: ToolExclusion,
}

impl ToolTraceRecorder {
    /// Creates a recorder with the default exclusion set.
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self::with_exclusion(backend, ToolExclusion::default())
    }

    /// Creates a recorder with a custom exclusion set.
    pub fn with_exclusion(backend: Arc<dyn MemoryBackend>, exclusion: ToolExclusion) -> Self {
        Self { backend, exclusion }
    }

    /// Builds the trace for an event, or `None` if it must not be recorded.
    pub fn build_trace(&self, event: &ToolResultEvent) -> Option<TraceRecord> {
        let tool_name = event.tool_name.as_deref().filter(|name| !name.is_empty())?;
        if self.exclusion.is_excluded(tool_name) {
            return None;
        }

        Some(TraceRecord::new(
            tool_name,
            truncate_value(event.params.as_ref(), MAX_TRACE_INPUT_CHARS),
            truncate_value(event.result.as_ref(), MAX_TRACE_OUTPUT_CHARS),
            event.success.unwrap_or(true),
            event.duration_ms.unwrap_or(0),
            Utc::now(),
        ))
    }

    /// Queues a trace for the event. Returns whether one was queued.
    ///
    /// Never waits on the network.
    pub fn on_tool_result(&self, event: &ToolResultEvent) -> bool {
        let Some(trace) = self.build_trace(event) else {
            debug!("Skipping trace for {:?}", event.tool_name);
            return false;
        };

        let content = match trace.to_content() {
            Ok(content) => content,
            Err(e) => {
                debug!("Could not serialize trace for {}: {}", trace.tool, e);
                return false;
            },
        };

        debug!("Recording trace for {} ({}ms)", trace.tool, trace.duration_ms);
        self.backend
            .add(content, vec![TraceRecord::KIND.to_string(), trace.tool]);
        true
    }
}
