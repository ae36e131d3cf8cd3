//! Wire shapes of the memory service and the records built from them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields a memory's text can live under, in priority order.
pub const CONTENT_FIELDS: [&str; 3] = ["memory", "content", "memory_content"];

/// One retrieved memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Free-text content; empty when none of the content fields was set
    pub content: String,
    /// Tags attached by the service
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MemoryRecord {
    /// Creates a record with the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tags: Vec::new(),
        }
    }

    /// Adds tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Builds a record from a raw memory object.
    ///
    /// The first non-empty string among [`CONTENT_FIELDS`] wins. Tags are
    /// read from `tags` or, failing that, `metadata.tags`.
    pub fn from_value(value: &Value) -> Self {
        let content = CONTENT_FIELDS
            .iter()
            .filter_map(|field| value.get(field).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();

        let tags = value
            .get("tags")
            .or_else(|| value.get("metadata").and_then(|m| m.get("tags")))
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self { content, tags }
    }

    /// Whether there is anything worth showing.
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<SearchData>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchData {
    #[serde(default)]
    text_mem: Vec<TextMemBucket>,
}

#[derive(Debug, Default, Deserialize)]
struct TextMemBucket {
    #[serde(default)]
    memories: Vec<Value>,
}

/// Extracts records from a search response (`data.text_mem[0].memories`).
///
/// Any unexpected shape yields an empty list.
pub fn parse_search_response(body: &Value) -> Vec<MemoryRecord> {
    let response: SearchResponse = match serde_json::from_value(body.clone()) {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Unexpected search response shape: {}", e);
            return Vec::new();
        },
    };

    response
        .data
        .and_then(|data| data.text_mem.into_iter().next())
        .map(|bucket| bucket.memories.iter().map(MemoryRecord::from_value).collect())
        .unwrap_or_default()
}

/// Extracts the completion text from `data.response` or `response`.
pub fn parse_completion_response(body: &Value) -> String {
    body.get("data")
        .and_then(|data| data.get("response"))
        .and_then(Value::as_str)
        .or_else(|| body.get("response").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Trace of a single tool invocation, persisted as a memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Always `tool_trace`
    #[serde(rename = "type")]
    pub kind: String,
    /// Tool that ran
    pub tool: String,
    /// Truncated input parameters
    pub input: String,
    /// Truncated output
    pub output: String,
    /// Whether the tool reported success
    pub success: bool,
    /// Reported duration
    pub duration_ms: u64,
    /// RFC 3339 timestamp
    pub ts: String,
}

impl TraceRecord {
    /// Kind marker and tag used for every trace.
    pub const KIND: &'static str = "tool_trace";

    /// Creates a trace stamped with `at`.
    pub fn new(
        tool: impl Into<String>,
        input: String,
        output: String,
        success: bool,
        duration_ms: u64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            tool: tool.into(),
            input,
            output,
            success,
            duration_ms,
            ts: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Serialized form submitted as memory content.
    pub fn to_content(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Facts extracted from one conversation, in service order.
pub type FactList = Vec<String>;
