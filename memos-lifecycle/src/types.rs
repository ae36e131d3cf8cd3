//! Host lifecycle event payloads and hook outputs.
//!
//! Payloads are deserialized leniently: hosts send loosely-typed JSON and a
//! malformed field must never make a hook fail.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::memory::BootstrapFile;

// ============================================================================
// Event inputs
// ============================================================================

/// Fired before the agent starts working on a prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStartEvent {
    /// The user's prompt, if the host provides one
    #[serde(default)]
    pub prompt: Option<String>,
}

impl SessionStartEvent {
    /// Event for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
        }
    }
}

/// Fired once the agent finished a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionEndEvent {
    /// Whether the session completed successfully
    #[serde(default)]
    pub success: bool,
    /// Conversation in order; entries that are not objects are dropped
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Vec<ConversationMessage>,
}

/// One message of a finished conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// `user`, `assistant`, `system`, `tool`, ...
    #[serde(default)]
    pub role: String,
    /// Message body
    #[serde(default)]
    pub content: MessageContent,
}

impl ConversationMessage {
    /// Plain-text message.
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Whether this message belongs to the user/assistant exchange.
    pub fn is_dialogue(&self) -> bool {
        matches!(self.role.as_str(), "user" | "assistant")
    }
}

/// Message body: plain text or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain string body
    Text(String),
    /// Structured content blocks; elements that are not valid blocks are dropped
    #[serde(deserialize_with = "lenient_blocks")]
    Blocks(Vec<ContentBlock>),
    /// Anything else the host sends
    Other(Value),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Other(Value::Null)
    }
}

impl MessageContent {
    /// Flattens to plain text: text blocks joined by a space, other shapes empty.
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter(|block| block.kind == "text")
                .filter_map(|block| block.text.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Other(_) => String::new(),
        }
    }
}

/// One structured content block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Block type, e.g. `text`, `tool_use`, `image`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Text of `text` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Fired after every tool invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultEvent {
    /// Tool that ran
    #[serde(default, alias = "tool_name")]
    pub tool_name: Option<String>,
    /// Input parameters
    #[serde(default, alias = "input")]
    pub params: Option<Value>,
    /// Tool output
    #[serde(default, alias = "message", alias = "output")]
    pub result: Option<Value>,
    /// Whether the tool succeeded; assumed true when absent
    #[serde(default)]
    pub success: Option<bool>,
    /// Wall-clock duration in milliseconds
    #[serde(
        default,
        alias = "duration",
        alias = "duration_ms",
        deserialize_with = "lenient_millis"
    )]
    pub duration_ms: Option<u64>,
}

impl ToolResultEvent {
    /// Event for the given tool.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            ..Default::default()
        }
    }

    /// Sets input and output.
    pub fn with_io(mut self, params: Value, result: Value) -> Self {
        self.params = Some(params);
        self.result = Some(result);
        self
    }
}

fn lenient_messages<'de, D>(deserializer: D) -> Result<Vec<ConversationMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

fn lenient_blocks<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|ms| *ms >= 0.0).map(|ms| ms.round() as u64))
    }))
}

/// Every event the lifecycle hooks react to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Agent is about to start on a prompt
    SessionStart(SessionStartEvent),
    /// Agent bootstrap files are being assembled
    Bootstrap,
    /// Agent finished
    SessionEnd(SessionEndEvent),
    /// A tool finished
    ToolResult(ToolResultEvent),
}

// ============================================================================
// Hook outputs
// ============================================================================

/// Context the host prepends to the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrependContext {
    /// Text to prepend
    #[serde(rename = "prependContext")]
    pub prepend_context: String,
}

/// Result of dispatching a [`LifecycleEvent`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleOutput {
    /// Context to prepend (session start only)
    #[serde(rename = "prependContext", skip_serializing_if = "Option::is_none")]
    pub prepend_context: Option<String>,
    /// Virtual bootstrap file (bootstrap only)
    #[serde(rename = "bootstrapFile", skip_serializing_if = "Option::is_none")]
    pub bootstrap_file: Option<BootstrapFile>,
}

impl LifecycleOutput {
    /// Nothing for the host to do.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether the output carries anything.
    pub fn is_empty(&self) -> bool {
        self.prepend_context.is_none() && self.bootstrap_file.is_none()
    }
}

impl From<Option<PrependContext>> for LifecycleOutput {
    fn from(context: Option<PrependContext>) -> Self {
        Self {
            prepend_context: context.map(|c| c.prepend_context),
            bootstrap_file: None,
        }
    }
}

impl From<Option<BootstrapFile>> for LifecycleOutput {
    fn from(file: Option<BootstrapFile>) -> Self {
        Self {
            prepend_context: None,
            bootstrap_file: file,
        }
    }
}
