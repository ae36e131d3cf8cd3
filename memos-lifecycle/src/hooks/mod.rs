//! Lifecycle hooks
//!
//! The pipelines that run on host events, plus the [`MemosLifecycle`] plugin
//! that dispatches to them:
//!
//! - **session start / bootstrap**: [`ContextInjector`] loads relevant memories
//! - **session end**: [`AutoCapture`] extracts and stores durable facts
//! - **tool result**: [`ToolTraceRecorder`] stores a trace of the invocation
//!
//! None of them ever return an error to the host.

mod capture;
mod context_injection;
mod lifecycle;
mod trace;

pub use capture::{
    AutoCapture, CaptureOutcome, CaptureThrottle, DEFAULT_THROTTLE_WINDOW, FACT_TAGS,
    MAX_MESSAGE_CHARS, MIN_EXCHANGE_MESSAGES, MIN_FACT_CHARS,
};
pub use context_injection::{
    BOOTSTRAP_QUERY, ContextInjector, MIN_PROMPT_CHARS, PROMPT_QUERY_CHARS, SESSION_QUERY_PREFIX,
};
pub use lifecycle::{
    LifecycleHook, MemosLifecycle, MemosLifecycleBuilder, PLUGIN_DESCRIPTION, PLUGIN_ID,
    PLUGIN_KIND, PLUGIN_NAME,
};
pub use trace::{MAX_TRACE_INPUT_CHARS, MAX_TRACE_OUTPUT_CHARS, ToolExclusion, ToolTraceRecorder};
