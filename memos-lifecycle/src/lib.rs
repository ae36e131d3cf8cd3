//! # MemOS Lifecycle Hooks for Rust
//!
//! Gives an AI agent host long-term memory backed by a MemOS service. The
//! host reports lifecycle events, and the hooks react to them:
//!
//! ## Features
//!
//! - **Context Injection**: relevant memories are prepended when a session starts
//! - **Bootstrap Context**: a virtual `MEMORY_CONTEXT.md` for agent bootstrap
//! - **Auto Capture**: durable facts are extracted when a session ends, throttled
//! - **Tool Traces**: every non-memory tool call is stored as a trace
//! - **Fail Open**: a slow or absent memory service never breaks the host
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memos_lifecycle::{LifecycleEvent, LifecycleHook, MemosClient, MemosConfig, MemosLifecycle, Result};
//! use memos_lifecycle::types::SessionStartEvent;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(MemosClient::new(MemosConfig::from_env())?);
//!     let plugin = MemosLifecycle::new(client.clone());
//!
//!     let event = LifecycleEvent::SessionStart(SessionStartEvent::new("Where did we leave the migration?"));
//!     let output = plugin.handle(&event).await;
//!     println!("{:?}", output.prepend_context);
//!
//!     client.shutdown(std::time::Duration::from_secs(5)).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
mod errors;
pub mod hooks;
pub mod memory;
pub mod text;
pub mod types;

// Re-export main types
pub use config::{Credentials, MemosConfig, WriterConfig};
pub use errors::{MemosError, Result};
pub use hooks::{
    AutoCapture, CaptureOutcome, CaptureThrottle, ContextInjector, LifecycleHook, MemosLifecycle,
    MemosLifecycleBuilder, ToolExclusion, ToolTraceRecorder,
};
pub use memory::{BootstrapFile, MemoryBackend, MemoryRecord, MemosClient, TraceRecord, WriterStats};
pub use types::{
    ContentBlock, ConversationMessage, LifecycleEvent, LifecycleOutput, MessageContent,
    PrependContext, SessionEndEvent, SessionStartEvent, ToolResultEvent,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        LifecycleEvent, LifecycleHook, LifecycleOutput, MemoryBackend, MemosClient, MemosConfig,
        MemosError, MemosLifecycle, Result,
    };
}
