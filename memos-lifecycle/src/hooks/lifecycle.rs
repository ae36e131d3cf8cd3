//! The lifecycle plugin: one object the host dispatches every event to.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::capture::{AutoCapture, CaptureOutcome, CaptureThrottle};
use super::context_injection::ContextInjector;
use super::trace::{ToolExclusion, ToolTraceRecorder};
use crate::memory::MemoryBackend;
use crate::types::{LifecycleEvent, LifecycleOutput};

/// Plugin identifier reported to the host.
pub const PLUGIN_ID: &str = "openclaw-memos-lifecycle-plugin";
/// Human-readable plugin name.
pub const PLUGIN_NAME: &str = "MemOS Lifecycle";
/// Plugin description.
pub const PLUGIN_DESCRIPTION: &str = "Pre-loads memory context, auto-saves session info";
/// Plugin kind.
pub const PLUGIN_KIND: &str = "lifecycle";

/// Receives host lifecycle events.
///
/// Implementations must not fail: whatever goes wrong inside, the host gets
/// an output (possibly empty) and carries on.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Handles one event.
    async fn handle(&self, event: &LifecycleEvent) -> LifecycleOutput;
}

/// Context injection, fact capture and tool tracing behind one entry point.
pub struct MemosLifecycle {
    injector: ContextInjector,
    capture: AutoCapture,
    tracer: ToolTraceRecorder,
}

impl MemosLifecycle {
    /// Builds the plugin around `backend` with the default throttle window.
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self::builder(backend).build()
    }

    /// Starts a builder.
    pub fn builder(backend: Arc<dyn MemoryBackend>) -> MemosLifecycleBuilder {
        MemosLifecycleBuilder {
            backend,
            throttle: None,
            exclusion: ToolExclusion::default(),
        }
    }

    /// Session-start pipeline.
    pub fn injector(&self) -> &ContextInjector {
        &self.injector
    }

    /// Session-end pipeline.
    pub fn capture(&self) -> &AutoCapture {
        &self.capture
    }

    /// Tool-trace pipeline.
    pub fn tracer(&self) -> &ToolTraceRecorder {
        &self.tracer
    }
}

#[async_trait]
impl LifecycleHook for MemosLifecycle {
    async fn handle(&self, event: &LifecycleEvent) -> LifecycleOutput {
        match event {
            LifecycleEvent::SessionStart(start) => {
                self.injector.on_session_start(start).await.into()
            },
            LifecycleEvent::Bootstrap => self.injector.on_bootstrap().await.into(),
            LifecycleEvent::SessionEnd(end) => {
                let outcome: CaptureOutcome = self.capture.on_session_end(end).await;
                tracing::debug!("Session end handled: {:?}", outcome);
                LifecycleOutput::none()
            },
            LifecycleEvent::ToolResult(result) => {
                self.tracer.on_tool_result(result);
                LifecycleOutput::none()
            },
        }
    }
}

/// Builder for [`MemosLifecycle`].
pub struct MemosLifecycleBuilder {
    backend: Arc<dyn MemoryBackend>,
    throttle: Option<Arc<CaptureThrottle>>,
    exclusion: ToolExclusion,
}

impl MemosLifecycleBuilder {
    /// Sets the minimum time between fact extractions.
    pub fn throttle_window(mut self, window: Duration) -> Self {
        self.throttle = Some(Arc::new(CaptureThrottle::new(window)));
        self
    }

    /// Shares an existing throttle.
    pub fn throttle(mut self, throttle: Arc<CaptureThrottle>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Replaces the tool exclusion set.
    pub fn exclusion(mut self, exclusion: ToolExclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Builds the plugin.
    pub fn build(self) -> MemosLifecycle {
        let throttle = self.throttle.unwrap_or_default();
        MemosLifecycle {
            injector: ContextInjector::new(self.backend.clone()),
            capture: AutoCapture::new(self.backend.clone(), throttle),
            tracer: ToolTraceRecorder::with_exclusion(self.backend, self.exclusion),
        }
    }
}
