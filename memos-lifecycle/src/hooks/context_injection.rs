//! Session-start context injection.
//!
//! Searches the memory service for memories relevant to the incoming prompt
//! and hands the host a tagged block to prepend. Every failure degrades to
//! "no context"; session start is never blocked beyond the client's bounded
//! retry budget and never fails.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::memory::{BootstrapFile, ContextFormatter, MAX_CONTEXT_ENTRIES, MemoryBackend};
use crate::text::take_chars;
use crate::types::{PrependContext, SessionStartEvent};

/// Prompts shorter than this are not worth a search.
pub const MIN_PROMPT_CHARS: usize = 5;
/// Characters of the prompt appended to the search query.
pub const PROMPT_QUERY_CHARS: usize = 200;
/// Bias prepended to every session-start query.
pub const SESSION_QUERY_PREFIX: &str = "important user context preferences decisions ";
/// Fixed query used while bootstrapping, when no prompt exists yet.
pub const BOOTSTRAP_QUERY: &str = "important user context preferences decisions recent";

/// Loads memory context at session start and bootstrap.
pub struct ContextInjector {
    backend: Arc<dyn MemoryBackend>,
}

impl ContextInjector {
    /// Creates an injector searching through `backend`.
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self { backend }
    }

    /// Search query for a prompt.
    pub fn build_query(prompt: &str) -> String {
        format!(
            "{SESSION_QUERY_PREFIX}{}",
            take_chars(prompt, PROMPT_QUERY_CHARS)
        )
    }

    /// Produces the context to prepend, if there is any.
    pub async fn on_session_start(&self, event: &SessionStartEvent) -> Option<PrependContext> {
        let prompt = match event.prompt.as_deref() {
            Some(prompt) if prompt.chars().count() >= MIN_PROMPT_CHARS => prompt,
            _ => {
                debug!("Prompt missing or too short, skipping memory context");
                return None;
            },
        };

        let block = self.load_block(&Self::build_query(prompt)).await?;
        Some(PrependContext {
            prepend_context: ContextFormatter::wrap_for_prompt(&block),
        })
    }

    /// Produces the virtual `MEMORY_CONTEXT.md` bootstrap file, if there is any.
    pub async fn on_bootstrap(&self) -> Option<BootstrapFile> {
        let block = self.load_block(BOOTSTRAP_QUERY).await?;
        Some(ContextFormatter::bootstrap_file(&block))
    }

    async fn load_block(&self, query: &str) -> Option<String> {
        let records = match self.backend.search(query, MAX_CONTEXT_ENTRIES).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Memory context load failed: {}", e);
                return None;
            },
        };

        if records.is_empty() {
            debug!("No relevant memories found");
            return None;
        }

        let block = ContextFormatter::format(&records);
        if block.is_empty() {
            debug!("Memories carried no content, nothing to inject");
            return None;
        }

        info!(
            "Injecting {} memories into context",
            records.len().min(MAX_CONTEXT_ENTRIES)
        );
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MemosError;
    use crate::memory::{MemoryRecord, MockMemoryBackend};

    fn injector(backend: MockMemoryBackend) -> ContextInjector {
        ContextInjector::new(Arc::new(backend))
    }

    #[test]
    fn test_build_query() {
        assert_eq!(
            ContextInjector::build_query("fix the build"),
            "important user context preferences decisions fix the build"
        );
        let long = "p".repeat(500);
        let query = ContextInjector::build_query(&long);
        assert_eq!(query.len(), SESSION_QUERY_PREFIX.len() + PROMPT_QUERY_CHARS);
    }

    #[tokio::test]
    async fn test_short_prompt_skips_search() {
        let mut backend = MockMemoryBackend::new();
        backend.expect_search().never();
        let injector = injector(backend);

        assert!(injector.on_session_start(&SessionStartEvent::new("hey")).await.is_none());
        assert!(injector.on_session_start(&SessionStartEvent::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_injects_wrapped_block() {
        let mut backend = MockMemoryBackend::new();
        backend
            .expect_search()
            .withf(|query, top_k| query.ends_with("deploy to staging") && *top_k == 5)
            .times(1)
            .returning(|_, _| Ok(vec![MemoryRecord::new("Staging lives on fly.io")]));

        let context = injector(backend)
            .on_session_start(&SessionStartEvent::new("deploy to staging"))
            .await
            .unwrap();

        assert!(context.prepend_context.starts_with("<user_memory_context>"));
        assert!(context.prepend_context.contains("- Staging lives on fly.io"));
        assert!(context.prepend_context.ends_with("</user_memory_context>"));
    }

    #[tokio::test]
    async fn test_no_memories_no_context() {
        let mut backend = MockMemoryBackend::new();
        backend.expect_search().returning(|_, _| Ok(vec![]));
        assert!(
            injector(backend)
                .on_session_start(&SessionStartEvent::new("a long enough prompt"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_contentless_memories_no_context() {
        let mut backend = MockMemoryBackend::new();
        backend
            .expect_search()
            .returning(|_, _| Ok(vec![MemoryRecord::default(), MemoryRecord::default()]));
        assert!(
            injector(backend)
                .on_session_start(&SessionStartEvent::new("a long enough prompt"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_search_failure_is_swallowed() {
        let mut backend = MockMemoryBackend::new();
        backend.expect_search().returning(|_, _| {
            Err(MemosError::call_failed(
                "/product/search",
                3,
                MemosError::Timeout { millis: 5000 },
            ))
        });
        assert!(
            injector(backend)
                .on_session_start(&SessionStartEvent::new("a long enough prompt"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_bootstrap_file() {
        let mut backend = MockMemoryBackend::new();
        backend
            .expect_search()
            .withf(|query, _| query.to_string() == BOOTSTRAP_QUERY)
            .returning(|_, _| Ok(vec![MemoryRecord::new("Timezone is UTC+2")]));

        let file = injector(backend).on_bootstrap().await.unwrap();
        assert_eq!(file.name, "MEMORY_CONTEXT.md");
        assert!(file.content.contains("- Timezone is UTC+2"));
    }
}
