//! MemOS client: search, fire-and-forget add, and completion.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::record::{MemoryRecord, parse_completion_response, parse_search_response};
use super::transport::{MemosTransport, endpoints};
use super::writer::{PendingWrite, WriteQueue, WriterStats};
use crate::config::MemosConfig;
use crate::errors::Result;

/// Operations the lifecycle hooks need from a memory service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Ranked search, best match first.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<MemoryRecord>>;

    /// Stores a memory in the background. Never waits, never reports failure.
    fn add(&self, content: String, tags: Vec<String>);

    /// Runs a completion with memory augmentation disabled.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// HTTP client for a MemOS service.
pub struct MemosClient {
    transport: Arc<MemosTransport>,
    writer: WriteQueue,
    user_id: String,
    retries: u32,
}

impl MemosClient {
    /// Creates a client and spawns its background writer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: MemosConfig) -> Result<Self> {
        let transport = Arc::new(MemosTransport::new(&config)?);
        let writer = WriteQueue::spawn(
            transport.clone(),
            config.user_id.clone(),
            config.add_retries,
            &config.writer,
        );

        debug!(
            "MemOS client ready: url={} user={} auth={}",
            transport.base_url(),
            config.user_id,
            config.credentials.is_present()
        );

        Ok(Self {
            transport,
            writer,
            user_id: config.user_id,
            retries: config.retries,
        })
    }

    /// User the memories are read from and written to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Background writer counters.
    pub fn writer_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    /// Drains pending background writes, waiting at most `grace`.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.writer.shutdown(grace).await
    }
}

#[async_trait]
impl MemoryBackend for MemosClient {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<MemoryRecord>> {
        let body = json!({
            "query": query,
            "user_id": self.user_id,
            "top_k": top_k,
        });
        let response = self
            .transport
            .call(endpoints::SEARCH, &body, self.retries)
            .await?;

        let records = parse_search_response(&response);
        debug!("Search returned {} memories", records.len());
        Ok(records)
    }

    fn add(&self, content: String, tags: Vec<String>) {
        self.writer.submit(PendingWrite { content, tags });
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "query": prompt,
            "user_id": self.user_id,
            "enable_memory": false,
        });
        let response = self
            .transport
            .call(endpoints::COMPLETE, &body, self.retries)
            .await?;

        Ok(parse_completion_response(&response))
    }
}
