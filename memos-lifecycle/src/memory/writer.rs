//! Background writer for fire-and-forget memory writes.
//!
//! Writes are pushed onto a bounded queue and return immediately. A single
//! dispatcher task pulls them off and runs at most `workers` add calls at a
//! time. When the queue is full the incoming write is dropped; callers are
//! never made to wait.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::transport::{MemosTransport, endpoints};
use crate::config::WriterConfig;

/// A memory waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    /// Memory text
    pub content: String,
    /// Custom tags
    pub tags: Vec<String>,
}

impl PendingWrite {
    /// Request body for the add endpoint.
    pub fn to_body(&self, user_id: &str) -> Value {
        json!({
            "user_id": user_id,
            "messages": self.content,
            "custom_tags": self.tags,
            "async_mode": "async",
        })
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time view of the writer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    /// Writes accepted onto the queue
    pub submitted: u64,
    /// Writes the service acknowledged
    pub completed: u64,
    /// Writes that failed after retries
    pub failed: u64,
    /// Writes rejected because the queue was full or closed
    pub dropped: u64,
    /// Writes currently queued
    pub pending: u64,
}

/// Handle for submitting background writes.
pub struct WriteQueue {
    tx: mpsc::Sender<PendingWrite>,
    counters: Arc<Counters>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl WriteQueue {
    /// Spawns the dispatcher. Must be called from within a Tokio runtime.
    pub fn spawn(
        transport: Arc<MemosTransport>,
        user_id: String,
        retries: u32,
        config: &WriterConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let counters = Arc::new(Counters::default());

        let dispatcher = Dispatcher {
            transport,
            user_id,
            retries,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            counters: counters.clone(),
        };
        let handle = tokio::spawn(dispatcher.run(rx, shutdown_rx));

        Self {
            tx,
            counters,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            dispatcher: Mutex::new(Some(handle)),
        }
    }

    /// Queues a write without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, write: PendingWrite) -> bool {
        match self.tx.try_send(write) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                true
            },
            Err(TrySendError::Full(write)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Write queue full, dropping memory tagged {:?}", write.tags);
                false
            },
            Err(TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Write queue closed, dropping memory");
                false
            },
        }
    }

    /// Current counters.
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            pending: (self.tx.max_capacity() - self.tx.capacity()) as u64,
        }
    }

    /// Stops intake and waits up to `grace` for queued and in-flight writes.
    ///
    /// Returns `true` if everything finished in time. Calling it again is a
    /// no-op that returns `true`.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }

        let Some(handle) = self.dispatcher.lock().take() else {
            return true;
        };

        match tokio::time::timeout(grace, handle).await {
            Ok(_) => {
                let stats = self.stats();
                info!(
                    "Write queue drained: {} completed, {} failed, {} dropped",
                    stats.completed, stats.failed, stats.dropped
                );
                true
            },
            Err(_) => {
                warn!("Write queue did not drain within {:?}", grace);
                false
            },
        }
    }
}

struct Dispatcher {
    transport: Arc<MemosTransport>,
    user_id: String,
    retries: u32,
    permits: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    async fn run(
        self,
        mut rx: mpsc::Receiver<PendingWrite>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(write) => self.dispatch(write, &mut in_flight).await,
                    None => break,
                },
                _ = &mut shutdown_rx => {
                    rx.close();
                    while let Some(write) = rx.recv().await {
                        self.dispatch(write, &mut in_flight).await;
                    }
                    break;
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {},
            }
        }

        while in_flight.join_next().await.is_some() {}
    }

    async fn dispatch(&self, write: PendingWrite, in_flight: &mut JoinSet<()>) {
        let Ok(permit) = self.permits.clone().acquire_owned().await else {
            return;
        };

        let transport = self.transport.clone();
        let counters = self.counters.clone();
        let body = write.to_body(&self.user_id);
        let retries = self.retries;

        in_flight.spawn(async move {
            let _permit = permit;
            match transport.call(endpoints::ADD, &body, retries).await {
                Ok(_) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                },
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    debug!("Background memory write discarded: {}", e);
                },
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemosConfig;

    #[test]
    fn test_add_body_shape() {
        let write = PendingWrite {
            content: "Prefers tabs".to_string(),
            tags: vec!["auto_capture".to_string(), "fact".to_string()],
        };
        let body = write.to_body("alice");
        assert_eq!(body["user_id"], "alice");
        assert_eq!(body["messages"], "Prefers tabs");
        assert_eq!(body["custom_tags"], json!(["auto_capture", "fact"]));
        assert_eq!(body["async_mode"], "async");
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_dropped() {
        let config = MemosConfig::default().with_api_url("http://127.0.0.1:9");
        let transport = Arc::new(MemosTransport::new(&config).unwrap());
        let queue = WriteQueue::spawn(transport, "u".into(), 0, &config.writer);

        assert!(queue.shutdown(Duration::from_secs(1)).await);
        assert!(queue.shutdown(Duration::from_secs(1)).await);

        let accepted = queue.submit(PendingWrite {
            content: "late".into(),
            tags: vec![],
        });
        assert!(!accepted);
        assert_eq!(queue.stats().dropped, 1);
        assert_eq!(queue.stats().submitted, 0);
    }
}
