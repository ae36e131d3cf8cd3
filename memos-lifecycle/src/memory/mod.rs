//! # MemOS Memory Access
//!
//! Everything that talks to the memory service, or shapes data going to or
//! coming from it.
//!
//! ## Architecture
//!
//! - **Transport**: authenticated JSON POSTs with a per-attempt timeout and
//!   linear backoff between retries
//! - **Writer**: a bounded queue and worker pool for fire-and-forget adds
//! - **Backend**: the `MemoryBackend` seam the hooks depend on, implemented by
//!   `MemosClient`
//!
//! ## Components
//!
//! - `MemoryRecord` / `TraceRecord`: what is read from and written to the service
//! - `ContextFormatter`: renders records into an injectable block
//! - `FactExtractor`: asks the service's LLM to distil a conversation into facts

mod client;
mod extractor;
mod formatter;
mod record;
mod transport;
mod writer;

pub use client::{MemoryBackend, MemosClient};
pub use extractor::{FactExtractor, MAX_TRANSCRIPT_CHARS, parse_fact_array};
pub use formatter::{
    BOOTSTRAP_FILE_NAME, BOOTSTRAP_FILE_PRIORITY, BootstrapFile, CONTEXT_HEADER, CONTEXT_TAG,
    ContextFormatter, MAX_CONTEXT_ENTRIES, MAX_ENTRY_CHARS,
};
pub use record::{
    CONTENT_FIELDS, FactList, MemoryRecord, TraceRecord, parse_completion_response,
    parse_search_response,
};
pub use transport::{INTERNAL_SERVICE_HEADER, MemosTransport, endpoints};
pub use writer::{PendingWrite, WriteQueue, WriterStats};

#[cfg(test)]
pub use client::MockMemoryBackend;
