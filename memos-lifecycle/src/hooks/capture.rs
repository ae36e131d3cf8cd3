//! Session-end fact capture.
//!
//! Distils a finished conversation into a handful of long-term facts. Fact
//! extraction is an LLM call, so it runs at most once per throttle window
//! across the whole process.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::memory::{FactExtractor, MemoryBackend};
use crate::text::take_chars;
use crate::types::SessionEndEvent;

/// Default minimum time between two extractions.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(10 * 60);
/// Characters kept per message.
pub const MAX_MESSAGE_CHARS: usize = 1000;
/// Qualifying messages needed for one exchange.
pub const MIN_EXCHANGE_MESSAGES: usize = 2;
/// Facts must be longer than this to be stored.
pub const MIN_FACT_CHARS: usize = 10;
/// Tags attached to captured facts.
pub const FACT_TAGS: [&str; 2] = ["auto_capture", "fact"];

/// Process-wide "last capture" timestamp.
#[derive(Debug)]
pub struct CaptureThrottle {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl CaptureThrottle {
    /// A throttle that has never fired.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Minimum time between captures.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Claims the window if it is open, stamping it with `now`.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.window => false,
            _ => {
                *last = Some(now);
                true
            },
        }
    }

    /// Claims the window if it is open.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Time since the last claimed window, if any.
    pub fn since_last(&self) -> Option<Duration> {
        self.last.lock().map(|at| at.elapsed())
    }
}

impl Default for CaptureThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_WINDOW)
    }
}

/// Why a session end did or did not produce facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Session failed or had no messages
    Skipped,
    /// Another capture ran within the throttle window
    Throttled,
    /// Fewer than one user/assistant exchange
    TooShort,
    /// Extraction returned nothing storable
    NoFacts,
    /// This many facts were queued for storage
    Captured(usize),
}

/// Runs fact extraction on session end and stores the result.
pub struct AutoCapture {
    backend: Arc<dyn MemoryBackend>,
    extractor: FactExtractor,
    throttle: Arc<CaptureThrottle>,
}

impl AutoCapture {
    /// Creates the pipeline with a shared throttle.
    pub fn new(backend: Arc<dyn MemoryBackend>, throttle: Arc<CaptureThrottle>) -> Self {
        Self {
            extractor: FactExtractor::new(backend.clone()),
            backend,
            throttle,
        }
    }

    /// The throttle this pipeline checks.
    pub fn throttle(&self) -> &CaptureThrottle {
        &self.throttle
    }

    /// Renders user/assistant messages as `role: text` paragraphs.
    ///
    /// Returns `None` when fewer than [`MIN_EXCHANGE_MESSAGES`] qualify.
    pub fn build_transcript(event: &SessionEndEvent) -> Option<String> {
        let parts: Vec<String> = event
            .messages
            .iter()
            .filter(|message| message.is_dialogue())
            .filter_map(|message| {
                let text = message.content.to_plain_text();
                if text.is_empty() {
                    return None;
                }
                Some(format!(
                    "{}: {}",
                    message.role,
                    take_chars(&text, MAX_MESSAGE_CHARS)
                ))
            })
            .collect();

        if parts.len() < MIN_EXCHANGE_MESSAGES {
            return None;
        }
        Some(parts.join("\n\n"))
    }

    /// Handles a session end.
    pub async fn on_session_end(&self, event: &SessionEndEvent) -> CaptureOutcome {
        if !event.success || event.messages.is_empty() {
            return CaptureOutcome::Skipped;
        }

        // claimed before extraction so a slow call cannot let a second capture in
        if !self.throttle.try_acquire() {
            debug!("Auto-capture throttled, skipping");
            return CaptureOutcome::Throttled;
        }

        let Some(transcript) = Self::build_transcript(event) else {
            debug!("Conversation too short for fact extraction");
            return CaptureOutcome::TooShort;
        };

        debug!("Extracting facts from conversation");
        let facts = self.extractor.extract(&transcript).await;

        let tags: Vec<String> = FACT_TAGS.iter().map(|t| t.to_string()).collect();
        let mut stored = 0;
        for fact in facts {
            if fact.chars().count() > MIN_FACT_CHARS {
                self.backend.add(fact, tags.clone());
                stored += 1;
            }
        }

        if stored == 0 {
            debug!("No important facts to extract");
            return CaptureOutcome::NoFacts;
        }

        info!("Saving {} facts from conversation", stored);
        CaptureOutcome::Captured(stored)
    }
}
