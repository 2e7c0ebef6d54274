// crates/growth-queue/src/queue.rs
// ============================================================================
// Module: Network Queue
// Description: In-memory FIFO queue with size/threshold/timer-driven batched
// flush and exponential-backoff retry (spec §4.2).
// Purpose: Decouple `track()` from the network: callers enqueue and move on;
// a background timer (or a full queue, or a manual call) drives delivery.
// Dependencies: growth-core, growth-providers, tokio, tracing
// ============================================================================

//! ## Overview
//! A flush is serialized: a second caller observing one already in flight
//! gets `false` immediately rather than racing it (spec §4.2: "observes
//! 'already flushing'"). A single flush's batch is retried internally,
//! with exponential backoff, up to `max_retries` times before the batch is
//! dropped and logged — the queue never blocks enqueue waiting on a stuck
//! batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use growth_core::Event;
use growth_providers::BackendClient;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::config::QueueConfig;

// ============================================================================
// SECTION: NetworkQueue
// ============================================================================

/// An in-memory, restart-volatile batched delivery queue.
pub struct NetworkQueue {
    config: QueueConfig,
    client: Arc<BackendClient>,
    buffer: AsyncMutex<VecDeque<Event>>,
    flushing: AtomicBool,
    paused: AtomicBool,
}

impl NetworkQueue {
    /// Builds an empty queue delivering through `client`.
    #[must_use]
    pub fn new(client: Arc<BackendClient>, config: QueueConfig) -> Self {
        Self {
            config,
            client,
            buffer: AsyncMutex::new(VecDeque::new()),
            flushing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }

    /// Enqueues an event, auto-flushing when the buffer reaches `flush_at`
    /// and dropping the oldest buffered event when `max_queue_size` would
    /// otherwise be exceeded (spec §4.2: "drops oldest until enqueue
    /// fits").
    pub async fn enqueue(self: &Arc<Self>, event: Event) {
        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            buffer.push_back(event);
            while buffer.len() > self.config.max_queue_size {
                if buffer.pop_front().is_some() {
                    tracing::warn!("network queue full, dropped oldest event");
                }
            }
            buffer.len() >= self.config.flush_at
        };
        if should_flush {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.flush().await;
            });
        }
    }

    /// Number of events currently buffered.
    pub async fn len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// True when no events are buffered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Suspends timer-driven flushes. Manual [`Self::flush`] calls still
    /// work while paused (spec §4.2: needed to order `$identify` ahead of
    /// subsequent events).
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resumes timer-driven flushes.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Drains up to `max_batch_size` buffered events and attempts delivery,
    /// retrying internally on a retryable failure.
    ///
    /// Returns `false` if a flush was already in progress (no new flush was
    /// attempted) or if the attempted flush's batch ultimately failed;
    /// returns `true` if the buffer was empty or the batch was delivered
    /// successfully.
    pub async fn flush(&self) -> bool {
        if self.flushing.swap(true, Ordering::SeqCst) {
            return false;
        }
        let outcome = self.flush_once().await;
        self.flushing.store(false, Ordering::SeqCst);
        outcome
    }

    async fn flush_once(&self) -> bool {
        let batch: Vec<Event> = {
            let buffer = self.buffer.lock().await;
            buffer.iter().take(self.config.max_batch_size).cloned().collect()
        };
        if batch.is_empty() {
            return true;
        }

        let mut attempt = 0u32;
        loop {
            match self.client.send_batch(&batch, false).await {
                Ok(_) => {
                    self.remove_front(batch.len()).await;
                    return true;
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(error = %err, attempt, delay_ms = delay.as_millis() as u64, "retrying flush");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, retryable = err.is_retryable(), "dropping batch after flush failure");
                    self.remove_front(batch.len()).await;
                    return false;
                }
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let scaled = self.config.base_retry_delay.saturating_mul(1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX));
        scaled.min(self.config.retry_delay_ceiling)
    }

    async fn remove_front(&self, count: usize) {
        let mut buffer = self.buffer.lock().await;
        for _ in 0..count {
            buffer.pop_front();
        }
    }

    /// Spawns the background timer loop driving threshold-independent,
    /// periodic flushes (spec §4.2: `flushInterval`). The loop runs until
    /// `self` is dropped.
    #[must_use]
    pub fn spawn_timer(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.flush_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !this.paused.load(Ordering::SeqCst) {
                    this.flush().await;
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use growth_core::DistinctId;
    use reqwest::Client;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::Request;
    use wiremock::Respond;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;

    fn sample_event(name: &str) -> Event {
        Event::new(name, DistinctId::new("u1"), time::OffsetDateTime::now_utc())
    }

    fn fast_config() -> QueueConfig {
        QueueConfig {
            flush_at: 3,
            flush_interval: Duration::from_secs(3600),
            max_queue_size: 10,
            max_batch_size: 10,
            max_retries: 3,
            base_retry_delay: Duration::from_millis(1),
            retry_delay_ceiling: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn flush_at_threshold_drains_the_queue_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/i/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok", "processed": 3, "failed": 0, "total": 3, "errors": null
            })))
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let queue = Arc::new(NetworkQueue::new(client, fast_config()));
        for name in ["a", "b", "c"] {
            queue.enqueue(sample_event(name)).await;
        }
        assert!(queue.flush().await);
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn queue_full_drops_oldest() {
        let server = MockServer::start().await;
        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let mut config = fast_config();
        config.max_queue_size = 2;
        config.flush_at = 100;
        let queue = Arc::new(NetworkQueue::new(client, config));
        queue.enqueue(sample_event("a")).await;
        queue.enqueue(sample_event("b")).await;
        queue.enqueue(sample_event("c")).await;
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_flush_returns_false_without_duplicating() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/i/batch"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)).set_body_json(serde_json::json!({
                "status": "ok", "processed": 1, "failed": 0, "total": 1, "errors": null
            })))
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let queue = Arc::new(NetworkQueue::new(client, fast_config()));
        queue.enqueue(sample_event("a")).await;

        let first = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.flush().await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = queue.flush().await;

        assert!(!second);
        assert!(first.await.unwrap());
    }

    #[tokio::test]
    async fn retryable_failure_then_success_drains_on_the_second_call() {
        struct FlakyOnce {
            calls: Arc<AtomicUsize>,
        }
        impl Respond for FlakyOnce {
            fn respond(&self, _request: &Request) -> ResponseTemplate {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                if call == 0 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "status": "ok", "processed": 3, "failed": 0, "total": 3, "errors": null
                    }))
                }
            }
        }

        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        Mock::given(method("POST"))
            .and(path("/api/i/batch"))
            .respond_with(FlakyOnce { calls: Arc::clone(&calls) })
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let queue = Arc::new(NetworkQueue::new(client, fast_config()));
        for name in ["a", "b", "c"] {
            queue.enqueue(sample_event(name)).await;
        }
        assert!(queue.flush().await);
        assert_eq!(queue.len().await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_failure_drops_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/api/i/batch")).respond_with(ResponseTemplate::new(400)).mount(&server).await;

        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let queue = Arc::new(NetworkQueue::new(client, fast_config()));
        queue.enqueue(sample_event("a")).await;
        assert!(!queue.flush().await);
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn manual_flush_bypasses_pause() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/i/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok", "processed": 1, "failed": 0, "total": 1, "errors": null
            })))
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let queue = Arc::new(NetworkQueue::new(client, fast_config()));
        queue.pause();
        queue.enqueue(sample_event("$identify")).await;
        assert!(queue.flush().await);
        assert_eq!(queue.len().await, 0);
    }
}
