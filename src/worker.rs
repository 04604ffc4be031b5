//! Background highlighting
//!
//! A [`HighlightWorker`] owns one thread that highlights the most recent
//! request for a single document region. Requests submitted while the
//! worker is waiting replace each other; only the last one is run once
//! no new submission has arrived for the debounce interval.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::syntax::Registry;

/// Text to highlight and the language to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub language: String,
    pub source: String,
}

impl HighlightRequest {
    pub fn new(language: &str, source: &str) -> Self {
        Self {
            language: language.to_string(),
            source: source.to_string(),
        }
    }
}

/// Result delivered for a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOutcome {
    /// Generation returned by the matching `submit`
    pub generation: u64,
    pub language: String,
    pub html: String,
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    request: HighlightRequest,
    submitted_at: Instant,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Pending>,
    /// Last generation handed out
    generation: u64,
    running: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Debounced, coalescing highlighter thread
#[derive(Debug)]
pub struct HighlightWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl HighlightWorker {
    /// Start the worker thread
    ///
    /// Outcomes are sent on `results`; the worker stops when the
    /// receiving side hangs up.
    pub fn spawn(registry: Arc<Registry>, debounce: Duration, results: Sender<HighlightOutcome>) -> Self {
        let shared = Arc::new(Shared::default());
        let handle = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || run(&shared, &registry, debounce, &results))
        };
        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Queue a request, replacing any request that has not started yet
    ///
    /// Returns the generation assigned to it.
    pub fn submit(&self, request: HighlightRequest) -> u64 {
        let mut slot = self.shared.lock();
        slot.generation += 1;
        let generation = slot.generation;
        if let Some(old) = slot.pending.replace(Pending {
            generation,
            request,
            submitted_at: Instant::now(),
        }) {
            debug!(dropped = old.generation, generation, "coalesced highlight request");
        }
        self.shared.wake.notify_one();
        generation
    }

    /// Whether a request is waiting or running
    pub fn is_busy(&self) -> bool {
        let slot = self.shared.lock();
        slot.running || slot.pending.is_some()
    }

    /// Stop the worker and wait for it to exit
    ///
    /// A job already running is finished first; a pending one is dropped.
    pub fn shutdown(&mut self) {
        {
            let mut slot = self.shared.lock();
            slot.shutdown = true;
            slot.pending = None;
        }
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("highlight worker panicked");
            }
        }
    }
}

impl Drop for HighlightWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Shared, registry: &Registry, debounce: Duration, results: &Sender<HighlightOutcome>) {
    let mut slot = shared.lock();
    loop {
        if slot.shutdown {
            return;
        }
        let Some(submitted_at) = slot.pending.as_ref().map(|p| p.submitted_at) else {
            slot = shared.wake.wait(slot).unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        let quiet = submitted_at.elapsed();
        if quiet < debounce {
            slot = shared
                .wake
                .wait_timeout(slot, debounce - quiet)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }

        let Some(job) = slot.pending.take() else {
            continue;
        };
        slot.running = true;
        drop(slot);

        let html = registry.highlight(&job.request.language, &job.request.source);
        let outcome = HighlightOutcome {
            generation: job.generation,
            language: job.request.language,
            html,
        };
        let delivered = results.send(outcome).is_ok();

        slot = shared.lock();
        slot.running = false;
        if !delivered {
            debug!("highlight receiver dropped, stopping worker");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const GRAMMAR: &str = r#"<Language><Keywords><Keyword>if</Keyword></Keywords></Language>"#;

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::from_sources([("test", GRAMMAR)]).unwrap())
    }

    #[test]
    fn test_single_request() {
        let (tx, rx) = mpsc::channel();
        let worker = HighlightWorker::spawn(registry(), Duration::from_millis(10), tx);
        let generation = worker.submit(HighlightRequest::new("test", "if x"));

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.language, "test");
        assert_eq!(outcome.html, r#"<span class="keyword">if</span> x"#);
    }

    #[test]
    fn test_rapid_submissions_coalesce() {
        let (tx, rx) = mpsc::channel();
        let worker = HighlightWorker::spawn(registry(), Duration::from_millis(200), tx);
        worker.submit(HighlightRequest::new("test", "one"));
        worker.submit(HighlightRequest::new("test", "two"));
        let last = worker.submit(HighlightRequest::new("test", "if three"));
        assert_eq!(last, 3);
        assert!(worker.is_busy());

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.generation, 3);
        assert_eq!(outcome.html, r#"<span class="keyword">if</span> three"#);
        assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_configured_debounce() {
        let config = crate::Config::from_toml("debounce_ms = 20").unwrap();
        let debounce = Duration::from_millis(config.debounce_ms);
        let (tx, rx) = mpsc::channel();
        let worker = HighlightWorker::spawn(registry(), debounce, tx);
        let started = Instant::now();
        worker.submit(HighlightRequest::new("test", "if"));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(started.elapsed() >= debounce);
    }

    #[test]
    fn test_unknown_language_is_escaped() {
        let (tx, rx) = mpsc::channel();
        let worker = HighlightWorker::spawn(registry(), Duration::ZERO, tx);
        worker.submit(HighlightRequest::new("nope", "a < b"));
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.html, "a &lt; b");
    }

    #[test]
    fn test_shutdown_drops_pending() {
        let (tx, rx) = mpsc::channel();
        let mut worker = HighlightWorker::spawn(registry(), Duration::from_secs(60), tx);
        worker.submit(HighlightRequest::new("test", "if"));
        worker.shutdown();
        assert!(!worker.is_busy());
        // The sender lives in the joined thread, so the channel is closed
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel();
        let mut worker = HighlightWorker::spawn(registry(), Duration::ZERO, tx);
        drop(rx);
        worker.submit(HighlightRequest::new("test", "if"));
        worker.shutdown();
        assert!(worker.handle.is_none());
    }
}
