use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// State shared between the request loop and the watchdog thread.
///
/// `processing_started_at` is milliseconds since `epoch` (0 = idle),
/// published with release ordering when dispatch begins and read with
/// acquire ordering by the watchdog. `just_sent` is the compare-and-set
/// guard ensuring at most one response per request.
#[derive(Debug)]
pub struct WorkerShared {
    just_sent: AtomicBool,
    processing_started_at: AtomicU64,
    max_request_ms: Arc<AtomicU64>,
    request_id: AtomicU64,
    epoch: Instant,
}

impl WorkerShared {
    pub fn new(max_request: Duration) -> Self {
        Self {
            just_sent: AtomicBool::new(false),
            processing_started_at: AtomicU64::new(0),
            max_request_ms: Arc::new(AtomicU64::new(max_request.as_millis() as u64)),
            request_id: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn mark_busy(&self) {
        // 0 means idle, so clamp the stamp to at least 1.
        self.processing_started_at
            .store(self.now_ms().max(1), Ordering::Release);
    }

    pub fn mark_idle(&self) {
        self.processing_started_at.store(0, Ordering::Release);
    }

    pub fn busy_since_ms(&self) -> Option<u64> {
        match self.processing_started_at.load(Ordering::Acquire) {
            0 => None,
            since => Some(since),
        }
    }

    /// Win the right to emit the response for the current request. Exactly
    /// one caller succeeds between guard resets.
    pub fn try_claim_send(&self) -> bool {
        self.just_sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn reset_send_guard(&self) {
        self.just_sent.store(false, Ordering::Release);
    }

    /// The sink `Output::set_timeout` writes through, letting a handler
    /// raise or lower the deadline for its own request.
    pub fn timeout_sink(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.max_request_ms)
    }

    pub fn set_max_request(&self, max_request: Duration) {
        self.max_request_ms
            .store(max_request.as_millis() as u64, Ordering::Release);
    }

    pub fn max_request_ms(&self) -> u64 {
        self.max_request_ms.load(Ordering::Acquire)
    }

    pub fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn deadline_exceeded(&self) -> bool {
        match self.busy_since_ms() {
            Some(since) => self.now_ms().saturating_sub(since) > self.max_request_ms(),
            None => false,
        }
    }
}
