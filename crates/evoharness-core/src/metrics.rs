//! Global atomic counters for run observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as one `tracing::info!` event,
//! typically at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    candidates_generated: AtomicU64,
    candidates_scored: AtomicU64,
    backend_failures: AtomicU64,
    duplicates_dropped: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            candidates_generated: AtomicU64::new(0),
            candidates_scored: AtomicU64::new(0),
            backend_failures: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
        }
    }

    pub fn inc_generated(&self) {
        self.candidates_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scored(&self) {
        self.candidates_scored.fetch_add(1, Ordering::Relaxed);
    }

    /// One skipped slot, after all retries.
    pub fn inc_backend_failures(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "backend_failures", "counter incremented");
    }

    pub fn inc_duplicates(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            candidates_generated = self.candidates_generated(),
            candidates_scored = self.candidates_scored(),
            backend_failures = self.backend_failures(),
            duplicates_dropped = self.duplicates_dropped(),
        );
    }

    pub fn candidates_generated(&self) -> u64 {
        self.candidates_generated.load(Ordering::Relaxed)
    }

    pub fn candidates_scored(&self) -> u64 {
        self.candidates_scored.load(Ordering::Relaxed)
    }

    pub fn backend_failures(&self) -> u64 {
        self.backend_failures.load(Ordering::Relaxed)
    }

    pub fn duplicates_dropped(&self) -> u64 {
        self.duplicates_dropped.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.candidates_generated.store(0, Ordering::Relaxed);
        self.candidates_scored.store(0, Ordering::Relaxed);
        self.backend_failures.store(0, Ordering::Relaxed);
        self.duplicates_dropped.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_generated();
        m.inc_generated();
        m.inc_scored();
        m.inc_backend_failures();
        assert_eq!(m.candidates_generated(), 2);
        assert_eq!(m.candidates_scored(), 1);
        assert_eq!(m.backend_failures(), 1);
        assert_eq!(m.duplicates_dropped(), 0);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_generated();
        m.inc_duplicates();
        m.reset();
        assert_eq!(m.candidates_generated(), 0);
        assert_eq!(m.duplicates_dropped(), 0);
    }
}
