use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic count of completed outbound requests. Cloned handles share one
/// counter; the client increments, the reporter reads.
#[derive(Clone, Debug, Default)]
pub struct RequestCounter(Arc<AtomicU64>);

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Count of currently running fetch/drain chains.
#[derive(Clone, Debug, Default)]
pub struct InFlightGauge(Arc<AtomicI64>);

impl InFlightGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a chain as running until the returned guard drops.
    pub fn enter(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard(InFlightGauge);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        (self.0).0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_tracks_guard_lifetimes() {
        let gauge = InFlightGauge::new();
        assert_eq!(gauge.get(), 0);

        let outer = gauge.enter();
        let inner = gauge.enter();
        assert_eq!(gauge.get(), 2);

        drop(inner);
        assert_eq!(gauge.get(), 1);
        drop(outer);
        assert_eq!(gauge.get(), 0);
    }
}
