//! Statistics and metrics for the hub

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Hub-wide counters
///
/// Written only by the coordination loop, readable from any task. Because
/// reads bypass the loop, a snapshot is available even while a broadcast is
/// stalled on a slow subscriber.
#[derive(Debug, Default)]
pub struct HubMetrics {
    subscribers: AtomicUsize,
    registered: AtomicU64,
    unregistered: AtomicU64,
    evicted: AtomicU64,
    published: AtomicU64,
    delivered: AtomicU64,
}

impl HubMetrics {
    pub(crate) fn on_registered(&self, live: usize) {
        self.registered.fetch_add(1, Ordering::Relaxed);
        self.subscribers.store(live, Ordering::Relaxed);
    }

    pub(crate) fn on_unregistered(&self, live: usize) {
        self.unregistered.fetch_add(1, Ordering::Relaxed);
        self.subscribers.store(live, Ordering::Relaxed);
    }

    pub(crate) fn on_evicted(&self, live: usize) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
        self.subscribers.store(live, Ordering::Relaxed);
    }

    pub(crate) fn on_published(&self, delivered: u64) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(delivered, Ordering::Relaxed);
    }

    pub(crate) fn on_closed(&self) {
        self.subscribers.store(0, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> HubStats {
        HubStats {
            subscribers: self.subscribers.load(Ordering::Relaxed),
            registered: self.registered.load(Ordering::Relaxed),
            unregistered: self.unregistered.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of hub statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Subscribers ever admitted
    pub registered: u64,
    /// Subscribers removed via unregister
    pub unregistered: u64,
    /// Subscribers removed by the hub (consumer gone, or buffer overflow)
    pub evicted: u64,
    /// Resources whose broadcast has completed
    pub published: u64,
    /// Successful per-subscriber deliveries
    pub delivered: u64,
}
