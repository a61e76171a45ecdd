//! Peer store metrics.

use metrics::Counter;

/// Peer store metrics
#[derive(Clone, Debug)]
pub(crate) struct PeerStoreMetrics {
    /// Number of address records inserted (new addresses only, not extensions)
    pub(crate) addrs_added_total: Counter,
    /// Number of address records evicted by the expiry sweep
    pub(crate) addrs_evicted_total: Counter,
    /// Number of public keys rejected by identity validation
    pub(crate) keys_rejected_total: Counter,
    /// Number of completed sweep cycles
    pub(crate) sweep_cycles_total: Counter,
    /// Number of sweep cycles that panicked
    pub(crate) sweep_failures_total: Counter,
}

impl Default for PeerStoreMetrics {
    fn default() -> Self {
        Self {
            addrs_added_total: metrics::counter!("peerstore.addrs.added_total"),
            addrs_evicted_total: metrics::counter!("peerstore.addrs.evicted_total"),
            keys_rejected_total: metrics::counter!("peerstore.keys.rejected_total"),
            sweep_cycles_total: metrics::counter!("peerstore.sweep.cycles_total"),
            sweep_failures_total: metrics::counter!("peerstore.sweep.failures_total"),
        }
    }
}

impl PeerStoreMetrics {
    pub(crate) fn inc_addrs_added(&self, count: usize) {
        self.addrs_added_total.increment(count as u64);
    }

    pub(crate) fn inc_addrs_evicted(&self, count: usize) {
        self.addrs_evicted_total.increment(count as u64);
    }

    pub(crate) fn inc_keys_rejected(&self) {
        self.keys_rejected_total.increment(1);
    }

    pub(crate) fn inc_sweep_cycles(&self) {
        self.sweep_cycles_total.increment(1);
    }

    pub(crate) fn inc_sweep_failures(&self) {
        self.sweep_failures_total.increment(1);
    }
}
