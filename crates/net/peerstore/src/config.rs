//! Peer store configuration and address TTL presets.

use std::time::Duration;

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Addresses learned from an unverified source (e.g. a peer exchange).
pub const TEMP_ADDR_TTL: Duration = Duration::from_secs(2 * 60);

/// Addresses returned by a content provider lookup.
pub const PROVIDER_ADDR_TTL: Duration = Duration::from_secs(30 * 60);

/// Addresses of a peer we were connected to until recently.
pub const RECENTLY_CONNECTED_ADDR_TTL: Duration = Duration::from_secs(30 * 60);

/// Our own addresses as reported by remote observers.
pub const OWN_OBSERVED_ADDR_TTL: Duration = Duration::from_secs(30 * 60);

/// Addresses that never expire (bootnodes, static peers).
pub const PERMANENT_ADDR_TTL: Duration = Duration::MAX;

/// Addresses of currently connected peers. Distinct from [`PERMANENT_ADDR_TTL`] so
/// callers can tell the two apart; both overflow the clock and never expire.
pub const CONNECTED_ADDR_TTL: Duration = Duration::MAX.saturating_sub(Duration::from_nanos(1));

/// Peer store configuration.
#[derive(Debug, Clone)]
pub struct PeerStoreConfig {
    /// Interval between background address expiry sweeps.
    pub sweep_interval: Duration,
}

impl Default for PeerStoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl PeerStoreConfig {
    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PeerStoreConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_config_builder() {
        let config = PeerStoreConfig::default().with_sweep_interval(Duration::from_millis(10));
        assert_eq!(config.sweep_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_connected_ttl_distinct_from_permanent() {
        assert!(CONNECTED_ADDR_TTL < PERMANENT_ADDR_TTL);
        assert!(CONNECTED_ADDR_TTL > OWN_OBSERVED_ADDR_TTL);
    }
}
