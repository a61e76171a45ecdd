//! Per-peer address records with TTL-based expiry.
//!
//! Each peer owns an insertion-ordered set of [`Multiaddr`]s, each with an expiry
//! deadline. Re-inserting an address can only push its deadline further out. Reads
//! filter expired records themselves, so callers never observe a stale address even
//! if the background sweep has not run yet; the sweep only reclaims memory.

use std::time::Duration;

use dashmap::DashMap;
use hashlink::LinkedHashMap;
use libp2p::{Multiaddr, PeerId};
use tracing::{debug, trace};
use web_time::Instant;

use crate::error::{PeerStoreError, Result};
use crate::metrics::PeerStoreMetrics;

/// Deadline of a single address record.
///
/// `Never` sorts after every `At`, so `max` merges permanent and timed records
/// correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Expiry {
    At(Instant),
    Never,
}

impl Expiry {
    /// Deadline `ttl` after `now`. TTLs that overflow the clock never expire.
    fn after(now: Instant, ttl: Duration) -> Self {
        now.checked_add(ttl).map_or(Self::Never, Self::At)
    }

    fn is_live(&self, now: Instant) -> bool {
        match self {
            Self::At(deadline) => *deadline > now,
            Self::Never => true,
        }
    }
}

type AddrSet = LinkedHashMap<Multiaddr, Expiry>;

/// Address book: one sharded map entry per peer, so writers on distinct peers never
/// contend and writers on the same peer serialize on the entry guard.
#[derive(Debug, Default)]
pub struct AddrBook {
    peers: DashMap<PeerId, AddrSet>,
    metrics: PeerStoreMetrics,
}

impl AddrBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single address. See [`AddrBook::add_addrs`].
    pub fn add_addr(&self, peer: PeerId, addr: Multiaddr, ttl: Duration) -> Result<()> {
        self.add_addrs(peer, [addr], ttl)
    }

    /// Add addresses for `peer`, each valid for `ttl`.
    ///
    /// New addresses are appended; known addresses keep their position and have their
    /// expiry raised to `max(current, now + ttl)`. A zero TTL is rejected before the
    /// peer is referenced. An empty address list still marks the peer as known.
    ///
    /// `addrs` is drained before the peer's entry is locked, so it may read the store.
    pub fn add_addrs(
        &self,
        peer: PeerId,
        addrs: impl IntoIterator<Item = Multiaddr>,
        ttl: Duration,
    ) -> Result<()> {
        if ttl.is_zero() {
            return Err(PeerStoreError::InvalidTtl);
        }

        let addrs: Vec<Multiaddr> = addrs.into_iter().collect();
        let expiry = Expiry::after(Instant::now(), ttl);
        let mut added = 0;
        let mut extended = 0;

        {
            let mut set = self.peers.entry(peer).or_default();
            for addr in addrs {
                match set.get_mut(&addr) {
                    Some(current) => {
                        if expiry > *current {
                            *current = expiry;
                            extended += 1;
                        }
                    }
                    None => {
                        set.insert(addr, expiry);
                        added += 1;
                    }
                }
            }
        }

        if added > 0 {
            self.metrics.inc_addrs_added(added);
        }
        trace!(%peer, added, extended, ?ttl, "added peer addresses");
        Ok(())
    }

    /// Currently unexpired addresses of `peer`, in insertion order.
    ///
    /// Fails with [`PeerStoreError::PeerNotFound`] only if the book never saw `peer`;
    /// a known peer without live addresses yields an empty list.
    pub fn addrs(&self, peer: &PeerId) -> Result<Vec<Multiaddr>> {
        let set = self
            .peers
            .get(peer)
            .ok_or(PeerStoreError::PeerNotFound(*peer))?;
        let now = Instant::now();
        Ok(set
            .iter()
            .filter(|(_, expiry)| expiry.is_live(now))
            .map(|(addr, _)| addr.clone())
            .collect())
    }

    /// Remove every address of `peer`. The peer stays known. Unknown peers are ignored.
    pub fn clear_addrs(&self, peer: &PeerId) {
        if let Some(mut set) = self.peers.get_mut(peer) {
            let cleared = set.len();
            set.clear();
            debug!(%peer, cleared, "cleared peer addresses");
        }
    }

    /// Peers with at least one unexpired address.
    pub fn peers_with_addrs(&self) -> Vec<PeerId> {
        let now = Instant::now();
        self.peers
            .iter()
            .filter(|entry| entry.value().values().any(|expiry| expiry.is_live(now)))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Evict expired records, returning how many were removed.
    ///
    /// The scan only nominates candidates. Each candidate is re-checked under its
    /// entry guard with a fresh clock reading, so an address whose TTL was extended
    /// after the scan survives.
    pub fn evict_expired(&self) -> usize {
        let evicted = self
            .expired_candidates(Instant::now())
            .iter()
            .map(|peer| self.evict_peer(peer))
            .sum();

        if evicted > 0 {
            self.metrics.inc_addrs_evicted(evicted);
        }
        evicted
    }

    /// Peers holding at least one record already expired at `now`.
    fn expired_candidates(&self, now: Instant) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|entry| entry.value().values().any(|expiry| !expiry.is_live(now)))
            .map(|entry| *entry.key())
            .collect()
    }

    /// Drop the peer's records that are expired as of a clock read under its guard.
    fn evict_peer(&self, peer: &PeerId) -> usize {
        let Some(mut set) = self.peers.get_mut(peer) else {
            return 0;
        };
        let now = Instant::now();
        let before = set.len();
        set.retain(|_, expiry| expiry.is_live(now));
        let removed = before - set.len();
        if removed > 0 {
            trace!(%peer, removed, "evicted expired addresses");
        }
        removed
    }

    /// Whether the book has ever seen `peer`.
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    /// Every peer referenced by the book, with or without live addresses.
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, mpsc};
    use std::thread;

    use assert_matches::assert_matches;

    use super::*;
    use crate::test_utils::{test_addr, test_peer_id};

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_add_and_get() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addrs(peer, [test_addr(1)], HOUR).unwrap();
        book.add_addrs(peer, [test_addr(2)], HOUR).unwrap();

        assert_eq!(book.addrs(&peer).unwrap(), vec![test_addr(1), test_addr(2)]);
    }

    #[test]
    fn test_dedup_keeps_first_position() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addrs(peer, [test_addr(1), test_addr(2)], HOUR)
            .unwrap();
        book.add_addrs(peer, [test_addr(3), test_addr(1)], HOUR)
            .unwrap();

        assert_eq!(
            book.addrs(&peer).unwrap(),
            vec![test_addr(1), test_addr(2), test_addr(3)]
        );
    }

    #[test]
    fn test_unknown_peer() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        assert_matches!(book.addrs(&peer), Err(PeerStoreError::PeerNotFound(p)) if p == peer);
        assert!(!book.contains(&peer));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        assert_matches!(
            book.add_addr(peer, test_addr(1), Duration::ZERO),
            Err(PeerStoreError::InvalidTtl)
        );
        assert!(!book.contains(&peer));
        assert!(book.is_empty());
    }

    #[test]
    fn test_empty_add_references_peer() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addrs(peer, Vec::new(), HOUR).unwrap();
        assert!(book.contains(&peer));
        assert!(book.addrs(&peer).unwrap().is_empty());
        assert!(book.peers_with_addrs().is_empty());
    }

    #[test]
    fn test_clear_addrs() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);
        let unknown = test_peer_id(2);

        book.add_addrs(peer, [test_addr(1), test_addr(2)], HOUR)
            .unwrap();
        book.clear_addrs(&peer);
        book.clear_addrs(&unknown);

        assert!(book.addrs(&peer).unwrap().is_empty());
        assert!(!book.contains(&unknown));
        assert!(book.peers_with_addrs().is_empty());
    }

    #[test]
    fn test_expiry_hidden_before_sweep() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addr(peer, test_addr(1), Duration::from_millis(20))
            .unwrap();
        assert_eq!(book.addrs(&peer).unwrap(), vec![test_addr(1)]);
        assert_eq!(book.peers_with_addrs(), vec![peer]);

        thread::sleep(Duration::from_millis(50));

        assert!(book.addrs(&peer).unwrap().is_empty());
        assert!(book.peers_with_addrs().is_empty());
    }

    #[test]
    fn test_ttl_never_shortened() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addr(peer, test_addr(1), HOUR).unwrap();
        book.add_addr(peer, test_addr(1), Duration::from_millis(1))
            .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(book.evict_expired(), 0);
        assert_eq!(book.addrs(&peer).unwrap(), vec![test_addr(1)]);
    }

    #[test]
    fn test_ttl_extended() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addr(peer, test_addr(1), Duration::from_millis(20))
            .unwrap();
        book.add_addr(peer, test_addr(1), HOUR).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(book.addrs(&peer).unwrap(), vec![test_addr(1)]);
    }

    #[test]
    fn test_permanent_ttl_never_expires() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addr(peer, test_addr(1), crate::PERMANENT_ADDR_TTL)
            .unwrap();
        book.add_addr(peer, test_addr(1), Duration::from_millis(1))
            .unwrap();
        book.add_addr(peer, test_addr(2), crate::CONNECTED_ADDR_TTL)
            .unwrap();

        thread::sleep(Duration::from_millis(10));
        assert_eq!(book.evict_expired(), 0);
        assert_eq!(book.addrs(&peer).unwrap().len(), 2);
    }

    #[test]
    fn test_evict_expired() {
        let book = AddrBook::new();
        let live = test_peer_id(1);
        let stale = test_peer_id(2);

        book.add_addr(live, test_addr(1), HOUR).unwrap();
        book.add_addr(live, test_addr(2), Duration::from_millis(10))
            .unwrap();
        book.add_addrs(stale, [test_addr(3), test_addr(4)], Duration::from_millis(10))
            .unwrap();

        thread::sleep(Duration::from_millis(40));

        assert_eq!(book.evict_expired(), 3);
        assert_eq!(book.addrs(&live).unwrap(), vec![test_addr(1)]);
        // Fully-evicted peers remain known.
        assert!(book.addrs(&stale).unwrap().is_empty());
        assert_eq!(book.len(), 2);
        assert_eq!(book.peers_with_addrs(), vec![live]);
    }

    #[test]
    fn test_reinsert_after_expiry() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addr(peer, test_addr(1), Duration::from_millis(10))
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        book.add_addr(peer, test_addr(1), HOUR).unwrap();

        assert_eq!(book.evict_expired(), 0);
        assert_eq!(book.addrs(&peer).unwrap(), vec![test_addr(1)]);
    }

    #[test]
    fn test_extension_between_scan_and_evict_survives() {
        let book = AddrBook::new();
        let peer = test_peer_id(1);

        book.add_addrs(peer, [test_addr(1), test_addr(2)], Duration::from_millis(5))
            .unwrap();
        thread::sleep(Duration::from_millis(20));

        let candidates = book.expired_candidates(Instant::now());
        assert_eq!(candidates, vec![peer]);

        book.add_addr(peer, test_addr(1), HOUR).unwrap();

        assert_eq!(book.evict_peer(&peer), 1);
        assert_eq!(book.addrs(&peer).unwrap(), vec![test_addr(1)]);
    }

    #[test]
    fn test_lazy_addrs_may_read_book() {
        let book = Arc::new(AddrBook::new());
        let peer = test_peer_id(1);
        book.add_addr(peer, test_addr(1), HOUR).unwrap();

        let (tx, rx) = mpsc::channel();
        let writer = Arc::clone(&book);
        thread::spawn(move || {
            let derived = (0..1)
                .flat_map(|_| writer.addrs(&peer).unwrap_or_default())
                .chain([test_addr(2)]);
            let _ = tx.send(writer.add_addrs(peer, derived, HOUR));
        });

        let result = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("add_addrs blocked on its own entry guard");
        assert!(result.is_ok());
        assert_eq!(book.addrs(&peer).unwrap(), vec![test_addr(1), test_addr(2)]);
    }
}
