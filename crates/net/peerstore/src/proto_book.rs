//! Per-peer supported protocol IDs.

use dashmap::DashMap;
use hashlink::LinkedHashSet;
use libp2p::PeerId;
use tracing::trace;

type ProtocolSet = LinkedHashSet<String>;

/// Protocol book. Each peer's protocols are kept duplicate-free in first-seen order.
///
/// Lookups return `None` for peers without an entry; the facade decides whether that
/// means "unknown peer" or "no protocols".
#[derive(Debug, Default)]
pub struct ProtoBook {
    peers: DashMap<PeerId, ProtocolSet>,
}

impl ProtoBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `protocols` into the peer's set, keeping first-seen order.
    pub fn add_protocols<S: AsRef<str>>(&self, peer: PeerId, protocols: &[S]) {
        let mut set = self.peers.entry(peer).or_default();
        extend(&mut set, protocols);
        trace!(%peer, count = set.len(), "added peer protocols");
    }

    /// Replace the peer's set with `protocols` (deduplicated, order kept).
    pub fn set_protocols<S: AsRef<str>>(&self, peer: PeerId, protocols: &[S]) {
        let mut set = ProtocolSet::new();
        extend(&mut set, protocols);
        let count = set.len();
        self.peers.insert(peer, set);
        trace!(%peer, count, "set peer protocols");
    }

    /// Remove `protocols` from the peer's set. Unknown peers are ignored.
    pub fn remove_protocols<S: AsRef<str>>(&self, peer: &PeerId, protocols: &[S]) {
        if let Some(mut set) = self.peers.get_mut(peer) {
            for protocol in protocols {
                set.remove(protocol.as_ref());
            }
        }
    }

    pub fn protocols(&self, peer: &PeerId) -> Option<Vec<String>> {
        self.peers.get(peer).map(|set| set.iter().cloned().collect())
    }

    /// The subset of `protocols` the peer supports, in the order given.
    pub fn supports_protocols<S: AsRef<str>>(
        &self,
        peer: &PeerId,
        protocols: &[S],
    ) -> Option<Vec<String>> {
        self.peers.get(peer).map(|set| {
            protocols
                .iter()
                .map(AsRef::<str>::as_ref)
                .filter(|protocol| set.contains(*protocol))
                .map(str::to_owned)
                .collect()
        })
    }

    /// The first of `protocols` the peer supports.
    pub fn first_supported_protocol<S: AsRef<str>>(
        &self,
        peer: &PeerId,
        protocols: &[S],
    ) -> Option<Option<String>> {
        self.peers.get(peer).map(|set| {
            protocols
                .iter()
                .map(AsRef::<str>::as_ref)
                .find(|protocol| set.contains(*protocol))
                .map(str::to_owned)
        })
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|entry| *entry.key()).collect()
    }
}

fn extend<S: AsRef<str>>(set: &mut ProtocolSet, protocols: &[S]) {
    for protocol in protocols {
        let protocol = protocol.as_ref();
        if !set.contains(protocol) {
            set.insert(protocol.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::test_utils::test_peer_id;

    #[test]
    fn test_add_protocols_union() {
        let book = ProtoBook::new();
        let peer = test_peer_id(1);

        book.add_protocols(peer, &["/ping/1.0.0", "/identify/1.0.0"]);
        book.add_protocols(peer, &["/kad/1.0.0", "/ping/1.0.0", "/kad/1.0.0"]);

        assert_eq!(
            book.protocols(&peer).unwrap(),
            vec!["/ping/1.0.0", "/identify/1.0.0", "/kad/1.0.0"]
        );
    }

    #[test]
    fn test_set_protocols_replaces() {
        let book = ProtoBook::new();
        let peer = test_peer_id(1);

        book.add_protocols(peer, &["/a", "/b"]);
        book.set_protocols(peer, &["/c", "/a"]);

        assert_eq!(book.protocols(&peer).unwrap(), vec!["/c", "/a"]);
    }

    #[test]
    fn test_set_empty_keeps_peer() {
        let book = ProtoBook::new();
        let peer = test_peer_id(1);

        book.set_protocols::<&str>(peer, &[]);
        assert!(book.contains(&peer));
        assert_eq!(book.protocols(&peer), Some(vec![]));
    }

    #[test]
    fn test_remove_protocols() {
        let book = ProtoBook::new();
        let peer = test_peer_id(1);
        let unknown = test_peer_id(2);

        book.add_protocols(peer, &["/a", "/b", "/c"]);
        book.remove_protocols(&peer, &["/b", "/missing"]);
        book.remove_protocols(&unknown, &["/a"]);

        assert_eq!(book.protocols(&peer).unwrap(), vec!["/a", "/c"]);
        assert!(!book.contains(&unknown));
    }

    #[test]
    fn test_supports_protocols() {
        let book = ProtoBook::new();
        let peer = test_peer_id(1);

        book.add_protocols(peer, &["/a", "/b", "/c"]);

        assert_eq!(
            book.supports_protocols(&peer, &["/c", "/x", "/a"]),
            Some(vec!["/c".to_string(), "/a".to_string()])
        );
        assert_eq!(
            book.first_supported_protocol(&peer, &["/x", "/b", "/a"]),
            Some(Some("/b".to_string()))
        );
        assert_eq!(book.first_supported_protocol(&peer, &["/x"]), Some(None));
        assert_eq!(book.supports_protocols(&test_peer_id(2), &["/a"]), None);
    }

    proptest! {
        #[test]
        fn prop_union_is_first_seen_dedup(
            first in proptest::collection::vec("[a-d]", 0..8),
            second in proptest::collection::vec("[a-d]", 0..8),
        ) {
            let book = ProtoBook::new();
            let peer = test_peer_id(1);

            book.add_protocols(peer, &first);
            book.add_protocols(peer, &second);

            let mut expected: Vec<String> = Vec::new();
            for protocol in first.iter().chain(second.iter()) {
                if !expected.contains(protocol) {
                    expected.push(protocol.clone());
                }
            }
            prop_assert_eq!(book.protocols(&peer).unwrap(), expected);
        }

        #[test]
        fn prop_set_round_trips_distinct_list(
            list in proptest::collection::hash_set("[a-z]{1,6}", 0..8),
        ) {
            let book = ProtoBook::new();
            let peer = test_peer_id(1);
            let list: Vec<String> = list.into_iter().collect();

            book.add_protocols(peer, &["/stale"]);
            book.set_protocols(peer, &list);

            prop_assert_eq!(book.protocols(&peer).unwrap(), list);
        }
    }
}
