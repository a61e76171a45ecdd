//! Peer store facade over the address, key, protocol and metadata books.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use libp2p::identity::{Keypair, PublicKey};
use libp2p::{Multiaddr, PeerId};

use crate::addr_book::AddrBook;
use crate::config::PeerStoreConfig;
use crate::error::{PeerStoreError, Result};
use crate::key_book::KeyBook;
use crate::metadata::{MetadataBook, MetadataValue};
use crate::proto_book::ProtoBook;
use crate::sweep::{AddrSweeper, SweepHandle};

/// A peer and its currently dialable addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub peer_id: PeerId,
    pub addrs: Vec<Multiaddr>,
}

/// The node's record of remote peers.
///
/// Each book is independently sharded by peer; the store never holds a guard across
/// books. "Known" is scoped per book: [`PeerStore::addrs`] and [`PeerStore::peer_info`]
/// consult the address book only, key lookups the key book only, while protocol and
/// metadata lookups (and [`PeerStore::peer_ids`]) consider every book.
#[derive(Debug, Default)]
pub struct PeerStore {
    config: PeerStoreConfig,
    addrs: AddrBook,
    keys: KeyBook,
    protocols: ProtoBook,
    metadata: MetadataBook,
}

impl PeerStore {
    pub fn new(config: PeerStoreConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PeerStoreConfig::default())
    }

    pub fn config(&self) -> &PeerStoreConfig {
        &self.config
    }

    /// Start the background address expiry sweep at the configured interval.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweepHandle {
        AddrSweeper::new(Arc::clone(self), self.config.sweep_interval).spawn()
    }

    pub fn addr_book(&self) -> &AddrBook {
        &self.addrs
    }

    pub fn key_book(&self) -> &KeyBook {
        &self.keys
    }

    pub fn proto_book(&self) -> &ProtoBook {
        &self.protocols
    }

    pub fn metadata(&self) -> &MetadataBook {
        &self.metadata
    }

    // Addresses

    pub fn peer_info(&self, peer: &PeerId) -> Result<PeerInfo> {
        Ok(PeerInfo {
            peer_id: *peer,
            addrs: self.addrs.addrs(peer)?,
        })
    }

    pub fn add_addr(&self, peer: PeerId, addr: Multiaddr, ttl: Duration) -> Result<()> {
        self.addrs.add_addr(peer, addr, ttl)
    }

    pub fn add_addrs(
        &self,
        peer: PeerId,
        addrs: impl IntoIterator<Item = Multiaddr>,
        ttl: Duration,
    ) -> Result<()> {
        self.addrs.add_addrs(peer, addrs, ttl)
    }

    pub fn addrs(&self, peer: &PeerId) -> Result<Vec<Multiaddr>> {
        self.addrs.addrs(peer)
    }

    pub fn clear_addrs(&self, peer: &PeerId) {
        self.addrs.clear_addrs(peer)
    }

    pub fn peers_with_addrs(&self) -> Vec<PeerId> {
        self.addrs.peers_with_addrs()
    }

    // Protocols

    pub fn add_protocols<S: AsRef<str>>(&self, peer: PeerId, protocols: &[S]) {
        self.protocols.add_protocols(peer, protocols)
    }

    pub fn set_protocols<S: AsRef<str>>(&self, peer: PeerId, protocols: &[S]) {
        self.protocols.set_protocols(peer, protocols)
    }

    pub fn remove_protocols<S: AsRef<str>>(&self, peer: &PeerId, protocols: &[S]) {
        self.protocols.remove_protocols(peer, protocols)
    }

    /// Protocols of `peer`, empty if the peer is known elsewhere but has none recorded.
    pub fn get_protocols(&self, peer: &PeerId) -> Result<Vec<String>> {
        match self.protocols.protocols(peer) {
            Some(protocols) => Ok(protocols),
            None => self.known_or_not_found(peer).map(|()| Vec::new()),
        }
    }

    pub fn supports_protocols<S: AsRef<str>>(
        &self,
        peer: &PeerId,
        protocols: &[S],
    ) -> Result<Vec<String>> {
        match self.protocols.supports_protocols(peer, protocols) {
            Some(supported) => Ok(supported),
            None => self.known_or_not_found(peer).map(|()| Vec::new()),
        }
    }

    pub fn first_supported_protocol<S: AsRef<str>>(
        &self,
        peer: &PeerId,
        protocols: &[S],
    ) -> Result<Option<String>> {
        match self.protocols.first_supported_protocol(peer, protocols) {
            Some(first) => Ok(first),
            None => self.known_or_not_found(peer).map(|()| None),
        }
    }

    // Keys

    pub fn add_pubkey(&self, peer: PeerId, key: PublicKey) -> Result<()> {
        self.keys.add_pubkey(peer, key)
    }

    pub fn pubkey(&self, peer: &PeerId) -> Result<PublicKey> {
        self.keys.pubkey(peer)
    }

    pub fn add_privkey(&self, peer: PeerId, key: Keypair) {
        self.keys.add_privkey(peer, key)
    }

    pub fn privkey(&self, peer: &PeerId) -> Result<Keypair> {
        self.keys.privkey(peer)
    }

    pub fn add_key_pair(&self, peer: PeerId, keypair: Keypair) -> Result<()> {
        self.keys.add_key_pair(peer, keypair)
    }

    pub fn peers_with_keys(&self) -> Vec<PeerId> {
        self.keys.peers_with_keys()
    }

    // Metadata

    pub fn put(&self, peer: PeerId, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.metadata.put(peer, key, value)
    }

    pub fn get(&self, peer: &PeerId, key: &str) -> Result<MetadataValue> {
        let missing = || PeerStoreError::MetadataNotFound {
            peer: *peer,
            key: key.to_owned(),
        };
        match self.metadata.get(peer, key) {
            Some(value) => value.ok_or_else(missing),
            None => self.known_or_not_found(peer).and_then(|()| Err(missing())),
        }
    }

    // Peers

    /// Whether any book references `peer`.
    pub fn is_known(&self, peer: &PeerId) -> bool {
        self.addrs.contains(peer)
            || self.keys.contains(peer)
            || self.protocols.contains(peer)
            || self.metadata.contains(peer)
    }

    /// Every peer referenced by any book.
    pub fn peer_ids(&self) -> Vec<PeerId> {
        let mut seen = HashSet::new();
        self.addrs
            .peer_ids()
            .into_iter()
            .chain(self.keys.peer_ids())
            .chain(self.protocols.peer_ids())
            .chain(self.metadata.peer_ids())
            .filter(|peer| seen.insert(*peer))
            .collect()
    }

    fn known_or_not_found(&self, peer: &PeerId) -> Result<()> {
        if self.is_known(peer) {
            Ok(())
        } else {
            Err(PeerStoreError::PeerNotFound(*peer))
        }
    }
}
