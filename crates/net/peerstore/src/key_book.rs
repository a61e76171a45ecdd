//! Per-peer identity keys with peer ID validation.

use dashmap::DashMap;
use libp2p::PeerId;
use libp2p::identity::{Keypair, PublicKey};
use tracing::{debug, warn};

use crate::error::{KeyKind, PeerStoreError, Result};
use crate::metrics::PeerStoreMetrics;

#[derive(Debug, Clone, Default)]
struct KeyRecord {
    public: Option<PublicKey>,
    /// Private key material. libp2p only exposes scheme-agnostic private keys through
    /// [`Keypair`].
    private: Option<Keypair>,
}

/// Key book. A stored public key always hashes to the peer it is filed under.
#[derive(Debug, Default)]
pub struct KeyBook {
    peers: DashMap<PeerId, KeyRecord>,
    metrics: PeerStoreMetrics,
}

impl KeyBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the public key of `peer`.
    ///
    /// Fails with [`PeerStoreError::PeerIdMismatch`] if `key` does not derive `peer`, and
    /// with [`PeerStoreError::KeyMismatch`] if a different key is already stored. Nothing
    /// is written on failure.
    pub fn add_pubkey(&self, peer: PeerId, key: PublicKey) -> Result<()> {
        self.validate(&peer, &key)?;

        let mut record = self.peers.entry(peer).or_default();
        check_conflict(&peer, record.public.as_ref(), &key).inspect_err(|_| {
            self.metrics.inc_keys_rejected();
        })?;
        record.public = Some(key);
        debug!(%peer, "stored peer public key");
        Ok(())
    }

    /// Store the private key of `peer`. Private keys carry no public commitment to
    /// validate, so this never fails.
    pub fn add_privkey(&self, peer: PeerId, key: Keypair) {
        self.peers.entry(peer).or_default().private = Some(key);
        debug!(%peer, "stored peer private key");
    }

    /// Store both halves of `keypair` for `peer` under one entry guard.
    ///
    /// The public half is validated like [`KeyBook::add_pubkey`]; on failure neither
    /// half is stored.
    pub fn add_key_pair(&self, peer: PeerId, keypair: Keypair) -> Result<()> {
        let public = keypair.public();
        self.validate(&peer, &public)?;

        let mut record = self.peers.entry(peer).or_default();
        check_conflict(&peer, record.public.as_ref(), &public).inspect_err(|_| {
            self.metrics.inc_keys_rejected();
        })?;
        record.public = Some(public);
        record.private = Some(keypair);
        debug!(%peer, "stored peer key pair");
        Ok(())
    }

    pub fn pubkey(&self, peer: &PeerId) -> Result<PublicKey> {
        let record = self
            .peers
            .get(peer)
            .ok_or(PeerStoreError::PeerNotFound(*peer))?;
        record.public.clone().ok_or(PeerStoreError::KeyNotFound {
            peer: *peer,
            kind: KeyKind::Public,
        })
    }

    pub fn privkey(&self, peer: &PeerId) -> Result<Keypair> {
        let record = self
            .peers
            .get(peer)
            .ok_or(PeerStoreError::PeerNotFound(*peer))?;
        record.private.clone().ok_or(PeerStoreError::KeyNotFound {
            peer: *peer,
            kind: KeyKind::Private,
        })
    }

    /// Peers with at least one stored key half.
    pub fn peers_with_keys(&self) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|entry| entry.public.is_some() || entry.private.is_some())
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|entry| *entry.key()).collect()
    }

    fn validate(&self, peer: &PeerId, key: &PublicKey) -> Result<()> {
        let derived = key.to_peer_id();
        if derived != *peer {
            self.metrics.inc_keys_rejected();
            warn!(%peer, %derived, "rejected public key for wrong peer");
            return Err(PeerStoreError::PeerIdMismatch {
                expected: *peer,
                derived,
            });
        }
        Ok(())
    }
}

fn check_conflict(peer: &PeerId, stored: Option<&PublicKey>, key: &PublicKey) -> Result<()> {
    match stored {
        Some(existing) if existing != key => {
            warn!(%peer, "rejected conflicting public key");
            Err(PeerStoreError::KeyMismatch(*peer))
        }
        _ => Ok(()),
    }
}
