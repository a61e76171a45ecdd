//! Peer store error types.

use libp2p::PeerId;
use thiserror::Error;

/// Which half of a peer's key record a lookup asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Public,
    Private,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Private => f.write_str("private"),
        }
    }
}

/// Errors returned by the peer store and its books.
///
/// Every failing operation leaves the store unmodified.
#[derive(Debug, Error)]
pub enum PeerStoreError {
    /// The peer was never referenced by the book (or, for facade-wide queries,
    /// by any book).
    #[error("peer {0} not found")]
    PeerNotFound(PeerId),

    /// The peer is known but the requested key half is absent.
    #[error("{kind} key not found for peer {peer}")]
    KeyNotFound { peer: PeerId, kind: KeyKind },

    /// The peer is known but has no value under this metadata key.
    #[error("metadata {key:?} not found for peer {peer}")]
    MetadataNotFound { peer: PeerId, key: String },

    /// The public key does not hash to the peer it was filed under.
    #[error("public key derives peer {derived}, expected {expected}")]
    PeerIdMismatch { expected: PeerId, derived: PeerId },

    /// A different public key is already stored for this peer.
    #[error("conflicting public key for peer {0}")]
    KeyMismatch(PeerId),

    /// Address TTL must be strictly positive.
    #[error("address TTL must be greater than zero")]
    InvalidTtl,

    /// Encoding or decoding a metadata payload failed.
    #[error("metadata codec error: {0}")]
    MetadataCodec(String),
}

pub type Result<T, E = PeerStoreError> = std::result::Result<T, E>;
