//! Per-peer named metadata values.

use std::collections::HashMap;

use dashmap::DashMap;
use libp2p::PeerId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{PeerStoreError, Result};

/// A metadata value.
///
/// Common scalar shapes have their own variants. Anything else crosses an explicit
/// serialization boundary through [`MetadataValue::encode`] and
/// [`MetadataValue::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
    Bytes(Vec<u8>),
    /// A postcard-encoded value of a caller-defined type.
    Encoded(Vec<u8>),
}

impl MetadataValue {
    /// Encode an arbitrary serializable value.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self> {
        postcard::to_allocvec(value)
            .map(Self::Encoded)
            .map_err(|e| PeerStoreError::MetadataCodec(e.to_string()))
    }

    /// Decode a value stored with [`MetadataValue::encode`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Self::Encoded(bytes) => postcard::from_bytes(bytes)
                .map_err(|e| PeerStoreError::MetadataCodec(e.to_string())),
            other => Err(PeerStoreError::MetadataCodec(format!(
                "expected encoded value, found {other:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<Vec<u8>> for MetadataValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Metadata book, last write wins.
#[derive(Debug, Default)]
pub struct MetadataBook {
    peers: DashMap<PeerId, HashMap<String, MetadataValue>>,
}

impl MetadataBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, peer: PeerId, key: impl Into<String>, value: impl Into<MetadataValue>) {
        let key = key.into();
        trace!(%peer, %key, "stored peer metadata");
        self.peers.entry(peer).or_default().insert(key, value.into());
    }

    /// Value stored under `key`. `None` if the book has no entry for `peer`;
    /// `Some(None)` if the peer has metadata but not this key.
    pub fn get(&self, peer: &PeerId, key: &str) -> Option<Option<MetadataValue>> {
        self.peers.get(peer).map(|map| map.get(key).cloned())
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|entry| *entry.key()).collect()
    }
}
