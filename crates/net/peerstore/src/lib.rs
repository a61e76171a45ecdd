//! Concurrent peer store: what the node knows about remote peers.
//!
//! - [`addr_book`] - dialable addresses with TTL-based expiry
//! - [`key_book`] - identity keys, validated against the peer ID
//! - [`proto_book`] - supported protocol IDs
//! - [`metadata`] - arbitrary named values
//! - [`store`] - the [`PeerStore`] facade over all four
//! - [`sweep`] - background eviction of expired addresses
//!
//! Every book is a sharded map keyed by [`PeerId`](libp2p::PeerId): writers on
//! distinct peers never contend, and every read returns an owned snapshot.

pub mod addr_book;
pub mod config;
pub mod error;
pub mod key_book;
pub mod metadata;
mod metrics;
pub mod proto_book;
pub mod store;
pub mod sweep;

pub use addr_book::AddrBook;
pub use config::{
    CONNECTED_ADDR_TTL, DEFAULT_SWEEP_INTERVAL, OWN_OBSERVED_ADDR_TTL, PERMANENT_ADDR_TTL,
    PROVIDER_ADDR_TTL, PeerStoreConfig, RECENTLY_CONNECTED_ADDR_TTL, TEMP_ADDR_TTL,
};
pub use error::{KeyKind, PeerStoreError, Result};
pub use key_book::KeyBook;
pub use metadata::{MetadataBook, MetadataValue};
pub use proto_book::ProtoBook;
pub use store::{PeerInfo, PeerStore};
pub use sweep::{AddrSweeper, SweepHandle};
