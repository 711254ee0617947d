//! # Formats
//!
//! Byte-level encodings. File I/O stays in the app layer.

mod snapshot;

#[cfg(feature = "crypto-hash")]
pub use snapshot::snapshot_crypto_hash;
pub use snapshot::{
    MAX_SNAPSHOT_SIZE, SnapshotHeader, snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes,
};
