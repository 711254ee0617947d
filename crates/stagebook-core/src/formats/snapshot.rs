//! # Snapshot Format
//!
//! Binary export of every table.
//!
//! Format: Header (5 bytes) + postcard-serialized [`Tables`].
//! - 4 bytes: Magic ("STBK")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is parsed, and a decoded
//! snapshot is rejected if any row is stored under a key other than its id.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES};
use crate::store::Tables;
use crate::StagebookError;

/// Maximum accepted snapshot size.
///
/// Checked before deserialization so corrupt input cannot force a huge
/// allocation.
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024; // 256 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The snapshot header precedes all table data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Check magic bytes and version.
    pub fn validate(&self) -> Result<(), StagebookError> {
        if &self.magic != MAGIC_BYTES {
            return Err(StagebookError::Serialization(
                "Invalid magic bytes: not a Stagebook snapshot".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(StagebookError::Serialization(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StagebookError> {
        match bytes {
            [m0, m1, m2, m3, version, ..] => Ok(Self {
                magic: [*m0, *m1, *m2, *m3],
                version: *version,
            }),
            _ => Err(StagebookError::Serialization(
                "Header too short".to_string(),
            )),
        }
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Serialize every table (header + payload). Pure; no file I/O.
pub fn snapshot_to_bytes(tables: &Tables) -> Result<Vec<u8>, StagebookError> {
    let payload =
        postcard::to_stdvec(tables).map_err(|e| StagebookError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&SnapshotHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize a snapshot. Pure; no file I/O.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Tables, StagebookError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(StagebookError::Serialization(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    let tables: Tables = postcard::from_bytes(payload).map_err(|e| {
        StagebookError::Serialization(format!("Failed to decode snapshot tables: {e}"))
    })?;
    tables.validate_keys()?;
    Ok(tables)
}

/// 64-bit FNV-1a checksum of snapshot bytes.
///
/// Detects accidental corruption; not collision resistant.
#[must_use]
pub fn snapshot_checksum(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

/// BLAKE3 hash of snapshot bytes as a 64-character hex string.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn snapshot_crypto_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntityStore, MemoryStore};
    use crate::{Hours, ProjectId, RibaStage, StageAllocation, AllocationId};

    fn sample() -> Tables {
        let mut store = MemoryStore::new();
        store
            .insert(|id| StageAllocation {
                id: AllocationId(id),
                project: ProjectId(1),
                stage: RibaStage::ConceptDesign,
                allocated: Hours::whole(120),
                is_active: true,
            })
            .expect("insert");
        store.tables().clone()
    }

    #[test]
    fn header_starts_with_magic() {
        let bytes = snapshot_to_bytes(&Tables::default()).expect("encode");
        assert_eq!(&bytes[..4], MAGIC_BYTES);
        assert_eq!(bytes[4], FORMAT_VERSION);
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let bytes1 = snapshot_to_bytes(&sample()).expect("encode");
        let restored = snapshot_from_bytes(&bytes1).expect("decode");
        let bytes2 = snapshot_to_bytes(&restored).expect("encode");

        assert_eq!(restored, sample());
        assert_eq!(bytes1, bytes2, "save -> load -> save must produce identical bytes");
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = snapshot_to_bytes(&sample()).expect("encode");
        bytes[..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            snapshot_from_bytes(&bytes),
            Err(StagebookError::Serialization(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = snapshot_to_bytes(&sample()).expect("encode");
        bytes[4] = FORMAT_VERSION + 1;
        assert!(snapshot_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_input_rejected() {
        assert!(snapshot_from_bytes(b"STB").is_err());
        let bytes = snapshot_to_bytes(&sample()).expect("encode");
        assert!(snapshot_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn checksum_changes_with_content() {
        let empty = snapshot_to_bytes(&Tables::default()).expect("encode");
        let full = snapshot_to_bytes(&sample()).expect("encode");
        assert_eq!(snapshot_checksum(&full), snapshot_checksum(&full));
        assert_ne!(snapshot_checksum(&empty), snapshot_checksum(&full));
    }
}
