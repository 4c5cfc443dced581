//! Persisted engine state.
//!
//! A snapshot captures everything needed to rebuild a [`crate::realm::Realm`]:
//! territories, buildings, ledger balances and the id counters. Open capture
//! sessions are not persisted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buildings::PlayerBuilding;
use crate::error::{ClaimError, Result};
use crate::ids::{OwnerId, Timestamp};
use crate::ledger::Balances;
use crate::territory::Territory;

/// Snapshot format version for compatibility.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable copy of the engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealmSnapshot {
    /// Snapshot format version.
    pub version: u32,
    /// Time the snapshot was taken.
    pub taken_at: Timestamp,
    /// Committed territories.
    pub territories: Vec<Territory>,
    /// Next territory id to issue.
    pub next_territory_id: u64,
    /// Buildings as stored.
    pub buildings: Vec<PlayerBuilding>,
    /// Next building id to issue.
    pub next_building_id: u64,
    /// Ledger balances by owner.
    pub balances: Vec<(OwnerId, Balances)>,
}

impl RealmSnapshot {
    /// Encode to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| ClaimError::Snapshot(format!("Failed to serialize snapshot: {e}")))
    }

    /// Decode from bytes, rejecting other format versions.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let snapshot: Self = bincode::deserialize(data)
            .map_err(|e| ClaimError::Snapshot(format!("Failed to deserialize snapshot: {e}")))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ClaimError::Snapshot(format!(
                "Snapshot version mismatch: expected {SNAPSHOT_VERSION}, got {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Write the encoded snapshot to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|source| ClaimError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ClaimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }
}
