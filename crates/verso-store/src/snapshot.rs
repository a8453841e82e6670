use std::fmt;

use serde::{Deserialize, Serialize};
use verso_types::SnapshotId;

use crate::category::CategoryTree;
use crate::error::{StoreError, StoreResult};
use crate::property::PropertyMapManager;

/// Which version of the program a snapshot represents in a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotRole {
    /// The common ancestor.
    Original,
    /// The upstream version checked in by someone else.
    Latest,
    /// The local checked-out version.
    Mine,
    /// The merge output.
    Result,
}

impl fmt::Display for SnapshotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Original => "original",
            Self::Latest => "latest",
            Self::Mine => "mine",
            Self::Result => "result",
        };
        f.write_str(s)
    }
}

/// Full metadata state of one program version: its category tree and its
/// user-defined property maps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub categories: CategoryTree,
    pub properties: PropertyMapManager,
}

impl Snapshot {
    /// An empty snapshot: a bare root category and no property maps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical encoding. Every collection in a snapshot is ordered, so equal
    /// snapshots always encode to equal bytes.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode and validate.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        let snapshot: Self =
            serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Content address of this snapshot.
    pub fn id(&self) -> StoreResult<SnapshotId> {
        Ok(SnapshotId::for_encoding(&self.encode()?))
    }

    /// Check the structural invariants every snapshot must satisfy at rest.
    pub fn validate(&self) -> StoreResult<()> {
        self.categories.validate()?;
        for map in self.properties.iter() {
            if let Some((address, value)) = map.iter().find(|(_, v)| v.kind() != map.kind()) {
                return Err(StoreError::Corrupt(format!(
                    "map {:?} declared {} holds {} at {address}",
                    map.name(),
                    map.kind(),
                    value.kind()
                )));
            }
        }
        Ok(())
    }
}
