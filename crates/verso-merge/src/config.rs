use serde::{Deserialize, Serialize};
use verso_store::{DataTypeConflictHandler, CONFLICT_SUFFIX};

use crate::error::{MergeError, MergeResult};

/// Configuration for a merge transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Policy for two different data types created under the same name in
    /// the same category.
    pub data_type_handler: DataTypeConflictHandler,
    /// Suffix appended to a category or data type that loses a name
    /// collision.
    pub conflict_suffix: String,
    /// Drop a map that one side removed when nothing survives in it.
    pub drop_empty_removed_maps: bool,
    /// Re-create a deleted category when surviving content still lives
    /// under it. When `false` such a merge fails with `NotFound`.
    pub resurrect_orphans: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            data_type_handler: DataTypeConflictHandler::default(),
            conflict_suffix: CONFLICT_SUFFIX.to_string(),
            drop_empty_removed_maps: true,
            resurrect_orphans: true,
        }
    }
}

impl MergeConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> MergeResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| MergeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MergeResult<()> {
        if self.conflict_suffix.is_empty() {
            return Err(MergeError::Config("conflict_suffix must not be empty".into()));
        }
        if self.conflict_suffix.contains('/') || self.conflict_suffix.trim() != self.conflict_suffix {
            return Err(MergeError::Config(format!(
                "conflict_suffix {:?} cannot be part of a category name",
                self.conflict_suffix
            )));
        }
        Ok(())
    }
}
