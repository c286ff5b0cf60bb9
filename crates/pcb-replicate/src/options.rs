use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::selection::ContainmentPolicy;

/// What a replication copies and how it treats what is already there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateOptions {
    pub tracks: bool,
    pub zones: bool,
    pub text: bool,
    pub drawings: bool,
    /// Clear the target sheet's tracks, zones, text and drawings first.
    pub remove_existing: bool,
    /// Items must lie entirely inside the sub-circuit's box (otherwise
    /// touching it is enough).
    pub containing: bool,
    /// Also move locked footprints.
    pub locked_footprints: bool,
    /// Drop exact duplicates of copied items once every sheet is done.
    pub remove_duplicates: bool,
}

impl Default for ReplicateOptions {
    fn default() -> Self {
        Self {
            tracks: true,
            zones: true,
            text: true,
            drawings: true,
            remove_existing: false,
            containing: true,
            locked_footprints: false,
            remove_duplicates: false,
        }
    }
}

impl ReplicateOptions {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse replication options")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("In {}", path.display()))
    }

    pub fn policy(&self) -> ContainmentPolicy {
        ContainmentPolicy::from_containing(self.containing)
    }
}
