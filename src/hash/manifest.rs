//! Manifests of persisted hash trees
//!
//! A manifest records the tree of every hashed file together with the part
//! size and algorithm, which must match for trees to be comparable.

use super::file::FileHash;
use super::tree::HashTree;
use crate::config::DigestAlgorithm;
use crate::error::{IoResultExt, PartHashError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Manifest entry for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path as given when hashing
    pub path: String,
    /// File size
    pub size: u64,
    /// Stored tree, root first
    pub tree: HashTree,
}

impl From<FileHash> for ManifestEntry {
    fn from(hash: FileHash) -> Self {
        Self {
            path: hash.path.display().to_string(),
            size: hash.size,
            tree: hash.tree,
        }
    }
}

/// Collection of file trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeManifest {
    /// Algorithm used for all trees
    pub algorithm: DigestAlgorithm,
    /// Part size used for all trees
    pub part_size: u64,
    /// Creation timestamp (Unix seconds)
    pub created: u64,
    /// File entries
    pub entries: Vec<ManifestEntry>,
}

impl TreeManifest {
    /// Create a new empty manifest
    pub fn new(algorithm: DigestAlgorithm, part_size: u64) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        Self {
            algorithm,
            part_size,
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            entries: Vec::new(),
        }
    }

    /// Add a file entry; its tree must use the manifest's algorithm
    pub fn add_entry(&mut self, entry: ManifestEntry) -> Result<()> {
        if entry.tree.algorithm() != self.algorithm {
            return Err(PartHashError::config(format!(
                "entry '{}' uses {}, manifest uses {}",
                entry.path,
                entry.tree.algorithm().name(),
                self.algorithm.name()
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Find entry by path
    pub fn find_entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Paths whose stored tree fails the self-consistency check
    pub fn verify_all(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.tree.is_self_consistent())
            .map(|e| e.path.as_str())
            .collect()
    }

    /// Save manifest to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PartHashError::Encode(e.to_string()))?;
        std::fs::write(path, json).with_path(path)?;
        Ok(())
    }

    /// Load manifest from JSON file; malformed trees are rejected while decoding
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).with_path(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
