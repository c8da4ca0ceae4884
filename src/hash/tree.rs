//! Two-level hash tree: one root followed by the part digests
//!
//! A file with a single part collapses to a tree holding only its root,
//! which is that part's digest. Files with more parts store the root
//! (digest of the concatenated part digests) followed by every part digest
//! in file order.

use super::engine::{digest_bytes, Digest, DigestEngine, Engine};
use super::verify;
use crate::config::DigestAlgorithm;
use crate::error::{PartHashError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root digest over the ordered part digests
pub(crate) fn compose_root(algorithm: DigestAlgorithm, parts: &[Digest]) -> Digest {
    let mut engine = Engine::new(algorithm);
    for part in parts {
        engine.update(part.as_bytes());
    }
    engine.finalize_reset()
}

/// Root plus part digests of one file version
///
/// Every decoded tree has a root and entries of the algorithm's width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredTree")]
pub struct HashTree {
    algorithm: DigestAlgorithm,
    digests: Vec<Digest>,
}

/// Wire shape of [`HashTree`] before its entries are checked
#[derive(Deserialize)]
struct StoredTree {
    algorithm: DigestAlgorithm,
    digests: Vec<Digest>,
}

impl TryFrom<StoredTree> for HashTree {
    type Error = PartHashError;

    fn try_from(stored: StoredTree) -> Result<Self> {
        let tree = Self {
            algorithm: stored.algorithm,
            digests: stored.digests,
        };
        tree.check_shape()?;
        Ok(tree)
    }
}

impl HashTree {
    /// Build a tree from part digests in file order, computing the root
    pub fn from_part_digests(algorithm: DigestAlgorithm, parts: Vec<Digest>) -> Result<Self> {
        if parts.is_empty() {
            return Err(PartHashError::decode("a tree needs at least one part digest"));
        }
        check_widths(algorithm, &parts)?;

        let digests = if parts.len() == 1 {
            parts
        } else {
            let root = compose_root(algorithm, &parts);
            let mut digests = Vec::with_capacity(parts.len() + 1);
            digests.push(root);
            digests.extend(parts);
            digests
        };

        Ok(Self { algorithm, digests })
    }

    /// Wrap stored digests (root first) without cross-checking them
    ///
    /// Use [`HashTree::is_self_consistent`] before trusting the result.
    pub fn from_digests(algorithm: DigestAlgorithm, digests: Vec<Digest>) -> Result<Self> {
        if digests.is_empty() {
            return Err(PartHashError::decode("tree has no root"));
        }
        Ok(Self { algorithm, digests })
    }

    /// Digest algorithm of every entry
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The content identifier
    pub fn root(&self) -> &Digest {
        &self.digests[0]
    }

    /// All entries, root first
    pub fn digests(&self) -> &[Digest] {
        &self.digests
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Always false: every tree holds at least its root
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Number of parts the hashed file had
    pub fn part_count(&self) -> u64 {
        if self.digests.len() > 1 {
            (self.digests.len() - 1) as u64
        } else {
            1
        }
    }

    /// Stored part digests; a collapsed tree has none
    pub fn part_digests(&self) -> &[Digest] {
        if self.digests.len() > 1 {
            &self.digests[1..]
        } else {
            &[]
        }
    }

    /// Digest of part `index`; a collapsed tree answers part 0 with its root
    pub fn part_digest(&self, index: u64) -> Option<&Digest> {
        let index = usize::try_from(index).ok()?;
        if self.digests.len() > 1 {
            self.digests.get(index + 1)
        } else if index == 0 {
            self.digests.first()
        } else {
            None
        }
    }

    /// Check one part's bytes without the rest of the file
    pub fn verify_part(&self, index: u64, data: &[u8]) -> Result<bool> {
        let expected = self.part_digest(index).ok_or(PartHashError::PartOutOfRange {
            index,
            parts: self.part_count(),
        })?;
        Ok(digest_bytes(self.algorithm, data) == *expected)
    }

    /// Part indices whose digests differ from `other`
    ///
    /// Trees of different algorithms or part counts share nothing, so every
    /// part of `self` is reported.
    pub fn mismatched_parts(&self, other: &HashTree) -> Vec<u64> {
        if self.algorithm != other.algorithm || self.part_count() != other.part_count() {
            return (0..self.part_count()).collect();
        }
        (0..self.part_count())
            .filter(|&i| self.part_digest(i) != other.part_digest(i))
            .collect()
    }

    /// Root recomputes from the stored parts
    pub fn is_self_consistent(&self) -> bool {
        verify::is_self_consistent(self)
    }

    /// Fixed-width concatenation of every entry, root first
    pub fn to_raw(&self) -> Vec<u8> {
        self.digests
            .iter()
            .flat_map(|d| d.as_bytes().iter().copied())
            .collect()
    }

    /// Split a fixed-width concatenation back into entries
    pub fn from_raw(algorithm: DigestAlgorithm, bytes: &[u8]) -> Result<Self> {
        let width = algorithm.output_size();
        if bytes.is_empty() || bytes.len() % width != 0 {
            return Err(PartHashError::decode(format!(
                "raw tree of {} bytes is not a whole number of {}-byte digests",
                bytes.len(),
                width
            )));
        }
        let digests = bytes.chunks_exact(width).map(Digest::from_bytes).collect();
        Ok(Self { algorithm, digests })
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PartHashError::Encode(e.to_string()))
    }

    /// Decode from JSON, checking digest widths
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as compact binary
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| PartHashError::Encode(e.to_string()))
    }

    /// Decode from compact binary, checking digest widths
    pub fn from_binary(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Write to `path` as JSON or binary
    pub fn save(&self, path: &Path, binary: bool) -> Result<()> {
        let bytes = if binary {
            self.to_binary()?
        } else {
            self.to_json()?.into_bytes()
        };
        std::fs::write(path, bytes).map_err(|e| PartHashError::open(path, e))
    }

    /// Read from `path` as JSON or binary
    pub fn load(path: &Path, binary: bool) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| PartHashError::open(path, e))?;
        if binary {
            Self::from_binary(&bytes)
        } else {
            let json = String::from_utf8(bytes)
                .map_err(|e| PartHashError::decode(format!("tree is not UTF-8: {}", e)))?;
            Self::from_json(&json)
        }
    }

    fn check_shape(&self) -> Result<()> {
        if self.digests.is_empty() {
            return Err(PartHashError::decode("tree has no root"));
        }
        check_widths(self.algorithm, &self.digests)
    }
}

impl std::fmt::Display for HashTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root())
    }
}

fn check_widths(algorithm: DigestAlgorithm, digests: &[Digest]) -> Result<()> {
    let width = algorithm.output_size();
    match digests.iter().position(|d| d.len() != width) {
        Some(i) => Err(PartHashError::decode(format!(
            "entry {} is {} bytes, {} digests are {} bytes",
            i,
            digests[i].len(),
            algorithm.name(),
            width
        ))),
        None => Ok(()),
    }
}
