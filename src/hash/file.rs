//! File-level helpers around the chunked hasher
//!
//! These sit at the boundary: they open files, pick pacing from the
//! configuration and, in [`try_hash_path`], translate failures into `None`
//! for callers that only want an identifier or nothing.

use super::chunked::ChunkedHasher;
use super::source::{FileSource, SequentialByteReader, SliceSource};
use super::tree::HashTree;
use crate::config::HashConfig;
use crate::error::Result;
use crate::pacing::{CancellationToken, PacerChain};
use crate::progress::{NoProgress, ProgressSink};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tree of one file together with what was hashed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    /// Path the file was read from
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Computed hash tree
    pub tree: HashTree,
}

impl std::fmt::Display for FileHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tree.root())
    }
}

/// Hash a file with the configured pacing
pub fn hash_path(path: &Path, config: &HashConfig) -> Result<FileHash> {
    hash_path_with(path, config, Arc::new(NoProgress), None)
}

/// Hash a file, reporting progress and honouring `cancel`
pub fn hash_path_with(
    path: &Path,
    config: &HashConfig,
    progress: Arc<dyn ProgressSink>,
    cancel: Option<&CancellationToken>,
) -> Result<FileHash> {
    let mut source = FileSource::open(path)?;
    let mut pacer = PacerChain::from_config(&config.pacing, cancel.cloned());
    let hasher = ChunkedHasher::new(config.clone())
        .with_progress(progress)
        .with_label(path.display().to_string());

    let tree = hasher.hash(&mut source, &mut pacer)?;
    Ok(FileHash {
        path: path.to_path_buf(),
        size: source.size(),
        tree,
    })
}

/// Hash a file, logging and discarding any failure
pub fn try_hash_path(path: &Path, config: &HashConfig) -> Option<FileHash> {
    match hash_path(path, config) {
        Ok(hash) => Some(hash),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "hashing failed");
            None
        }
    }
}

/// Hash in-memory data
pub fn hash_bytes(data: &[u8], config: &HashConfig) -> Result<HashTree> {
    ChunkedHasher::new(config.clone()).hash_default(&mut SliceSource::new(data))
}

/// Hash many files in parallel, one independent computation per file
pub fn hash_paths_parallel(
    paths: &[PathBuf],
    config: &HashConfig,
    progress: Arc<dyn ProgressSink>,
    cancel: Option<&CancellationToken>,
) -> Vec<Result<FileHash>> {
    paths
        .par_iter()
        .map(|path| hash_path_with(path, config, Arc::clone(&progress), cancel))
        .collect()
}
