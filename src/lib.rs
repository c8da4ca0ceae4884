//! # parthash - Chunked Two-Level Content Hashing
//!
//! parthash derives a content identifier for files of any size from a
//! two-level hash tree. The file is split into fixed-size parts (9,728,000
//! bytes by default), every part is digested independently, and the root is
//! the digest of the ordered part digests. A file with a single part is
//! identified by that part's digest directly.
//!
//! ## Features
//!
//! - **Bounded Memory**: Streams the source through a small read window
//! - **Independent Parts**: Any part can be verified without the others
//! - **Tree Self-Check**: Detect corruption of a stored tree without the file
//! - **Pluggable Digests**: MD4 (historical default), SHA-256, BLAKE3, XXHash3
//! - **Pacing & Cancellation**: Injectable policy consulted between reads
//! - **Progress**: Caller-supplied sinks, indicatif bars or tracing logs
//! - **Persistence**: JSON, compact binary and raw fixed-width encodings
//!
//! ## Quick Start
//!
//! ```no_run
//! use parthash::config::HashConfig;
//! use parthash::hash::hash_path;
//! use std::path::Path;
//!
//! let hashed = hash_path(Path::new("/data/image.iso"), &HashConfig::default()).unwrap();
//! println!("{} ({} parts)", hashed.tree.root(), hashed.tree.part_count());
//! ```
//!
//! ## Streaming With Progress and Cancellation
//!
//! ```no_run
//! use parthash::config::HashConfig;
//! use parthash::hash::{ChunkedHasher, FileSource};
//! use parthash::pacing::{CancellationToken, PacerChain};
//! use parthash::progress::ProgressReporter;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let config = HashConfig::default();
//! let cancel = CancellationToken::new();
//! let mut pacer = PacerChain::from_config(&config.pacing, Some(cancel.clone()));
//!
//! let hasher = ChunkedHasher::new(config)
//!     .with_progress(Arc::new(ProgressReporter::new()))
//!     .with_label("image.iso");
//!
//! let mut source = FileSource::open(Path::new("/data/image.iso")).unwrap();
//! let tree = hasher.hash(&mut source, &mut pacer).unwrap();
//! assert!(tree.is_self_consistent());
//! ```
//!
//! ## Checking a Stored Tree
//!
//! ```
//! use parthash::config::HashConfig;
//! use parthash::hash::{hash_bytes, HashTree};
//!
//! let config = HashConfig { part_size: 4, ..Default::default() };
//! let tree = hash_bytes(b"0123456789", &config).unwrap();
//! assert_eq!(tree.part_count(), 3);
//!
//! let stored = HashTree::from_binary(&tree.to_binary().unwrap()).unwrap();
//! assert!(stored.is_self_consistent());
//! assert!(stored.verify_part(2, b"89").unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod hash;
pub mod pacing;
pub mod progress;

// Re-export commonly used types
pub use config::{DigestAlgorithm, HashConfig};
pub use error::{PartHashError, Result};
pub use hash::{ChunkedHasher, Digest, HashTree};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use parthash::prelude::*;
    //! ```

    pub use crate::config::{DigestAlgorithm, HashConfig, PacingConfig};
    pub use crate::error::{PartHashError, Result};
    pub use crate::hash::{
        hash_bytes, hash_path, is_self_consistent, ChunkedHasher, Digest, FileHash, HashTree,
        PartLayout, SequentialByteReader, TreeManifest,
    };
    pub use crate::pacing::{CancellationToken, NoPacing, Pacer, PacerChain};
    pub use crate::progress::{NoProgress, ProgressReporter, ProgressSink};
}
