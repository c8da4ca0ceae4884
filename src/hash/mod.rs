//! Chunked two-level content hashing
//!
//! A file is split into fixed-size parts; each part is digested on its own
//! and, when there is more than one part, the root is the digest of the
//! concatenated part digests. The root identifies the whole file while each
//! part digest verifies that part alone.

mod chunked;
mod engine;
mod file;
mod manifest;
mod parts;
mod source;
mod tree;
mod verify;

pub use chunked::ChunkedHasher;
pub use engine::{digest_bytes, Digest, DigestEngine, Engine};
pub use file::{hash_bytes, hash_path, hash_path_with, hash_paths_parallel, try_hash_path, FileHash};
pub use manifest::{ManifestEntry, TreeManifest};
pub use parts::{part_count, Part, PartLayout};
pub use source::{FileSource, ReaderSource, SequentialByteReader, SliceSource};
pub use tree::HashTree;
pub use verify::{is_self_consistent, is_self_consistent_digests};
