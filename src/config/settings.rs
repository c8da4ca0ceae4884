//! Configuration settings for parthash
//!
//! Defines CLI arguments, the runtime hashing configuration and its
//! defaults. The part size and digest algorithm are configurable, but a
//! given set of trees is only comparable when both match.

use crate::error::{IoResultExt, PartHashError, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Part size of the historical network protocol (9,728,000 bytes)
pub const DEFAULT_PART_SIZE: u64 = 9_728_000;

/// Default working window for reads
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Largest accepted read window
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// parthash - content identifiers from chunked two-level hash trees
#[derive(Parser, Debug, Clone)]
#[command(name = "parthash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chunked two-level content hashing for large files")]
#[command(long_about = r#"
parthash splits a file into fixed-size parts, digests every part and
derives a root digest over the ordered part digests. The root is a stable
content identifier; the part digests allow each part to be verified alone.

Examples:
  parthash hash big.iso                        # Root digest of one file
  parthash hash -r ./dir --manifest trees.json # Hash a tree of files
  parthash hash big.iso --tree-out big.tree    # Persist the full tree
  parthash verify big.tree                     # Check a stored tree
  parthash check big.iso big.tree              # Find damaged parts
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (JSON) providing hashing defaults
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Hashing options shared by the commands that read file content
#[derive(Args, Debug, Clone, Default)]
pub struct HashOptions {
    /// Part size (e.g., 9728000, 9500K)
    #[arg(long, value_name = "SIZE")]
    pub part_size: Option<String>,

    /// Digest algorithm
    #[arg(long, value_enum, value_name = "ALGO")]
    pub algorithm: Option<DigestAlgorithm>,

    /// Read buffer size (e.g., 16K, 1M)
    #[arg(long, value_name = "SIZE")]
    pub buffer_size: Option<String>,

    /// Pause after every SIZE bytes to yield the disk (e.g., 64M)
    #[arg(long, value_name = "SIZE")]
    pub pause_every: Option<String>,

    /// Length of each pause (e.g., 5ms)
    #[arg(long, value_name = "DURATION")]
    pub pause: Option<String>,

    /// Read bandwidth limit (e.g., 100M for 100 MB/s)
    #[arg(long, value_name = "RATE")]
    pub bandwidth_limit: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compute hash trees for files
    #[command(name = "hash")]
    Hash {
        /// Files (or directories with --recursive)
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Descend into directories
        #[arg(short = 'r', long)]
        recursive: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Show a progress bar per file
        #[arg(short = 'p', long)]
        progress: bool,

        /// Write the full tree of a single file to this path
        #[arg(long, value_name = "PATH")]
        tree_out: Option<PathBuf>,

        /// Encoding used for --tree-out
        #[arg(long, value_enum, default_value = "json")]
        tree_format: TreeFormat,

        /// Write a manifest of every hashed file to this path
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,

        /// Hashing options
        #[command(flatten)]
        options: HashOptions,
    },

    /// Check that a stored tree is self-consistent
    #[command(name = "verify")]
    Verify {
        /// Stored tree
        tree: PathBuf,

        /// Encoding of the stored tree
        #[arg(long, value_enum, default_value = "json")]
        tree_format: TreeFormat,
    },

    /// Re-hash a file and report parts that differ from a stored tree
    #[command(name = "check")]
    Check {
        /// File to hash
        file: PathBuf,

        /// Stored tree
        tree: PathBuf,

        /// Encoding of the stored tree
        #[arg(long, value_enum, default_value = "json")]
        tree_format: TreeFormat,

        /// Hashing options
        #[command(flatten)]
        options: HashOptions,
    },

    /// Show how a file of SIZE bytes is split into parts
    #[command(name = "parts")]
    Parts {
        /// File size (e.g., 20000000, 4G)
        size: String,

        /// Part size
        #[arg(long, value_name = "SIZE")]
        part_size: Option<String>,
    },

    /// Check every tree stored in a manifest
    #[command(name = "manifest-verify")]
    ManifestVerify {
        /// Manifest file path
        manifest: PathBuf,
    },
}

/// Digest algorithm used for parts and root
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD4 - Historical network protocol compatibility (128-bit)
    #[default]
    #[value(name = "md4")]
    Md4,
    /// SHA-256 - Standard cryptographic hash
    #[value(name = "sha256")]
    Sha256,
    /// BLAKE3 - Fast and cryptographically secure
    #[value(name = "blake3")]
    Blake3,
    /// XXHash3 - Ultra fast, non-cryptographic (128-bit)
    #[value(name = "xxhash3")]
    XXHash3,
}

impl DigestAlgorithm {
    /// Get the output size in bytes
    pub fn output_size(&self) -> usize {
        match self {
            Self::Md4 => 16,
            Self::Sha256 => 32,
            Self::Blake3 => 32,
            Self::XXHash3 => 16,
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md4 => "MD4",
            Self::Sha256 => "SHA-256",
            Self::Blake3 => "BLAKE3",
            Self::XXHash3 => "XXHash3",
        }
    }
}

/// Encoding of a persisted tree
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeFormat {
    /// JSON document, digests as lowercase hex
    #[default]
    Json,
    /// Compact binary (bincode)
    Binary,
}

/// Cooperative pacing between buffer reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after this many bytes (0 = never)
    pub pause_every: u64,
    /// Length of each pause
    pub pause: Duration,
    /// Read bandwidth limit in bytes/sec
    pub bandwidth_limit: Option<u64>,
}

impl PacingConfig {
    /// True when no pacing is configured
    pub fn is_disabled(&self) -> bool {
        (self.pause_every == 0 || self.pause.is_zero()) && self.bandwidth_limit.is_none()
    }
}

/// Runtime hashing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Part size in bytes
    pub part_size: u64,
    /// Digest algorithm
    pub algorithm: DigestAlgorithm,
    /// Read buffer size in bytes
    pub buffer_size: usize,
    /// Pacing between reads
    pub pacing: PacingConfig,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            algorithm: DigestAlgorithm::Md4,
            buffer_size: DEFAULT_BUFFER_SIZE,
            pacing: PacingConfig::default(),
        }
    }
}

impl HashConfig {
    /// Check the values the hasher depends on
    pub fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            return Err(PartHashError::config("part size must be greater than zero"));
        }
        if self.buffer_size == 0 {
            return Err(PartHashError::config("buffer size must be greater than zero"));
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            return Err(PartHashError::config(format!(
                "buffer size {} exceeds the maximum of {}",
                self.buffer_size, MAX_BUFFER_SIZE
            )));
        }
        if self.pacing.bandwidth_limit == Some(0) {
            return Err(PartHashError::config("bandwidth limit must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).with_path(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PartHashError::Encode(e.to_string()))?;
        std::fs::write(path, json).with_path(path)?;
        Ok(())
    }

    /// Build configuration from an optional config file plus CLI overrides
    pub fn from_cli(config_file: Option<&Path>, options: &HashOptions) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(part_size) = &options.part_size {
            config.part_size = parse_size(part_size)
                .map_err(|e| PartHashError::config(format!("Invalid part size: {}", e)))?;
        }
        if let Some(algorithm) = options.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(buffer_size) = &options.buffer_size {
            let bytes = parse_size(buffer_size)
                .map_err(|e| PartHashError::config(format!("Invalid buffer size: {}", e)))?;
            config.buffer_size = usize::try_from(bytes)
                .map_err(|_| PartHashError::config(format!("Buffer size too large: {}", buffer_size)))?;
        }
        if let Some(pause_every) = &options.pause_every {
            config.pacing.pause_every = parse_size(pause_every)
                .map_err(|e| PartHashError::config(format!("Invalid pause interval: {}", e)))?;
        }
        if let Some(pause) = &options.pause {
            config.pacing.pause = humantime::parse_duration(pause)
                .map_err(|e| PartHashError::config(format!("Invalid pause: {}", e)))?;
        }
        if let Some(limit) = &options.bandwidth_limit {
            config.pacing.bandwidth_limit = Some(
                parse_size(limit)
                    .map_err(|e| PartHashError::config(format!("Invalid bandwidth limit: {}", e)))?,
            );
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("TB") || size.ends_with('T') {
        (size.trim_end_matches(|c| c == 'T' || c == 'B'), 1024u64 * 1024 * 1024 * 1024)
    } else if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(|c| c == 'G' || c == 'B'), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(|c| c == 'M' || c == 'B'), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(|c| c == 'K' || c == 'B'), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num_str = num_str.trim();
    if let Ok(whole) = num_str.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Size too large: {}", size));
    }

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;
    if num < 0.0 {
        return Err(format!("Negative size: {}", size));
    }

    Ok((num * multiplier as f64) as u64)
}
