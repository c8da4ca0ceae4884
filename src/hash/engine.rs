//! Digest engines behind a single streaming interface
//!
//! Finalizing is an explicit state transition: `finalize_reset` returns the
//! digest of everything fed since the last reset and leaves the engine ready
//! for the next independent sequence.

use crate::config::DigestAlgorithm;
use crate::error::{PartHashError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fixed-length digest bytes
///
/// The textual form is lowercase hex everywhere in parthash; that is the
/// identifier encoding other systems should compare against.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wrap raw digest bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length digest (never produced by an engine)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(self, f)
    }
}

impl fmt::LowerHex for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::UpperHex for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

impl FromStr for Digest {
    type Err = PartHashError;

    fn from_str(s: &str) -> Result<Self> {
        hex::decode(s.trim())
            .map(Self)
            .map_err(|e| PartHashError::decode(format!("invalid digest '{}': {}", s, e)))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            hex::decode(&text)
                .map(Self)
                .map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer).map(Self)
        }
    }
}

/// Streaming digest capability
pub trait DigestEngine {
    /// Feed the next bytes of the sequence
    fn update(&mut self, data: &[u8]);

    /// Finish the current sequence and start a fresh one
    fn finalize_reset(&mut self) -> Digest;

    /// Length of every digest this engine produces
    fn output_size(&self) -> usize;
}

/// Engine for every supported algorithm
pub enum Engine {
    /// MD4
    Md4(md4::Md4),
    /// SHA-256
    Sha256(sha2::Sha256),
    /// BLAKE3
    Blake3(blake3::Hasher),
    /// XXHash3 128-bit
    XXHash3(xxhash_rust::xxh3::Xxh3),
}

impl Engine {
    /// Create a fresh engine for the given algorithm
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md4 => Self::Md4(<md4::Md4 as md4::Digest>::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(<sha2::Sha256 as sha2::Digest>::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(blake3::Hasher::new()),
            DigestAlgorithm::XXHash3 => Self::XXHash3(xxhash_rust::xxh3::Xxh3::new()),
        }
    }

    /// Get the algorithm this engine uses
    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::Md4(_) => DigestAlgorithm::Md4,
            Self::Sha256(_) => DigestAlgorithm::Sha256,
            Self::Blake3(_) => DigestAlgorithm::Blake3,
            Self::XXHash3(_) => DigestAlgorithm::XXHash3,
        }
    }
}

impl DigestEngine for Engine {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md4(h) => md4::Digest::update(h, data),
            Self::Sha256(h) => sha2::Digest::update(h, data),
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::XXHash3(h) => h.update(data),
        }
    }

    fn finalize_reset(&mut self) -> Digest {
        match self {
            Self::Md4(h) => Digest(md4::Digest::finalize_reset(h).to_vec()),
            Self::Sha256(h) => Digest(sha2::Digest::finalize_reset(h).to_vec()),
            Self::Blake3(h) => {
                let digest = Digest(h.finalize().as_bytes().to_vec());
                h.reset();
                digest
            }
            Self::XXHash3(h) => {
                let digest = Digest(h.digest128().to_be_bytes().to_vec());
                h.reset();
                digest
            }
        }
    }

    fn output_size(&self) -> usize {
        self.algorithm().output_size()
    }
}

/// Digest a complete in-memory sequence in one pass
pub fn digest_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> Digest {
    let mut engine = Engine::new(algorithm);
    engine.update(data);
    engine.finalize_reset()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DigestAlgorithm; 4] = [
        DigestAlgorithm::Md4,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Blake3,
        DigestAlgorithm::XXHash3,
    ];

    #[test]
    fn test_md4_known_vectors() {
        // RFC 1320 test suite
        assert_eq!(
            digest_bytes(DigestAlgorithm::Md4, b"").to_hex(),
            "31d6cfe0d16ae931b73c59d7e0c089c0"
        );
        assert_eq!(
            digest_bytes(DigestAlgorithm::Md4, b"abc").to_hex(),
            "a448017aaf21d8525fc10ae87aa6729d"
        );
    }

    #[test]
    fn test_output_sizes() {
        for algorithm in ALL {
            let digest = digest_bytes(algorithm, b"Hello, World!");
            assert_eq!(digest.len(), algorithm.output_size());
            assert_eq!(Engine::new(algorithm).output_size(), algorithm.output_size());
        }
    }

    #[test]
    fn test_finalize_resets_engine() {
        for algorithm in ALL {
            let mut engine = Engine::new(algorithm);
            engine.update(b"first sequence");
            let first = engine.finalize_reset();

            engine.update(b"second ");
            engine.update(b"sequence");
            let second = engine.finalize_reset();

            assert_eq!(first, digest_bytes(algorithm, b"first sequence"));
            assert_eq!(second, digest_bytes(algorithm, b"second sequence"));

            let empty = engine.finalize_reset();
            assert_eq!(empty, digest_bytes(algorithm, b""));
        }
    }

    #[test]
    fn test_hex_encoding() {
        let digest = Digest::from_bytes(vec![0xab, 0x01, 0xff]);
        assert_eq!(digest.to_string(), "ab01ff");
        assert_eq!(format!("{:X}", digest), "AB01FF");
        assert_eq!("AB01FF".parse::<Digest>().unwrap(), digest);
        assert!("not hex".parse::<Digest>().is_err());
    }

    #[test]
    fn test_serde_hex_string() {
        let digest = digest_bytes(DigestAlgorithm::Md4, b"abc");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, "\"a448017aaf21d8525fc10ae87aa6729d\"");
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
