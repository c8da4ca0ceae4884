//! Self-consistency of stored hash trees
//!
//! Recomputes the root from the stored part digests and compares it with
//! the stored root. No file is read; this only detects damage to the tree
//! itself, e.g. after transmission or deserialization.

use super::engine::Digest;
use super::tree::{compose_root, HashTree};
use crate::config::DigestAlgorithm;

/// True when the tree's root matches its own part digests
pub fn is_self_consistent(tree: &HashTree) -> bool {
    is_self_consistent_digests(tree.algorithm(), tree.digests())
}

/// Same check over raw entries, root first
///
/// A single entry has nothing to cross-check and is accepted as given.
/// Structurally impossible trees are rejected: no entries, an entry of the
/// wrong width, or a root with exactly one part (a one-part file always
/// collapses to its root).
///
/// The width check comes first, so a lone entry of the wrong width is
/// `false` even though a well-formed single entry is always `true`.
pub fn is_self_consistent_digests(algorithm: DigestAlgorithm, digests: &[Digest]) -> bool {
    let width = algorithm.output_size();
    if digests.iter().any(|d| d.len() != width) {
        return false;
    }

    match digests {
        [] => false,
        [_root] => true,
        [_root, _single_part] => false,
        [root, parts @ ..] => compose_root(algorithm, parts) == *root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::engine::digest_bytes;

    fn tree_of(algorithm: DigestAlgorithm, chunks: &[&[u8]]) -> HashTree {
        let parts = chunks.iter().map(|c| digest_bytes(algorithm, c)).collect();
        HashTree::from_part_digests(algorithm, parts).unwrap()
    }

    #[test]
    fn test_fresh_trees_are_consistent() {
        for algorithm in [DigestAlgorithm::Md4, DigestAlgorithm::Blake3] {
            assert!(is_self_consistent(&tree_of(algorithm, &[b"one"])));
            assert!(is_self_consistent(&tree_of(algorithm, &[b"one", b"two"])));
            assert!(is_self_consistent(&tree_of(algorithm, &[b"a", b"b", b"c", b"d"])));
        }
    }

    #[test]
    fn test_every_single_byte_flip_is_detected() {
        let algorithm = DigestAlgorithm::Md4;
        let tree = tree_of(algorithm, &[b"one", b"two", b"three"]);

        for entry in 1..tree.len() {
            for byte in 0..algorithm.output_size() {
                let mut digests = tree.digests().to_vec();
                let mut bytes = digests[entry].as_bytes().to_vec();
                bytes[byte] ^= 0x01;
                digests[entry] = Digest::from_bytes(bytes);
                assert!(!is_self_consistent_digests(algorithm, &digests));
            }
        }
    }

    #[test]
    fn test_corrupted_root_is_detected() {
        let algorithm = DigestAlgorithm::Md4;
        let tree = tree_of(algorithm, &[b"one", b"two"]);
        let mut digests = tree.digests().to_vec();
        digests[0] = digest_bytes(algorithm, b"something else");
        assert!(!is_self_consistent_digests(algorithm, &digests));
    }

    #[test]
    fn test_root_only_tree_is_trusted() {
        let algorithm = DigestAlgorithm::Md4;
        let lone = vec![digest_bytes(algorithm, b"anything")];
        assert!(is_self_consistent_digests(algorithm, &lone));
    }

    #[test]
    fn test_structural_anomalies_are_rejected() {
        let algorithm = DigestAlgorithm::Md4;
        assert!(!is_self_consistent_digests(algorithm, &[]));

        let short = vec![Digest::from_bytes(vec![0u8; 4])];
        assert!(!is_self_consistent_digests(algorithm, &short));

        let part = digest_bytes(algorithm, b"p");
        let root = digest_bytes(algorithm, part.as_bytes());
        assert!(!is_self_consistent_digests(algorithm, &[root, part]));

        // entries valid for another algorithm
        let tree = tree_of(DigestAlgorithm::Sha256, &[b"a", b"b"]);
        assert!(!is_self_consistent_digests(algorithm, tree.digests()));
    }

    #[test]
    fn test_reordered_parts_are_detected() {
        let algorithm = DigestAlgorithm::Md4;
        let tree = tree_of(algorithm, &[b"first", b"second"]);
        let mut digests = tree.digests().to_vec();
        digests.swap(1, 2);
        assert!(!is_self_consistent_digests(algorithm, &digests));
    }
}
