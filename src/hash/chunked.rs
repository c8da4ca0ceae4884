//! Chunked hashing of a sequential byte source
//!
//! One engine digests the source in order. At every internal part boundary
//! the engine is finalized into the next part digest and starts afresh; the
//! last part is finalized at end of stream. With more than one part the
//! root is the digest of the concatenated part digests.
//!
//! Memory use is bounded by the read buffer and one digest per part,
//! whatever the file size.

use super::engine::{DigestEngine, Engine};
use super::parts::PartLayout;
use super::source::{ReaderSource, SequentialByteReader};
use super::tree::HashTree;
use crate::config::HashConfig;
use crate::error::{PartHashError, Result};
use crate::pacing::{NoPacing, Pacer};
use crate::progress::{NoProgress, ProgressSink};
use std::io::{self, Read};
use std::sync::Arc;
use tracing::{debug, info};

/// Hashes sources into two-level trees
///
/// Holds no state between calls; one hasher can serve any number of
/// sequential or concurrent computations.
#[derive(Clone)]
pub struct ChunkedHasher {
    config: HashConfig,
    progress: Arc<dyn ProgressSink>,
    label: String,
}

impl ChunkedHasher {
    /// Create a hasher that reports no progress
    pub fn new(config: HashConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoProgress),
            label: String::new(),
        }
    }

    /// Report progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Label attached to progress updates
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Active configuration
    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// Hash `source` without pacing or cancellation
    pub fn hash_default<S>(&self, source: &mut S) -> Result<HashTree>
    where
        S: SequentialByteReader + ?Sized,
    {
        self.hash(source, &mut NoPacing)
    }

    /// Hash any reader that yields exactly `size` bytes
    pub fn hash_reader<R: Read>(&self, reader: R, size: u64, pacer: &mut dyn Pacer) -> Result<HashTree> {
        self.hash(&mut ReaderSource::new(reader, size), pacer)
    }

    /// Hash `source`, consulting `pacer` around every read
    ///
    /// Fails with [`PartHashError::Io`] carrying the offset reached if the
    /// source errors or ends before its declared size, and with
    /// [`PartHashError::Cancelled`] if the pacer cancels. No partial tree is
    /// ever returned.
    pub fn hash<S>(&self, source: &mut S, pacer: &mut dyn Pacer) -> Result<HashTree>
    where
        S: SequentialByteReader + ?Sized,
    {
        self.config.validate()?;

        let size = source.size();
        let part_size = self.config.part_size;
        let layout = PartLayout::new(size, part_size)?;
        let part_count = usize::try_from(layout.count()).map_err(|_| {
            PartHashError::config(format!("{} parts exceed addressable memory", layout.count()))
        })?;

        let mut engine = Engine::new(self.config.algorithm);
        let mut parts = Vec::with_capacity(part_count);
        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut percent = PercentTracker::new(size);
        let mut consumed = 0u64;
        let mut in_part = 0u64;

        percent.report(self.progress.as_ref(), &self.label, 0);

        while consumed < size {
            pacer.before_read(consumed)?;

            // never read across a part boundary or past the declared size
            let want = (buffer.len() as u64)
                .min(size - consumed)
                .min(part_size - in_part) as usize;

            let read = match source.read_next(&mut buffer[..want]) {
                Ok(0) => {
                    return Err(PartHashError::io_at(
                        consumed,
                        io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("source ended after {} of {} bytes", consumed, size),
                        ),
                    ))
                }
                Ok(n) => n.min(want),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PartHashError::io_at(consumed, e)),
            };

            engine.update(&buffer[..read]);
            consumed += read as u64;
            in_part += read as u64;
            pacer.after_read(consumed)?;

            if layout.is_internal_boundary(consumed) {
                let digest = engine.finalize_reset();
                debug!(part = parts.len(), %digest, "part complete");
                parts.push(digest);
                in_part = 0;
            }

            percent.report(self.progress.as_ref(), &self.label, consumed);
        }

        parts.push(engine.finalize_reset());
        debug_assert_eq!(parts.len(), part_count);

        let tree = HashTree::from_part_digests(self.config.algorithm, parts)?;
        percent.finish(self.progress.as_ref(), &self.label);

        info!(
            label = %self.label,
            size,
            parts = part_count,
            algorithm = self.config.algorithm.name(),
            root = %tree.root(),
            "hash tree computed"
        );

        Ok(tree)
    }
}

/// Emits integer percentages, only when they increase
struct PercentTracker {
    total: u64,
    last: Option<u8>,
}

impl PercentTracker {
    fn new(total: u64) -> Self {
        Self { total, last: None }
    }

    fn report(&mut self, sink: &dyn ProgressSink, label: &str, consumed: u64) {
        let percent = if self.total == 0 {
            0
        } else {
            (u128::from(consumed) * 100 / u128::from(self.total)) as u8
        };
        self.emit(sink, label, percent);
    }

    fn finish(&mut self, sink: &dyn ProgressSink, label: &str) {
        self.emit(sink, label, 100);
    }

    fn emit(&mut self, sink: &dyn ProgressSink, label: &str, percent: u8) {
        if self.last.map_or(true, |last| percent > last) {
            self.last = Some(percent);
            sink.report(label, percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DigestAlgorithm;
    use crate::hash::engine::{digest_bytes, Digest};
    use crate::hash::source::SliceSource;
    use crate::hash::verify::is_self_consistent;
    use crate::pacing::CancellationToken;
    use crate::progress::RecordingProgress;
    use proptest::prelude::*;

    const SMALL_PART: u64 = 1000;

    fn config(part_size: u64, buffer_size: usize) -> HashConfig {
        HashConfig {
            part_size,
            buffer_size,
            ..Default::default()
        }
    }

    fn hash_with(part_size: u64, buffer_size: usize, data: &[u8]) -> HashTree {
        ChunkedHasher::new(config(part_size, buffer_size))
            .hash_default(&mut SliceSource::new(data))
            .unwrap()
    }

    fn md4(data: &[u8]) -> Digest {
        digest_bytes(DigestAlgorithm::Md4, data)
    }

    fn concat(digests: &[Digest]) -> Vec<u8> {
        digests.iter().flat_map(|d| d.as_bytes().to_vec()).collect()
    }

    /// Yields data, then fails with a custom error
    struct FailingSource {
        data: Vec<u8>,
        position: usize,
        declared: u64,
    }

    impl SequentialByteReader for FailingSource {
        fn size(&self) -> u64 {
            self.declared
        }

        fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.position >= self.data.len() {
                return Err(io::Error::new(io::ErrorKind::Other, "device lost"));
            }
            let n = buf.len().min(self.data.len() - self.position);
            buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
            self.position += n;
            Ok(n)
        }
    }

    /// Returns `Interrupted` before every successful read
    struct InterruptingSource<'a> {
        inner: SliceSource<'a>,
        interrupt_next: bool,
    }

    impl SequentialByteReader for InterruptingSource<'_> {
        fn size(&self) -> u64 {
            self.inner.size()
        }

        fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt_next = !self.interrupt_next;
            if self.interrupt_next {
                Err(io::Error::new(io::ErrorKind::Interrupted, "signal"))
            } else {
                self.inner.read_next(buf)
            }
        }
    }

    /// Cancels a token once a byte threshold is passed
    struct CancelAfter {
        token: CancellationToken,
        threshold: u64,
    }

    impl Pacer for CancelAfter {
        fn before_read(&mut self, consumed: u64) -> Result<()> {
            if consumed >= self.threshold {
                self.token.cancel();
            }
            self.token.before_read(consumed)
        }
    }

    #[test]
    fn test_empty_source() {
        let tree = hash_with(SMALL_PART, 64, b"");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), &md4(b""));
        assert_eq!(tree.root().to_hex(), "31d6cfe0d16ae931b73c59d7e0c089c0");
    }

    #[test]
    fn test_single_part_root_is_file_digest() {
        let data = vec![0x5a; 999];
        let tree = hash_with(SMALL_PART, 64, &data);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), &md4(&data));
    }

    #[test]
    fn test_exact_part_size_is_one_part() {
        let data = vec![0u8; SMALL_PART as usize];
        let tree = hash_with(SMALL_PART, 64, &data);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), &md4(&data));
    }

    #[test]
    fn test_one_byte_over_part_size() {
        let mut data = vec![0u8; SMALL_PART as usize + 1];
        *data.last_mut().unwrap() = 0x01;

        let tree = hash_with(SMALL_PART, 64, &data);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.digests()[1], md4(&vec![0u8; SMALL_PART as usize]));
        assert_eq!(tree.digests()[2], md4(&[0x01]));
        assert_eq!(tree.root(), &md4(&concat(&tree.digests()[1..])));
    }

    #[test]
    fn test_exact_multiple_has_full_last_part() {
        let data: Vec<u8> = (0..3 * SMALL_PART).map(|i| (i % 251) as u8).collect();
        let tree = hash_with(SMALL_PART, 333, &data);

        assert_eq!(tree.part_count(), 3);
        for (i, chunk) in data.chunks(SMALL_PART as usize).enumerate() {
            assert_eq!(tree.part_digest(i as u64), Some(&md4(chunk)));
        }
        assert!(is_self_consistent(&tree));
    }

    #[test]
    fn test_full_size_part_scenario() {
        // exactly one historical part of zeros, then one extra 0x01 byte
        let part_size = crate::config::DEFAULT_PART_SIZE;
        let zeros = vec![0u8; part_size as usize];

        let single = hash_with(part_size, 16 * 1024, &zeros);
        assert_eq!(single.len(), 1);
        assert_eq!(single.root(), &md4(&zeros));

        let mut data = zeros.clone();
        data.push(0x01);
        let tree = hash_with(part_size, 16 * 1024, &data);
        assert_eq!(tree.len(), 3);
        assert_eq!(&tree.digests()[1], single.root());
        assert_eq!(tree.digests()[2], md4(&[0x01]));
        assert_eq!(tree.root(), &md4(&concat(&tree.digests()[1..])));
    }

    #[test]
    fn test_other_algorithms() {
        let data: Vec<u8> = (0..2500u32).map(|i| (i * 7) as u8).collect();
        for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Blake3, DigestAlgorithm::XXHash3] {
            let hasher = ChunkedHasher::new(HashConfig {
                algorithm,
                ..config(SMALL_PART, 128)
            });
            let tree = hasher.hash_default(&mut SliceSource::new(&data)).unwrap();
            assert_eq!(tree.algorithm(), algorithm);
            assert_eq!(tree.len(), 4);
            assert_eq!(tree.digests()[3], digest_bytes(algorithm, &data[2000..]));
            assert!(tree.is_self_consistent());
        }
    }

    #[test]
    fn test_source_error_reports_offset() {
        let mut source = FailingSource {
            data: vec![1u8; 1500],
            position: 0,
            declared: 5000,
        };
        let err = ChunkedHasher::new(config(SMALL_PART, 500))
            .hash_default(&mut source)
            .unwrap_err();
        assert_eq!(err.offset(), Some(1500));
    }

    #[test]
    fn test_short_source_is_io_failure() {
        let data = vec![9u8; 100];
        let mut source = ReaderSource::new(&data[..], 150);
        let err = ChunkedHasher::new(config(SMALL_PART, 64))
            .hash_default(&mut source)
            .unwrap_err();
        match err {
            PartHashError::Io { offset, source } => {
                assert_eq!(offset, 100);
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reads_stop_at_declared_size() {
        let data = vec![3u8; 200];
        let tree = ChunkedHasher::new(config(SMALL_PART, 64))
            .hash_reader(&data[..], 120, &mut NoPacing)
            .unwrap();
        assert_eq!(tree.root(), &md4(&data[..120]));
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let data: Vec<u8> = (0..2100u32).map(|i| i as u8).collect();
        let mut source = InterruptingSource {
            inner: SliceSource::new(&data),
            interrupt_next: false,
        };
        let tree = ChunkedHasher::new(config(SMALL_PART, 256))
            .hash_default(&mut source)
            .unwrap();
        assert_eq!(tree, hash_with(SMALL_PART, 256, &data));
    }

    #[test]
    fn test_cancellation() {
        let data = vec![0u8; 5000];
        let mut pacer = CancelAfter {
            token: CancellationToken::new(),
            threshold: 2000,
        };
        let err = ChunkedHasher::new(config(SMALL_PART, 100))
            .hash(&mut SliceSource::new(&data), &mut pacer)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    /// Records every consumed total the hasher reports
    #[derive(Default)]
    struct RecordingPacer {
        before: Vec<u64>,
        after: Vec<u64>,
    }

    impl Pacer for RecordingPacer {
        fn before_read(&mut self, consumed: u64) -> Result<()> {
            self.before.push(consumed);
            Ok(())
        }

        fn after_read(&mut self, consumed: u64) -> Result<()> {
            self.after.push(consumed);
            Ok(())
        }
    }

    #[test]
    fn test_pacer_sees_every_read() {
        let data = vec![4u8; 2500];
        let mut pacer = RecordingPacer::default();
        ChunkedHasher::new(config(SMALL_PART, 600))
            .hash(&mut SliceSource::new(&data), &mut pacer)
            .unwrap();

        // reads stop at part boundaries: 600, 400 | 600, 400 | 500
        assert_eq!(pacer.before, vec![0, 600, 1000, 1600, 2000]);
        assert_eq!(pacer.after, vec![600, 1000, 1600, 2000, 2500]);
    }

    #[test]
    fn test_pacing_leaves_tree_unchanged() {
        use crate::config::PacingConfig;
        use crate::pacing::PacerChain;
        use std::time::Duration;

        let data: Vec<u8> = (0..3500u32).map(|i| (i % 239) as u8).collect();
        let hasher = ChunkedHasher::new(config(SMALL_PART, 256));

        let pacing = PacingConfig {
            pause_every: 700,
            pause: Duration::from_millis(1),
            bandwidth_limit: Some(10 * 1024 * 1024),
        };
        let mut paced = PacerChain::from_config(&pacing, None);
        assert_eq!(paced.len(), 2);

        let with_pacing = hasher.hash(&mut SliceSource::new(&data), &mut paced).unwrap();
        let without = hasher.hash(&mut SliceSource::new(&data), &mut NoPacing).unwrap();
        assert_eq!(with_pacing, without);
        assert!(with_pacing.is_self_consistent());
    }

    #[test]
    fn test_pre_cancelled_token_aborts_before_reading() {
        let token = CancellationToken::new();
        token.cancel();
        let err = ChunkedHasher::new(config(SMALL_PART, 100))
            .hash(&mut SliceSource::new(b"data"), &mut token.clone())
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ChunkedHasher::new(config(0, 100))
            .hash_default(&mut SliceSource::new(b"data"))
            .unwrap_err();
        assert!(matches!(err, PartHashError::InvalidConfig(_)));
    }

    #[test]
    fn test_oversized_buffer_rejected_before_allocation() {
        let buffer_size = crate::config::MAX_BUFFER_SIZE + 1;
        let err = ChunkedHasher::new(config(SMALL_PART, buffer_size))
            .hash_default(&mut SliceSource::new(b"data"))
            .unwrap_err();
        assert!(matches!(err, PartHashError::InvalidConfig(_)));
    }

    #[test]
    fn test_progress_is_monotonic_and_completes() {
        let data = vec![1u8; 4321];
        let recorder = Arc::new(RecordingProgress::new());
        let hasher = ChunkedHasher::new(config(SMALL_PART, 100))
            .with_progress(recorder.clone())
            .with_label("data.bin");

        let tree = hasher.hash_default(&mut SliceSource::new(&data)).unwrap();
        assert_eq!(tree, hash_with(SMALL_PART, 100, &data));

        let updates = recorder.updates();
        assert_eq!(updates.first().map(|u| u.1), Some(0));
        assert_eq!(updates.last().map(|u| u.1), Some(100));
        assert!(updates.windows(2).all(|w| w[0].1 < w[1].1));
        assert!(updates.iter().all(|(label, _)| label == "data.bin"));
    }

    #[test]
    fn test_empty_source_progress() {
        let recorder = Arc::new(RecordingProgress::new());
        ChunkedHasher::new(config(SMALL_PART, 100))
            .with_progress(recorder.clone())
            .hash_default(&mut SliceSource::new(b""))
            .unwrap();
        let percents: Vec<u8> = recorder.updates().iter().map(|u| u.1).collect();
        assert_eq!(percents, vec![0, 100]);
    }

    #[test]
    fn test_failed_hash_never_reports_completion() {
        let recorder = Arc::new(RecordingProgress::new());
        let mut source = FailingSource {
            data: vec![1u8; 500],
            position: 0,
            declared: 1000,
        };
        let result = ChunkedHasher::new(config(SMALL_PART, 100))
            .with_progress(recorder.clone())
            .hash_default(&mut source);
        assert!(result.is_err());
        assert_eq!(recorder.last_percent(""), Some(50));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_independent_of_buffer_size(
            data in proptest::collection::vec(any::<u8>(), 0..4000),
            buffer_a in 1usize..700,
            buffer_b in 1usize..700,
        ) {
            let a = hash_with(SMALL_PART, buffer_a, &data);
            let b = hash_with(SMALL_PART, buffer_b, &data);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_tree_shape_and_consistency(
            data in proptest::collection::vec(any::<u8>(), 0..4000),
        ) {
            let tree = hash_with(SMALL_PART, 256, &data);
            let parts = crate::hash::parts::part_count(data.len() as u64, SMALL_PART);
            let expected_len = if parts > 1 { parts as usize + 1 } else { 1 };
            prop_assert_eq!(tree.len(), expected_len);
            prop_assert!(tree.digests().iter().all(|d| d.len() == 16));
            prop_assert!(is_self_consistent(&tree));
            if parts == 1 {
                prop_assert_eq!(tree.root(), &md4(&data));
            }
        }

        #[test]
        fn prop_change_is_local_to_one_part(
            data in proptest::collection::vec(any::<u8>(), 1001..4000),
            position in any::<prop::sample::Index>(),
        ) {
            let index = position.index(data.len());
            let mut changed = data.clone();
            changed[index] ^= 0xff;

            let a = hash_with(SMALL_PART, 128, &data);
            let b = hash_with(SMALL_PART, 128, &changed);
            let part = index as u64 / SMALL_PART;

            prop_assert_ne!(a.root(), b.root());
            prop_assert_eq!(a.mismatched_parts(&b), vec![part]);
        }
    }
}
