//! Part arithmetic
//!
//! A file of `size` bytes is split into `ceil(size / part_size)` parts; an
//! empty file is one empty part. Every part but the last is exactly
//! `part_size` bytes, and the last one is never empty unless the file is.

use crate::error::{PartHashError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of parts a file of `size` bytes is split into
///
/// `part_size` must be non-zero; [`PartLayout::new`] checks this.
pub fn part_count(size: u64, part_size: u64) -> u64 {
    if size == 0 {
        1
    } else {
        size.div_ceil(part_size)
    }
}

/// One contiguous part of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    /// Zero-based part index
    pub index: u64,
    /// Offset of the first byte
    pub offset: u64,
    /// Length in bytes
    pub len: u64,
}

impl Part {
    /// Byte range covered by this part
    pub fn range(&self) -> Range<u64> {
        self.offset..self.offset + self.len
    }
}

/// Split of a file of known size into parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartLayout {
    size: u64,
    part_size: u64,
}

impl PartLayout {
    /// Create a layout; `part_size` must be non-zero
    pub fn new(size: u64, part_size: u64) -> Result<Self> {
        if part_size == 0 {
            return Err(PartHashError::config("part size must be greater than zero"));
        }
        Ok(Self { size, part_size })
    }

    /// Total file size
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Configured part size
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Number of parts
    pub fn count(&self) -> u64 {
        part_count(self.size, self.part_size)
    }

    /// Byte range of part `index`
    pub fn range(&self, index: u64) -> Result<Range<u64>> {
        let parts = self.count();
        if index >= parts {
            return Err(PartHashError::PartOutOfRange { index, parts });
        }
        let start = index * self.part_size;
        let end = (start + self.part_size).min(self.size);
        Ok(start..end)
    }

    /// Length of part `index`
    pub fn len_of(&self, index: u64) -> Result<u64> {
        self.range(index).map(|r| r.end - r.start)
    }

    /// Part containing byte `offset`
    pub fn part_of(&self, offset: u64) -> Option<u64> {
        (offset < self.size).then(|| offset / self.part_size)
    }

    /// True when `consumed` bytes end a part and more bytes follow
    pub fn is_internal_boundary(&self, consumed: u64) -> bool {
        consumed > 0 && consumed < self.size && consumed % self.part_size == 0
    }

    /// Iterate over all parts in file order
    pub fn iter(&self) -> impl Iterator<Item = Part> + '_ {
        (0..self.count()).map(move |index| {
            let offset = index * self.part_size;
            let len = self.part_size.min(self.size - offset);
            Part { index, offset, len }
        })
    }
}
