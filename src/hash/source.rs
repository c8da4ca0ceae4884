//! Sequential byte sources of known length

use crate::error::{IoResultExt, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Bytes from offset 0 onward, with the total length known up front
///
/// The hasher owns the source for the duration of one computation and reads
/// it strictly in order. `read_next` returns 0 at end of stream.
pub trait SequentialByteReader {
    /// Declared total length in bytes
    fn size(&self) -> u64;

    /// Read the next chunk into `buf`, returning the number of bytes read
    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: SequentialByteReader + ?Sized> SequentialByteReader for &mut T {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_next(buf)
    }
}

impl<T: SequentialByteReader + ?Sized> SequentialByteReader for Box<T> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_next(buf)
    }
}

/// Any reader paired with its declared length
pub struct ReaderSource<R> {
    inner: R,
    size: u64,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap a reader that yields exactly `size` bytes
    pub fn new(inner: R, size: u64) -> Self {
        Self { inner, size }
    }

    /// Recover the wrapped reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> SequentialByteReader for ReaderSource<R> {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Local file opened for hashing
pub struct FileSource {
    file: File,
    size: u64,
    path: PathBuf,
}

impl FileSource {
    /// Open a file and take its size from metadata
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_path(path)?;
        let metadata = file.metadata().with_path(path)?;
        Ok(Self {
            file,
            size: metadata.len(),
            path: path.to_path_buf(),
        })
    }

    /// Path the file was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SequentialByteReader for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// In-memory bytes
pub struct SliceSource<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceSource<'a> {
    /// Read from the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }
}

impl SequentialByteReader for SliceSource<'_> {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_next(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}
