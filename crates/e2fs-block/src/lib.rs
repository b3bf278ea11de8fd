#![forbid(unsafe_code)]
//! Byte-addressed, read-only storage for volume images.
//!
//! Every read names an absolute offset (pread semantics), so a device can be
//! shared across threads without a seek cursor.

use e2fs_error::{E2fsError, Result};
use e2fs_types::{ByteOffset, EXT2_SUPERBLOCK_OFFSET, EXT2_SUPERBLOCK_SIZE};
use std::fs::File;
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Byte-addressed device for fixed-offset reads.
pub trait ByteDevice: Send + Sync {
    /// Total length in bytes.
    fn len_bytes(&self) -> u64;

    /// Read up to `buf.len()` bytes at `offset`.
    ///
    /// Returns the number of bytes transferred; fewer than requested only
    /// when the device ends inside the range.
    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize>;

    /// Read exactly `buf.len()` bytes at `offset`.
    ///
    /// A short transfer is `Io(UnexpectedEof)`.
    fn read_exact_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<()> {
        let n = self.read_at(offset, buf)?;
        if n != buf.len() {
            return Err(E2fsError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "short read at offset {offset}: wanted {} bytes, got {n}",
                    buf.len()
                ),
            )));
        }
        Ok(())
    }
}

impl<D: ByteDevice + ?Sized> ByteDevice for Box<D> {
    fn len_bytes(&self) -> u64 {
        (**self).len_bytes()
    }

    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }
}

impl<D: ByteDevice + ?Sized> ByteDevice for Arc<D> {
    fn len_bytes(&self) -> u64 {
        (**self).len_bytes()
    }

    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }
}

/// Number of bytes of a `want`-byte read at `offset` that lie inside a device of `len` bytes.
fn available(len: u64, offset: ByteOffset, want: usize) -> usize {
    let remaining = len.saturating_sub(offset.0);
    usize::try_from(remaining).map_or(want, |r| r.min(want))
}

/// File-backed device opened read-only, using `pread` via `FileExt`.
#[derive(Debug, Clone)]
pub struct FileByteDevice {
    file: Arc<File>,
    len: u64,
}

impl FileByteDevice {
    /// Open `path` read-only.
    ///
    /// A missing path is `NotFound`; any other open or metadata failure is `Io`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                E2fsError::NotFound(path.display().to_string())
            } else {
                E2fsError::Io(err)
            }
        })?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Arc::new(file),
            len,
        })
    }
}

impl ByteDevice for FileByteDevice {
    fn len_bytes(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize> {
        let want = available(self.len, offset, buf.len());
        let mut done = 0_usize;
        while done < want {
            let pos = offset
                .checked_add(done as u64)
                .ok_or_else(|| E2fsError::Format("read range overflows u64".to_owned()))?;
            match self.file.read_at(&mut buf[done..want], pos.0) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(E2fsError::Io(err)),
            }
        }
        trace!(target: "e2fs::block", offset = offset.0, len = buf.len(), read = done, "pread");
        Ok(done)
    }
}

/// In-memory image, used for crafted volumes and fixtures.
#[derive(Debug, Clone)]
pub struct MemByteDevice {
    bytes: Arc<[u8]>,
}

impl MemByteDevice {
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl ByteDevice for MemByteDevice {
    fn len_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize> {
        let n = available(self.len_bytes(), offset, buf.len());
        if n == 0 {
            return Ok(0);
        }
        let start = offset.to_usize().map_err(|e| E2fsError::Format(e.to_string()))?;
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        Ok(n)
    }
}

/// Wrapper that counts device reads.
///
/// Lets callers confirm which operations touch storage at all.
#[derive(Debug)]
pub struct CountingByteDevice<D> {
    inner: D,
    reads: AtomicU64,
    bytes: AtomicU64,
}

impl<D: ByteDevice> CountingByteDevice<D> {
    #[must_use]
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            reads: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Number of `read_at` calls so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total bytes transferred so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
    }
}

impl<D: ByteDevice> ByteDevice for CountingByteDevice<D> {
    fn len_bytes(&self) -> u64 {
        self.inner.len_bytes()
    }

    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let n = self.inner.read_at(offset, buf)?;
        self.bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Read the superblock region (1024 bytes at offset 1024).
///
/// A device too short to hold it is a `Format` error: the file is not an
/// ext2 volume.
pub fn read_superblock_region(dev: &dyn ByteDevice) -> Result<[u8; EXT2_SUPERBLOCK_SIZE]> {
    let mut buf = [0_u8; EXT2_SUPERBLOCK_SIZE];
    let offset = ByteOffset(EXT2_SUPERBLOCK_OFFSET as u64);
    let n = dev.read_at(offset, &mut buf)?;
    if n != EXT2_SUPERBLOCK_SIZE {
        return Err(E2fsError::Format(format!(
            "superblock truncated: read {n} of {EXT2_SUPERBLOCK_SIZE} bytes at offset {offset}"
        )));
    }
    Ok(buf)
}
