//! Byte-range reads over a file's logical content.
//!
//! Every read is clamped to the inode's effective size first. Holes come
//! back as zeros because the block reader fills block 0 without I/O.

use crate::Volume;
use e2fs_error::{E2fsError, Result};
use e2fs_ondisk::Ext2Inode;
use e2fs_types::BlockNumber;
use tracing::trace;

impl Volume {
    /// Effective byte size of `inode` on this volume's revision.
    #[must_use]
    pub fn file_size(&self, inode: &Ext2Inode) -> u64 {
        inode.file_size(self.superblock().rev_level)
    }

    /// Read at most one block's worth of `inode` starting at byte `offset`.
    ///
    /// The request is clamped to the bytes left in the file and then to the
    /// end of the containing block. Returns `Ok(0)` at or past end of file.
    pub fn read_file_block(&self, inode: &Ext2Inode, offset: u64, dest: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let size = self.file_size(inode);
        if offset >= size || dest.is_empty() {
            return Ok(0);
        }

        let bs = self.block_size();
        let left_in_file = size - offset;
        let want = (dest.len() as u64)
            .min(left_in_file)
            .min(u64::from(bs.remaining_in_block(offset)));
        // `want` is bounded by dest.len()
        let want = usize::try_from(want).unwrap_or(dest.len());

        let index = bs.block_index(offset);
        let block = self.block_number_for_index(inode, index)?;
        let n = self.read_block(block, bs.offset_in_block(offset), &mut dest[..want])?;
        trace!(
            target: "e2fs::content",
            offset,
            index,
            block = block.0,
            len = n,
            "read_file_block"
        );
        Ok(n)
    }

    /// Read up to `dest.len()` bytes of `inode` starting at byte `offset`.
    ///
    /// Returns exactly `min(dest.len(), size - offset)` bytes unless a block
    /// read reports zero, in which case the bytes gathered so far are returned.
    pub fn read_file_content(&self, inode: &Ext2Inode, offset: u64, dest: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let size = self.file_size(inode);
        if offset >= size {
            return Ok(0);
        }
        let total = usize::try_from((dest.len() as u64).min(size - offset)).unwrap_or(dest.len());

        let mut done = 0_usize;
        while done < total {
            let pos = offset + done as u64;
            let n = self.read_file_block(inode, pos, &mut dest[done..total])?;
            if n == 0 {
                break;
            }
            done += n;
        }
        Ok(done)
    }

    /// Read `len` bytes (clamped to end of file) into a new buffer.
    pub fn read_to_vec(&self, inode: &Ext2Inode, offset: u64, len: usize) -> Result<Vec<u8>> {
        let avail = self.file_size(inode).saturating_sub(offset);
        let len = usize::try_from(avail).map_or(len, |avail| avail.min(len));
        let mut buf = vec![0_u8; len];
        let n = self.read_file_content(inode, offset, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Whole content of `inode`.
    pub fn read_file(&self, inode: &Ext2Inode) -> Result<Vec<u8>> {
        let size = usize::try_from(self.file_size(inode)).map_err(|_| {
            E2fsError::InvalidArgument("file too large to buffer in memory".to_owned())
        })?;
        self.read_to_vec(inode, 0, size)
    }

    /// Allocated `(logical index, physical block)` pairs among the first
    /// `limit` logical blocks of `inode`, holes omitted.
    ///
    /// The scan stops at the last block covered by the file size.
    pub fn mapped_blocks(&self, inode: &Ext2Inode, limit: u64) -> Result<Vec<(u64, BlockNumber)>> {
        self.ensure_open()?;
        let bs = u64::from(self.block_size().get());
        let logical = self.file_size(inode).div_ceil(bs).min(limit);
        let mut out = Vec::new();
        for index in 0..logical {
            let block = self.block_number_for_index(inode, index)?;
            if !block.is_sparse() {
                out.push((index, block));
            }
        }
        Ok(out)
    }
}
