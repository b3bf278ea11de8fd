use crate::Volume;
use e2fs_error::{E2fsError, Result};
use e2fs_types::BlockNumber;
use std::io::ErrorKind;
use tracing::trace;

impl Volume {
    /// Read `dest.len()` bytes starting `offset` bytes into physical block `block`.
    ///
    /// Block 0 is a sparse hole: `dest` is zero-filled and no I/O happens.
    /// The invalid-block sentinel is rejected. `offset + dest.len()` may cross
    /// the block end; callers wanting single-block semantics clamp first.
    pub fn read_block(&self, block: BlockNumber, offset: u32, dest: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if block.is_invalid() {
            return Err(E2fsError::InvalidBlock {
                block: block.0,
                detail: "invalid block sentinel".to_owned(),
            });
        }
        if block.is_sparse() {
            dest.fill(0);
            trace!(target: "e2fs::block", len = dest.len(), "sparse_zero_fill");
            return Ok(dest.len());
        }

        let pos = block
            .to_byte_offset(self.block_size())
            .checked_add(u64::from(offset))
            .ok_or_else(|| E2fsError::InvalidBlock {
                block: block.0,
                detail: "byte offset overflows u64".to_owned(),
            })?;
        let n = self.with_device(|dev| dev.read_at(pos, dest))?;
        trace!(
            target: "e2fs::block",
            block = block.0,
            offset,
            len = dest.len(),
            read = n,
            "read_block"
        );
        if n != dest.len() {
            return Err(E2fsError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "short read in block {block}: wanted {} bytes at offset {offset}, got {n}",
                    dest.len()
                ),
            )));
        }
        Ok(n)
    }

    /// Read one whole physical block.
    pub fn read_block_vec(&self, block: BlockNumber) -> Result<Vec<u8>> {
        let mut buf = vec![0_u8; self.block_size().get() as usize];
        self.read_block(block, 0, &mut buf)?;
        Ok(buf)
    }
}
