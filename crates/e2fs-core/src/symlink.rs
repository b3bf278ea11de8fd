use crate::Volume;
use e2fs_error::{E2fsError, Result};
use e2fs_ondisk::Ext2Inode;
use tracing::trace;

impl Volume {
    /// Copy the target of symlink `inode` into `buf` as a NUL-terminated string.
    ///
    /// At most `buf.len() - 1` target bytes are copied, followed by a NUL.
    /// The return value is always the full target length, so a result
    /// `>= buf.len()` means the copy was truncated. An empty `buf` receives
    /// nothing.
    pub fn read_symlink_target(&self, inode: &Ext2Inode, buf: &mut [u8]) -> Result<usize> {
        let target = self.read_symlink(inode)?;
        if let Some(room) = buf.len().checked_sub(1) {
            let n = target.len().min(room);
            buf[..n].copy_from_slice(&target[..n]);
            buf[n] = 0;
        }
        Ok(target.len())
    }

    /// Target of symlink `inode`.
    ///
    /// Targets shorter than 60 bytes live inline in the block-pointer area;
    /// longer ones are ordinary file content.
    pub fn read_symlink(&self, inode: &Ext2Inode) -> Result<Vec<u8>> {
        self.ensure_open()?;
        if !inode.is_symlink() {
            return Err(E2fsError::NotSymlink);
        }
        let len = usize::try_from(self.file_size(inode))
            .map_err(|_| E2fsError::InvalidArgument("symlink target too large".to_owned()))?;

        if inode.is_fast_symlink() {
            trace!(target: "e2fs::symlink", len, "inline_target");
            return Ok(inode.block_area_bytes()[..len].to_vec());
        }

        let target = self.read_to_vec(inode, 0, len)?;
        trace!(target: "e2fs::symlink", len = target.len(), "block_target");
        Ok(target)
    }
}
