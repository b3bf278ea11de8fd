use crate::{Volume, live_parse_error};
use e2fs_error::{E2fsError, Result};
use e2fs_ondisk::Ext2Inode;
use e2fs_types::{ByteOffset, EXT2_GOOD_OLD_INODE_SIZE, InodeNumber};
use tracing::debug;

impl Volume {
    /// Load inode `ino` from its group's inode table.
    ///
    /// Inode numbers are 1-based; 0 and anything above `s_inodes_count` are
    /// rejected with `InvalidArgument`. The result is an owned snapshot.
    pub fn read_inode(&self, ino: InodeNumber) -> Result<Ext2Inode> {
        self.ensure_open()?;
        let sb = self.superblock();
        if ino.0 == 0 || ino.0 > sb.inodes_count {
            return Err(E2fsError::InvalidArgument(format!(
                "inode {ino} out of range 1..={}",
                sb.inodes_count
            )));
        }
        if sb.inodes_per_group == 0 {
            return Err(E2fsError::Format("s_inodes_per_group is zero".to_owned()));
        }

        let (group, index, table_offset) = sb.inode_table_offset(ino);
        let Some(gd) = self.group_descriptors().get(group.0 as usize) else {
            return Err(E2fsError::Corruption {
                block: 0,
                detail: format!(
                    "inode {ino} maps to group {group} but only {} descriptors exist",
                    self.groups_count()
                ),
            });
        };

        let table_block = gd.inode_table_block();
        let pos = table_block
            .to_byte_offset(self.block_size())
            .checked_add(table_offset)
            .ok_or_else(|| E2fsError::Corruption {
                block: u64::from(table_block.0),
                detail: format!("inode {ino} offset overflows u64"),
            })?;

        let mut raw = [0_u8; EXT2_GOOD_OLD_INODE_SIZE as usize];
        self.with_device(|dev| dev.read_exact_at(pos, &mut raw))?;
        let inode = Ext2Inode::parse_from_bytes(&raw)
            .map_err(|e| live_parse_error(pos_block(pos, self), &e))?;

        debug!(
            target: "e2fs::inode",
            ino = ino.0,
            group = group.0,
            index,
            mode = inode.mode,
            size = inode.file_size(sb.rev_level),
            "inode_loaded"
        );
        Ok(inode)
    }

    /// Load the root directory inode.
    pub fn root_inode(&self) -> Result<Ext2Inode> {
        self.read_inode(InodeNumber::ROOT)
    }
}

fn pos_block(pos: ByteOffset, vol: &Volume) -> u64 {
    pos.0 >> vol.block_size().shift()
}
