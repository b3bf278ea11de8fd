use crate::open_parse_error;
use e2fs_block::{ByteDevice, FileByteDevice, read_superblock_region};
use e2fs_error::{E2fsError, Result};
use e2fs_ondisk::{Ext2GroupDesc, Ext2Superblock};
use e2fs_types::{BlockSize, ByteOffset, EXT2_GROUP_DESC_SIZE};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Options for opening a volume.
///
/// Validation is on by default. Turn it off only to inspect an image whose
/// geometry fields are known to be off.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Skip geometry validation beyond the magic check.
    pub skip_validation: bool,
    /// Upper bound on the computed block-group count.
    pub max_groups: u32,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            skip_validation: false,
            max_groups: 1 << 20,
        }
    }
}

/// Lifecycle of a [`Volume`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeState {
    Open,
    Closed,
}

/// Per-group counters from the descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group: u32,
    pub inode_table: u32,
    pub free_blocks: u16,
    pub free_inodes: u16,
    pub used_dirs: u16,
}

/// Snapshot of volume metadata for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub volume_name: String,
    pub last_mounted: String,
    pub uuid: [u8; 16],
    pub rev_level: u32,
    pub minor_rev_level: u16,
    pub state: u16,
    pub clean: bool,
    pub total_bytes: u64,
    pub block_size: u32,
    pub blocks_count: u32,
    pub reserved_blocks_count: u32,
    pub free_blocks_count: u32,
    pub inodes_count: u32,
    pub free_inodes_count: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub inode_size: u16,
    pub groups_count: u32,
    pub groups: Vec<GroupInfo>,
}

/// An open ext2 volume.
///
/// Superblock and descriptors are immutable after open. The device sits
/// behind a lock only so that [`Volume::close`] can release it while other
/// threads hold `&Volume`; reads take the shared side.
pub struct Volume {
    sb: Ext2Superblock,
    groups: Vec<Ext2GroupDesc>,
    block_size: BlockSize,
    groups_count: u32,
    total_bytes: u64,
    dev: RwLock<Option<Box<dyn ByteDevice>>>,
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("block_size", &self.block_size)
            .field("groups_count", &self.groups_count)
            .field("total_bytes", &self.total_bytes)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Volume {
    /// Open the image at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, &OpenOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        let dev = FileByteDevice::open(path.as_ref())?;
        Self::from_device(Box::new(dev), options)
    }

    /// Open a volume on an already-opened device.
    pub fn from_device(dev: Box<dyn ByteDevice>, options: &OpenOptions) -> Result<Self> {
        let region = read_superblock_region(&*dev)?;
        let sb = Ext2Superblock::parse_superblock_region(&region)
            .map_err(|e| open_parse_error(&e))?;
        if !options.skip_validation {
            sb.validate_geometry().map_err(|e| open_parse_error(&e))?;
        }

        let groups_count = sb
            .groups_count()
            .ok_or_else(|| E2fsError::Format("s_blocks_per_group is zero".to_owned()))?;
        if groups_count == 0 || groups_count > options.max_groups {
            return Err(E2fsError::Format(format!(
                "implausible group count {groups_count} (limit {})",
                options.max_groups
            )));
        }

        if !sb.is_clean() {
            warn!(
                target: "e2fs::volume",
                state = sb.state,
                "volume_not_cleanly_unmounted"
            );
        }
        if !sb.is_known_revision() {
            warn!(
                target: "e2fs::volume",
                rev_level = sb.rev_level,
                "unknown_revision"
            );
        }

        let total_bytes = dev.len_bytes();
        let groups = read_group_descriptors(&*dev, &sb, groups_count, total_bytes)?;
        let block_size = sb.block_size;

        info!(
            target: "e2fs::volume",
            block_size = block_size.get(),
            groups = groups_count,
            inodes = sb.inodes_count,
            blocks = sb.blocks_count,
            volume_name = %sb.volume_name,
            "volume_opened"
        );

        Ok(Self {
            sb,
            groups,
            block_size,
            groups_count,
            total_bytes,
            dev: RwLock::new(Some(dev)),
        })
    }

    /// Release the backing device. Later operations fail with `InvalidState`.
    pub fn close(&self) {
        if self.dev.write().take().is_some() {
            info!(target: "e2fs::volume", volume_name = %self.sb.volume_name, "volume_closed");
        }
    }

    #[must_use]
    pub fn state(&self) -> VolumeState {
        if self.dev.read().is_some() {
            VolumeState::Open
        } else {
            VolumeState::Closed
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == VolumeState::Open
    }

    /// Run `f` against the device, or fail if the volume is closed.
    pub(crate) fn with_device<R>(&self, f: impl FnOnce(&dyn ByteDevice) -> Result<R>) -> Result<R> {
        let guard = self.dev.read();
        let Some(dev) = guard.as_deref() else {
            return Err(closed_error());
        };
        f(dev)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(closed_error())
        }
    }

    #[must_use]
    pub fn superblock(&self) -> &Ext2Superblock {
        &self.sb
    }

    #[must_use]
    pub fn group_descriptors(&self) -> &[Ext2GroupDesc] {
        &self.groups
    }

    #[must_use]
    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    #[must_use]
    pub fn groups_count(&self) -> u32 {
        self.groups_count
    }

    /// Size of the backing device in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    #[must_use]
    pub fn volume_name(&self) -> &str {
        &self.sb.volume_name
    }

    #[must_use]
    pub fn last_mounted(&self) -> &str {
        &self.sb.last_mounted
    }

    /// Cleanly unmounted according to `s_state`.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.sb.is_clean()
    }

    #[must_use]
    pub fn info(&self) -> VolumeInfo {
        let sb = &self.sb;
        VolumeInfo {
            volume_name: sb.volume_name.clone(),
            last_mounted: sb.last_mounted.clone(),
            uuid: sb.uuid,
            rev_level: sb.rev_level,
            minor_rev_level: sb.minor_rev_level,
            state: sb.state,
            clean: sb.is_clean(),
            total_bytes: self.total_bytes,
            block_size: self.block_size.get(),
            blocks_count: sb.blocks_count,
            reserved_blocks_count: sb.reserved_blocks_count,
            free_blocks_count: sb.free_blocks_count,
            inodes_count: sb.inodes_count,
            free_inodes_count: sb.free_inodes_count,
            blocks_per_group: sb.blocks_per_group,
            inodes_per_group: sb.inodes_per_group,
            inode_size: sb.inode_size,
            groups_count: self.groups_count,
            groups: self
                .groups
                .iter()
                .zip(0_u32..)
                .map(|(gd, group)| GroupInfo {
                    group,
                    inode_table: gd.inode_table,
                    free_blocks: gd.free_blocks_count,
                    free_inodes: gd.free_inodes_count,
                    used_dirs: gd.used_dirs_count,
                })
                .collect(),
        }
    }
}

fn closed_error() -> E2fsError {
    E2fsError::InvalidState("volume is closed".to_owned())
}

/// Read and parse `groups_count` descriptors; the table must lie inside the device.
fn read_group_descriptors(
    dev: &dyn ByteDevice,
    sb: &Ext2Superblock,
    groups_count: u32,
    total_bytes: u64,
) -> Result<Vec<Ext2GroupDesc>> {
    let offset = sb.group_desc_table_offset();
    let table_len = u64::from(groups_count) * EXT2_GROUP_DESC_SIZE as u64;
    let end = offset
        .checked_add(table_len)
        .ok_or_else(|| E2fsError::Format("descriptor table range overflows u64".to_owned()))?;
    if end > total_bytes {
        return Err(E2fsError::Format(format!(
            "descriptor table [{offset}, {end}) extends past device end {total_bytes}"
        )));
    }

    let len = usize::try_from(table_len)
        .map_err(|_| E2fsError::Format("descriptor table too large".to_owned()))?;
    let mut table = vec![0_u8; len];
    let n = dev.read_at(ByteOffset(offset), &mut table)?;
    if n != len {
        return Err(E2fsError::Format(format!(
            "descriptor table truncated: read {n} of {len} bytes"
        )));
    }

    table
        .chunks_exact(EXT2_GROUP_DESC_SIZE)
        .map(|raw| Ext2GroupDesc::parse_from_bytes(raw).map_err(|e| open_parse_error(&e)))
        .collect()
}
