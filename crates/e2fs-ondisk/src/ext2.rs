use e2fs_types::{
    BlockNumber, BlockSize, EXT2_DIND_BLOCK, EXT2_DIR_ENTRY_HEADER_LEN, EXT2_DYNAMIC_REV,
    EXT2_FAST_SYMLINK_MAX, EXT2_GOOD_OLD_FIRST_INO, EXT2_GOOD_OLD_INODE_SIZE, EXT2_GOOD_OLD_REV,
    EXT2_GROUP_DESC_SIZE, EXT2_IND_BLOCK, EXT2_MAX_REC_LEN, EXT2_N_BLOCKS, EXT2_NDIR_BLOCKS, EXT2_SUPER_MAGIC,
    EXT2_SUPERBLOCK_SIZE, EXT2_TIND_BLOCK, EXT2_VALID_FS, GroupNumber, InodeNumber, ParseError,
    S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK, ensure_slice,
    groups_for_blocks, inode_index_in_group, inode_to_group, read_fixed, read_le_u16,
    read_le_u32, read_u8, trim_nul_padded,
};
use serde::{Deserialize, Serialize};

// ── Superblock ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ext2Superblock {
    // Core geometry
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub reserved_blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub first_data_block: u32,
    pub log_block_size: u32,
    pub block_size: BlockSize,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    /// Inode record stride; 128 on revision 0 regardless of the raw field.
    pub inode_size: u16,
    pub first_ino: u32,

    // Identity
    pub magic: u16,
    pub uuid: [u8; 16],
    pub volume_name: String,
    pub last_mounted: String,

    // Revision & OS
    pub rev_level: u32,
    pub minor_rev_level: u16,
    pub creator_os: u32,

    // Features
    pub feature_compat: u32,
    pub feature_incompat: u32,
    pub feature_ro_compat: u32,

    // State
    pub state: u16,
    pub errors: u16,
    pub mnt_count: u16,
    pub max_mnt_count: u16,

    // Timestamps
    pub mtime: u32,
    pub wtime: u32,
    pub lastcheck: u32,
}

impl Ext2Superblock {
    /// Parse an ext2 superblock from a 1024-byte superblock region.
    pub fn parse_superblock_region(region: &[u8]) -> Result<Self, ParseError> {
        if region.len() < EXT2_SUPERBLOCK_SIZE {
            return Err(ParseError::InsufficientData {
                needed: EXT2_SUPERBLOCK_SIZE,
                offset: 0,
                actual: region.len(),
            });
        }

        let magic = read_le_u16(region, 0x38)?;
        if magic != EXT2_SUPER_MAGIC {
            return Err(ParseError::InvalidMagic {
                expected: u64::from(EXT2_SUPER_MAGIC),
                actual: u64::from(magic),
            });
        }

        let log_block_size = read_le_u32(region, 0x18)?;
        let block_size = BlockSize::from_log(log_block_size)?;

        let rev_level = read_le_u32(region, 0x4C)?;
        let (inode_size, first_ino) = if rev_level == EXT2_GOOD_OLD_REV {
            (EXT2_GOOD_OLD_INODE_SIZE, EXT2_GOOD_OLD_FIRST_INO)
        } else {
            (read_le_u16(region, 0x58)?, read_le_u32(region, 0x54)?)
        };

        Ok(Self {
            inodes_count: read_le_u32(region, 0x00)?,
            blocks_count: read_le_u32(region, 0x04)?,
            reserved_blocks_count: read_le_u32(region, 0x08)?,
            free_blocks_count: read_le_u32(region, 0x0C)?,
            free_inodes_count: read_le_u32(region, 0x10)?,
            first_data_block: read_le_u32(region, 0x14)?,
            log_block_size,
            block_size,
            blocks_per_group: read_le_u32(region, 0x20)?,
            inodes_per_group: read_le_u32(region, 0x28)?,
            inode_size,
            first_ino,

            magic,
            uuid: read_fixed::<16>(region, 0x68)?,
            volume_name: trim_nul_padded(&read_fixed::<16>(region, 0x78)?),
            last_mounted: trim_nul_padded(&read_fixed::<64>(region, 0x88)?),

            rev_level,
            minor_rev_level: read_le_u16(region, 0x3E)?,
            creator_os: read_le_u32(region, 0x48)?,

            feature_compat: read_le_u32(region, 0x5C)?,
            feature_incompat: read_le_u32(region, 0x60)?,
            feature_ro_compat: read_le_u32(region, 0x64)?,

            state: read_le_u16(region, 0x3A)?,
            errors: read_le_u16(region, 0x3C)?,
            mnt_count: read_le_u16(region, 0x34)?,
            max_mnt_count: read_le_u16(region, 0x36)?,

            mtime: read_le_u32(region, 0x2C)?,
            wtime: read_le_u32(region, 0x30)?,
            lastcheck: read_le_u32(region, 0x40)?,
        })
    }

    /// Validate the fields the reader depends on for address arithmetic.
    pub fn validate_geometry(&self) -> Result<(), ParseError> {
        let bitmap_bits = self.block_size.get().saturating_mul(8);

        if self.blocks_per_group == 0 {
            return Err(ParseError::InvalidField {
                field: "s_blocks_per_group",
                reason: "cannot be zero",
            });
        }
        if self.blocks_per_group > bitmap_bits {
            return Err(ParseError::InvalidField {
                field: "s_blocks_per_group",
                reason: "exceeds block_size * 8 (block bitmap capacity)",
            });
        }
        if self.inodes_per_group == 0 {
            return Err(ParseError::InvalidField {
                field: "s_inodes_per_group",
                reason: "cannot be zero",
            });
        }
        if self.inodes_per_group > bitmap_bits {
            return Err(ParseError::InvalidField {
                field: "s_inodes_per_group",
                reason: "exceeds block_size * 8 (inode bitmap capacity)",
            });
        }
        if self.inodes_count == 0 {
            return Err(ParseError::InvalidField {
                field: "s_inodes_count",
                reason: "cannot be zero",
            });
        }
        if self.inode_size < EXT2_GOOD_OLD_INODE_SIZE || !self.inode_size.is_power_of_two() {
            return Err(ParseError::InvalidField {
                field: "s_inode_size",
                reason: "must be a power of two >= 128",
            });
        }
        if u32::from(self.inode_size) > self.block_size.get() {
            return Err(ParseError::InvalidField {
                field: "s_inode_size",
                reason: "inode_size exceeds block_size",
            });
        }
        if self.first_data_block >= self.blocks_count {
            return Err(ParseError::InvalidField {
                field: "s_first_data_block",
                reason: "not below s_blocks_count",
            });
        }
        Ok(())
    }

    /// `ceil(blocks_count / blocks_per_group)`, or `None` when blocks_per_group is zero.
    #[must_use]
    pub fn groups_count(&self) -> Option<u32> {
        groups_for_blocks(self.blocks_count, self.blocks_per_group)
    }

    /// Byte offset of the group descriptor table: 2048 for 1K blocks, else one block.
    #[must_use]
    pub fn group_desc_table_offset(&self) -> u64 {
        let bs = u64::from(self.block_size.get());
        if bs == 1024 { 2048 } else { bs }
    }

    /// Returns `(group, index_in_group, byte_offset_in_inode_table)` for `ino`.
    #[must_use]
    pub fn inode_table_offset(&self, ino: InodeNumber) -> (GroupNumber, u32, u64) {
        let group = inode_to_group(ino, self.inodes_per_group);
        let index = inode_index_in_group(ino, self.inodes_per_group);
        let byte_offset = u64::from(index) * u64::from(self.inode_size);
        (group, index, byte_offset)
    }

    /// Cleanly unmounted (`s_state == EXT2_VALID_FS`).
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.state == EXT2_VALID_FS
    }

    /// Revision 0 or 1; anything else is a layout this reader does not know.
    #[must_use]
    pub fn is_known_revision(&self) -> bool {
        self.rev_level <= EXT2_DYNAMIC_REV
    }

    #[must_use]
    pub fn revision(&self) -> (u32, u16) {
        (self.rev_level, self.minor_rev_level)
    }
}

// ── Group descriptor ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ext2GroupDesc {
    pub block_bitmap: u32,
    pub inode_bitmap: u32,
    pub inode_table: u32,
    pub free_blocks_count: u16,
    pub free_inodes_count: u16,
    pub used_dirs_count: u16,
}

impl Ext2GroupDesc {
    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        ensure_slice(bytes, 0, EXT2_GROUP_DESC_SIZE)?;
        Ok(Self {
            block_bitmap: read_le_u32(bytes, 0x00)?,
            inode_bitmap: read_le_u32(bytes, 0x04)?,
            inode_table: read_le_u32(bytes, 0x08)?,
            free_blocks_count: read_le_u16(bytes, 0x0C)?,
            free_inodes_count: read_le_u16(bytes, 0x0E)?,
            used_dirs_count: read_le_u16(bytes, 0x10)?,
        })
    }

    #[must_use]
    pub fn inode_table_block(&self) -> BlockNumber {
        BlockNumber(self.inode_table)
    }
}

// ── Inode ───────────────────────────────────────────────────────────────────

/// Size of the fixed inode area this parser reads.
const EXT2_INODE_BASE_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ext2Inode {
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    /// Low 32 bits of the size (`i_size`).
    pub size_lo: u32,
    /// `i_size_high` (`i_dir_acl` on revision 0).
    pub size_high: u32,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub dtime: u32,
    pub links_count: u16,
    /// 512-byte sectors charged to this inode.
    pub blocks: u32,
    pub flags: u32,
    /// `i_block[15]`: 12 direct, single, double, triple indirect.
    pub block: [u32; EXT2_N_BLOCKS],
    pub generation: u32,
    pub file_acl: u32,
}

impl Ext2Inode {
    /// Parse the first 128 bytes of an inode record.
    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        ensure_slice(bytes, 0, EXT2_INODE_BASE_SIZE)?;

        let mut block = [0_u32; EXT2_N_BLOCKS];
        for (slot, ptr) in block.iter_mut().enumerate() {
            *ptr = read_le_u32(bytes, 0x28 + slot * 4)?;
        }

        let uid_lo = u32::from(read_le_u16(bytes, 0x02)?);
        let gid_lo = u32::from(read_le_u16(bytes, 0x18)?);
        let uid_hi = u32::from(read_le_u16(bytes, 0x78)?);
        let gid_hi = u32::from(read_le_u16(bytes, 0x7A)?);

        Ok(Self {
            mode: read_le_u16(bytes, 0x00)?,
            uid: uid_lo | (uid_hi << 16),
            gid: gid_lo | (gid_hi << 16),
            size_lo: read_le_u32(bytes, 0x04)?,
            size_high: read_le_u32(bytes, 0x6C)?,
            atime: read_le_u32(bytes, 0x08)?,
            ctime: read_le_u32(bytes, 0x0C)?,
            mtime: read_le_u32(bytes, 0x10)?,
            dtime: read_le_u32(bytes, 0x14)?,
            links_count: read_le_u16(bytes, 0x1A)?,
            blocks: read_le_u32(bytes, 0x1C)?,
            flags: read_le_u32(bytes, 0x20)?,
            block,
            generation: read_le_u32(bytes, 0x64)?,
            file_acl: read_le_u32(bytes, 0x68)?,
        })
    }

    /// Effective byte size.
    ///
    /// Regular files on revision 1+ volumes carry the upper 32 bits in
    /// `i_size_high`; everything else uses `i_size` alone.
    #[must_use]
    pub fn file_size(&self, rev_level: u32) -> u64 {
        if self.is_regular() && rev_level >= EXT2_DYNAMIC_REV {
            u64::from(self.size_lo) | (u64::from(self.size_high) << 32)
        } else {
            u64::from(self.size_lo)
        }
    }

    #[must_use]
    pub fn file_type_mode(&self) -> u16 {
        self.mode & S_IFMT
    }

    #[must_use]
    pub fn is_regular(&self) -> bool {
        self.file_type_mode() == S_IFREG
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type_mode() == S_IFDIR
    }

    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.file_type_mode() == S_IFLNK
    }

    #[must_use]
    pub fn permission_bits(&self) -> u16 {
        self.mode & 0o7777
    }

    #[must_use]
    pub fn file_type(&self) -> Ext2FileType {
        Ext2FileType::from_mode(self.mode)
    }

    /// Direct pointer `i` (`0..12`); `None` past the direct slots.
    #[must_use]
    pub fn direct_block(&self, i: usize) -> Option<BlockNumber> {
        (i < EXT2_NDIR_BLOCKS).then(|| BlockNumber(self.block[i]))
    }

    #[must_use]
    pub fn single_indirect(&self) -> BlockNumber {
        BlockNumber(self.block[EXT2_IND_BLOCK])
    }

    #[must_use]
    pub fn double_indirect(&self) -> BlockNumber {
        BlockNumber(self.block[EXT2_DIND_BLOCK])
    }

    #[must_use]
    pub fn triple_indirect(&self) -> BlockNumber {
        BlockNumber(self.block[EXT2_TIND_BLOCK])
    }

    /// Raw `i_block` area as 60 little-endian bytes (inline symlink storage).
    #[must_use]
    pub fn block_area_bytes(&self) -> [u8; EXT2_FAST_SYMLINK_MAX] {
        let mut out = [0_u8; EXT2_FAST_SYMLINK_MAX];
        for (chunk, ptr) in out.chunks_exact_mut(4).zip(self.block.iter()) {
            chunk.copy_from_slice(&ptr.to_le_bytes());
        }
        out
    }

    /// Symlink whose target lives inline in `i_block` (size below 60 bytes).
    #[must_use]
    pub fn is_fast_symlink(&self) -> bool {
        self.is_symlink() && (self.size_lo as usize) < EXT2_FAST_SYMLINK_MAX
    }
}

// ── Directory entries ───────────────────────────────────────────────────────

/// File type byte stored in directory entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Ext2FileType {
    Unknown = 0,
    RegFile = 1,
    Dir = 2,
    Chrdev = 3,
    Blkdev = 4,
    Fifo = 5,
    Sock = 6,
    Symlink = 7,
}

impl Ext2FileType {
    #[must_use]
    pub fn from_raw(val: u8) -> Self {
        match val {
            1 => Self::RegFile,
            2 => Self::Dir,
            3 => Self::Chrdev,
            4 => Self::Blkdev,
            5 => Self::Fifo,
            6 => Self::Sock,
            7 => Self::Symlink,
            _ => Self::Unknown,
        }
    }

    /// Derive the type from inode mode bits.
    #[must_use]
    pub fn from_mode(mode: u16) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::RegFile,
            S_IFDIR => Self::Dir,
            S_IFCHR => Self::Chrdev,
            S_IFBLK => Self::Blkdev,
            S_IFIFO => Self::Fifo,
            S_IFSOCK => Self::Sock,
            S_IFLNK => Self::Symlink,
            _ => Self::Unknown,
        }
    }
}

/// Decode an on-disk `rec_len`.
///
/// A 64 KiB record does not fit in 16 bits, so 64 KiB directory blocks store
/// it as `EXT2_MAX_REC_LEN` (or 0).
#[must_use]
pub fn rec_len_from_disk(raw: u16, block_size: u32) -> u32 {
    if block_size == BlockSize::MAX && (raw == EXT2_MAX_REC_LEN || raw == 0) {
        BlockSize::MAX
    } else {
        u32::from(raw)
    }
}

/// Fixed 8-byte head of an `ext2_dir_entry_2`, with `rec_len` decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ext2DirEntryHeader {
    pub inode: u32,
    pub rec_len: u32,
    pub name_len: u8,
    pub file_type: u8,
}

impl Ext2DirEntryHeader {
    pub fn parse_from_bytes(bytes: &[u8], block_size: u32) -> Result<Self, ParseError> {
        ensure_slice(bytes, 0, EXT2_DIR_ENTRY_HEADER_LEN)?;
        Ok(Self {
            inode: read_le_u32(bytes, 0)?,
            rec_len: rec_len_from_disk(read_le_u16(bytes, 4)?, block_size),
            name_len: read_u8(bytes, 6)?,
            file_type: read_u8(bytes, 7)?,
        })
    }

    /// `rec_len` must cover the header and the name, and keep 4-byte alignment.
    pub fn validate(&self) -> Result<(), ParseError> {
        let rec_len = self.rec_len as usize;
        if rec_len < EXT2_DIR_ENTRY_HEADER_LEN {
            return Err(ParseError::InvalidField {
                field: "rec_len",
                reason: "directory entry rec_len < 8",
            });
        }
        if rec_len % 4 != 0 {
            return Err(ParseError::InvalidField {
                field: "rec_len",
                reason: "not a multiple of 4",
            });
        }
        if self.inode != 0 && EXT2_DIR_ENTRY_HEADER_LEN + usize::from(self.name_len) > rec_len {
            return Err(ParseError::InvalidField {
                field: "name_len",
                reason: "name extends past rec_len",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.inode == 0
    }
}

/// An owned directory entry with its name cut at `name_len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ext2DirEntry {
    pub inode: InodeNumber,
    pub rec_len: u32,
    pub file_type: Ext2FileType,
    pub name: Vec<u8>,
}

impl Ext2DirEntry {
    /// Build an entry from its header and the bytes that follow it.
    pub fn from_header(header: Ext2DirEntryHeader, name: &[u8]) -> Result<Self, ParseError> {
        let name = ensure_slice(name, 0, usize::from(header.name_len))?;
        Ok(Self {
            inode: InodeNumber(header.inode),
            rec_len: header.rec_len,
            file_type: Ext2FileType::from_raw(header.file_type),
            name: name.to_vec(),
        })
    }

    /// Parse a whole entry (header plus name) from `bytes`.
    pub fn parse_from_bytes(bytes: &[u8], block_size: u32) -> Result<Self, ParseError> {
        let header = Ext2DirEntryHeader::parse_from_bytes(bytes, block_size)?;
        header.validate()?;
        let tail = bytes.get(EXT2_DIR_ENTRY_HEADER_LEN..).unwrap_or_default();
        Self::from_header(header, tail)
    }

    #[must_use]
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn put_u16(buf: &mut [u8], off: usize, v: u16) {
        buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn put_u32(buf: &mut [u8], off: usize, v: u32) {
        buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Minimal revision-1 superblock: 1K blocks, one group.
    fn make_valid_sb() -> [u8; EXT2_SUPERBLOCK_SIZE] {
        let mut sb = [0_u8; EXT2_SUPERBLOCK_SIZE];
        put_u32(&mut sb, 0x00, 64); // inodes_count
        put_u32(&mut sb, 0x04, 512); // blocks_count
        put_u32(&mut sb, 0x08, 25); // r_blocks_count
        put_u32(&mut sb, 0x0C, 400); // free_blocks
        put_u32(&mut sb, 0x10, 50); // free_inodes
        put_u32(&mut sb, 0x14, 1); // first_data_block
        put_u32(&mut sb, 0x18, 0); // log_block_size -> 1K
        put_u32(&mut sb, 0x20, 8192); // blocks_per_group
        put_u32(&mut sb, 0x28, 64); // inodes_per_group
        put_u16(&mut sb, 0x38, EXT2_SUPER_MAGIC);
        put_u16(&mut sb, 0x3A, EXT2_VALID_FS);
        put_u16(&mut sb, 0x3E, 3);
        put_u32(&mut sb, 0x4C, 1); // rev_level
        put_u32(&mut sb, 0x54, 11);
        put_u16(&mut sb, 0x58, 256);
        sb[0x78..0x7E].copy_from_slice(b"disk-a");
        sb[0x88..0x8D].copy_from_slice(b"/mnt/");
        sb
    }

    #[test]
    fn parse_superblock_smoke() {
        let sb = Ext2Superblock::parse_superblock_region(&make_valid_sb()).expect("parse");
        assert_eq!(sb.inodes_count, 64);
        assert_eq!(sb.blocks_count, 512);
        assert_eq!(sb.block_size.get(), 1024);
        assert_eq!(sb.inode_size, 256);
        assert_eq!(sb.volume_name, "disk-a");
        assert_eq!(sb.last_mounted, "/mnt/");
        assert_eq!(sb.revision(), (1, 3));
        assert!(sb.is_clean());
        assert!(sb.is_known_revision());
        sb.validate_geometry().expect("valid");
    }

    #[test]
    fn parse_superblock_rejects_bad_magic() {
        let mut raw = make_valid_sb();
        put_u16(&mut raw, 0x38, 0x1234);
        let err = Ext2Superblock::parse_superblock_region(&raw).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidMagic {
                expected: 0xEF53,
                actual: 0x1234
            }
        );
    }

    #[test]
    fn parse_superblock_rejects_short_region() {
        let raw = make_valid_sb();
        assert!(matches!(
            Ext2Superblock::parse_superblock_region(&raw[..512]),
            Err(ParseError::InsufficientData { needed: 1024, .. })
        ));
    }

    #[test]
    fn revision_zero_uses_fixed_inode_size() {
        let mut raw = make_valid_sb();
        put_u32(&mut raw, 0x4C, 0);
        put_u16(&mut raw, 0x58, 0);
        let sb = Ext2Superblock::parse_superblock_region(&raw).unwrap();
        assert_eq!(sb.inode_size, 128);
        assert_eq!(sb.first_ino, 11);
    }

    #[test]
    fn validate_geometry_catches_bad_values() {
        let base = make_valid_sb();

        let mut bad = base;
        put_u32(&mut bad, 0x20, 0);
        let p = Ext2Superblock::parse_superblock_region(&bad).unwrap();
        assert!(matches!(
            p.validate_geometry(),
            Err(ParseError::InvalidField {
                field: "s_blocks_per_group",
                ..
            })
        ));
        assert_eq!(p.groups_count(), None);

        let mut bad = base;
        put_u16(&mut bad, 0x58, 200);
        let p = Ext2Superblock::parse_superblock_region(&bad).unwrap();
        assert!(p.validate_geometry().is_err());

        let mut bad = base;
        put_u32(&mut bad, 0x14, 9999);
        let p = Ext2Superblock::parse_superblock_region(&bad).unwrap();
        assert!(p.validate_geometry().is_err());

        let mut bad = base;
        put_u32(&mut bad, 0x28, 0);
        let p = Ext2Superblock::parse_superblock_region(&bad).unwrap();
        assert!(p.validate_geometry().is_err());
    }

    #[test]
    fn group_desc_table_location() {
        let mut raw = make_valid_sb();
        let sb = Ext2Superblock::parse_superblock_region(&raw).unwrap();
        assert_eq!(sb.group_desc_table_offset(), 2048);

        put_u32(&mut raw, 0x18, 2);
        let sb = Ext2Superblock::parse_superblock_region(&raw).unwrap();
        assert_eq!(sb.group_desc_table_offset(), 4096);
    }

    #[test]
    fn groups_count_rounds_up() {
        let mut raw = make_valid_sb();
        put_u32(&mut raw, 0x04, 20_000);
        let sb = Ext2Superblock::parse_superblock_region(&raw).unwrap();
        assert_eq!(sb.groups_count(), Some(3));
    }

    #[test]
    fn inode_table_offset_uses_stride() {
        let sb = Ext2Superblock::parse_superblock_region(&make_valid_sb()).unwrap();
        assert_eq!(sb.inode_table_offset(InodeNumber(2)), (GroupNumber(0), 1, 256));
        assert_eq!(sb.inode_table_offset(InodeNumber(65)), (GroupNumber(1), 0, 0));
    }

    #[test]
    fn parse_group_desc() {
        let mut raw = [0_u8; 32];
        put_u32(&mut raw, 0x00, 3);
        put_u32(&mut raw, 0x04, 4);
        put_u32(&mut raw, 0x08, 5);
        put_u16(&mut raw, 0x0C, 100);
        put_u16(&mut raw, 0x0E, 20);
        put_u16(&mut raw, 0x10, 2);
        let gd = Ext2GroupDesc::parse_from_bytes(&raw).unwrap();
        assert_eq!(gd.inode_table_block(), BlockNumber(5));
        assert_eq!(gd.free_blocks_count, 100);
        assert_eq!(gd.free_inodes_count, 20);
        assert_eq!(gd.used_dirs_count, 2);
        assert!(Ext2GroupDesc::parse_from_bytes(&raw[..16]).is_err());
    }

    fn make_inode(mode: u16, size: u32) -> [u8; 128] {
        let mut raw = [0_u8; 128];
        put_u16(&mut raw, 0x00, mode);
        put_u32(&mut raw, 0x04, size);
        put_u16(&mut raw, 0x1A, 1);
        raw
    }

    #[test]
    fn parse_inode_block_pointers() {
        let mut raw = make_inode(S_IFREG | 0o644, 5000);
        for slot in 0..15 {
            put_u32(&mut raw, 0x28 + slot * 4, 100 + slot as u32);
        }
        let inode = Ext2Inode::parse_from_bytes(&raw).unwrap();
        assert!(inode.is_regular());
        assert_eq!(inode.permission_bits(), 0o644);
        assert_eq!(inode.direct_block(0), Some(BlockNumber(100)));
        assert_eq!(inode.direct_block(11), Some(BlockNumber(111)));
        assert_eq!(inode.direct_block(12), None);
        assert_eq!(inode.single_indirect(), BlockNumber(112));
        assert_eq!(inode.double_indirect(), BlockNumber(113));
        assert_eq!(inode.triple_indirect(), BlockNumber(114));
        assert!(Ext2Inode::parse_from_bytes(&raw[..100]).is_err());
    }

    #[test]
    fn file_size_combines_high_bits_for_regular_files() {
        let mut raw = make_inode(S_IFREG | 0o600, 16);
        put_u32(&mut raw, 0x6C, 1);
        let inode = Ext2Inode::parse_from_bytes(&raw).unwrap();
        assert_eq!(inode.file_size(1), (1_u64 << 32) | 16);
        assert_eq!(inode.file_size(0), 16);

        let mut raw = make_inode(S_IFDIR | 0o755, 1024);
        put_u32(&mut raw, 0x6C, 7);
        let dir = Ext2Inode::parse_from_bytes(&raw).unwrap();
        assert_eq!(dir.file_size(1), 1024);
    }

    #[test]
    fn inline_symlink_bytes() {
        let mut raw = make_inode(S_IFLNK | 0o777, 10);
        raw[0x28..0x32].copy_from_slice(b"target.txt");
        let inode = Ext2Inode::parse_from_bytes(&raw).unwrap();
        assert!(inode.is_fast_symlink());
        assert_eq!(&inode.block_area_bytes()[..10], b"target.txt");
        assert_eq!(inode.file_type(), Ext2FileType::Symlink);

        let long = Ext2Inode::parse_from_bytes(&make_inode(S_IFLNK | 0o777, 60)).unwrap();
        assert!(!long.is_fast_symlink());
    }

    #[test]
    fn dir_entry_parse_and_validate() {
        let mut raw = [0_u8; 16];
        put_u32(&mut raw, 0, 12);
        put_u16(&mut raw, 4, 16);
        raw[6] = 5;
        raw[7] = 1;
        raw[8..13].copy_from_slice(b"hello");
        let entry = Ext2DirEntry::parse_from_bytes(&raw, 1024).unwrap();
        assert_eq!(entry.inode, InodeNumber(12));
        assert_eq!(entry.name, b"hello");
        assert_eq!(entry.name_str(), "hello");
        assert_eq!(entry.file_type, Ext2FileType::RegFile);

        let mut short = raw;
        put_u16(&mut short, 4, 4);
        assert!(Ext2DirEntry::parse_from_bytes(&short, 1024).is_err());

        let mut overflow = raw;
        overflow[6] = 20;
        assert!(Ext2DirEntry::parse_from_bytes(&overflow, 1024).is_err());
    }

    #[test]
    fn unused_entry_skips_name_check() {
        let mut raw = [0_u8; 12];
        put_u16(&mut raw, 4, 12);
        raw[6] = 200;
        let header = Ext2DirEntryHeader::parse_from_bytes(&raw, 1024).unwrap();
        assert!(header.is_unused());
        header.validate().expect("unused slot is structurally fine");
    }

    #[test]
    fn max_rec_len_covers_a_64k_block() {
        assert_eq!(rec_len_from_disk(EXT2_MAX_REC_LEN, 65536), 65536);
        assert_eq!(rec_len_from_disk(0, 65536), 65536);
        assert_eq!(rec_len_from_disk(12, 65536), 12);
        assert_eq!(rec_len_from_disk(EXT2_MAX_REC_LEN, 4096), 65535);
        assert_eq!(rec_len_from_disk(0, 4096), 0);

        let mut raw = [0_u8; 8];
        put_u16(&mut raw, 4, EXT2_MAX_REC_LEN);
        let header = Ext2DirEntryHeader::parse_from_bytes(&raw, 65536).unwrap();
        assert_eq!(header.rec_len, 65536);
        header.validate().expect("whole-block unused record");

        let narrow = Ext2DirEntryHeader::parse_from_bytes(&raw, 4096).unwrap();
        assert!(narrow.validate().is_err());
    }

    #[test]
    fn file_type_from_mode_matches_raw() {
        assert_eq!(Ext2FileType::from_mode(S_IFDIR | 0o755), Ext2FileType::Dir);
        assert_eq!(Ext2FileType::from_mode(S_IFSOCK), Ext2FileType::Sock);
        assert_eq!(Ext2FileType::from_raw(2), Ext2FileType::Dir);
        assert_eq!(Ext2FileType::from_raw(99), Ext2FileType::Unknown);
    }

    proptest! {
        #[test]
        fn parse_inode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..200)) {
            let _ = Ext2Inode::parse_from_bytes(&bytes);
        }

        #[test]
        fn parse_superblock_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..1100)) {
            let _ = Ext2Superblock::parse_superblock_region(&bytes);
        }

        #[test]
        fn block_area_bytes_match_pointers(ptrs in proptest::array::uniform15(any::<u32>())) {
            let mut raw = make_inode(S_IFLNK, 0);
            for (slot, p) in ptrs.iter().enumerate() {
                put_u32(&mut raw, 0x28 + slot * 4, *p);
            }
            let inode = Ext2Inode::parse_from_bytes(&raw).unwrap();
            prop_assert_eq!(&inode.block_area_bytes()[..], &raw[0x28..0x28 + 60]);
        }
    }
}
