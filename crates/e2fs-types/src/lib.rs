#![forbid(unsafe_code)]
//! Shared vocabulary for the ext2 reader crates.
//!
//! Unit-carrying newtypes keep block numbers, inode numbers, group numbers,
//! and byte offsets from being mixed up at call sites. The little-endian
//! read helpers and [`ParseError`] are used by the pure parsing layer in
//! `e2fs-ondisk`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const EXT2_SUPERBLOCK_OFFSET: usize = 1024;
pub const EXT2_SUPERBLOCK_SIZE: usize = 1024;
pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;

/// `s_state`: unmounted cleanly.
pub const EXT2_VALID_FS: u16 = 1;

/// Revision 0: fixed 128-byte inodes, first non-reserved inode 11.
pub const EXT2_GOOD_OLD_REV: u32 = 0;
/// Revision 1: variable inode size and feature flags.
pub const EXT2_DYNAMIC_REV: u32 = 1;
pub const EXT2_GOOD_OLD_INODE_SIZE: u16 = 128;
pub const EXT2_GOOD_OLD_FIRST_INO: u32 = 11;

/// On-disk size of one block-group descriptor.
pub const EXT2_GROUP_DESC_SIZE: usize = 32;

// ── Block-pointer area (i_block) ────────────────────────────────────────────

/// Number of direct block pointers in an inode.
pub const EXT2_NDIR_BLOCKS: usize = 12;
/// Slot of the single-indirect pointer.
pub const EXT2_IND_BLOCK: usize = 12;
/// Slot of the double-indirect pointer.
pub const EXT2_DIND_BLOCK: usize = 13;
/// Slot of the triple-indirect pointer.
pub const EXT2_TIND_BLOCK: usize = 14;
/// Total number of pointer slots in `i_block`.
pub const EXT2_N_BLOCKS: usize = 15;
/// Width of one on-disk block pointer.
pub const EXT2_BLOCK_POINTER_SIZE: usize = 4;

/// Symlink targets shorter than this are stored inline in `i_block`.
pub const EXT2_FAST_SYMLINK_MAX: usize = 60;

/// Fixed part of a directory entry (inode, rec_len, name_len, file_type).
pub const EXT2_DIR_ENTRY_HEADER_LEN: usize = 8;
/// On-disk `rec_len` standing for a whole 64 KiB block.
pub const EXT2_MAX_REC_LEN: u16 = 65535;
pub const EXT2_NAME_LEN: usize = 255;

// ── Newtypes ────────────────────────────────────────────────────────────────

/// Physical block number as stored in ext2 block pointers (32-bit).
///
/// Block 0 never holds file data; a zero pointer marks a sparse hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockNumber(pub u32);

impl BlockNumber {
    /// Hole marker: reads as zeros without touching the device.
    pub const SPARSE: Self = Self(0);
    /// Sentinel that never names a readable block.
    pub const INVALID: Self = Self(u32::MAX);

    #[must_use]
    pub fn is_sparse(self) -> bool {
        self == Self::SPARSE
    }

    #[must_use]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }

    /// Byte offset of the start of this block.
    #[must_use]
    pub fn to_byte_offset(self, block_size: BlockSize) -> ByteOffset {
        // u32 * u32 always fits in u64.
        ByteOffset(u64::from(self.0) * u64::from(block_size.get()))
    }
}

/// ext2 inode number (1-indexed; 0 is invalid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InodeNumber(pub u32);

impl InodeNumber {
    pub const ROOT: Self = Self(2);
}

/// Block group index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupNumber(pub u32);

/// Absolute byte offset on a `ByteDevice` (pread semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteOffset(pub u64);

impl ByteOffset {
    pub const ZERO: Self = Self(0);

    /// Add a byte count, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, bytes: u64) -> Option<Self> {
        self.0.checked_add(bytes).map(Self)
    }

    /// Narrow to `usize`, returning `ParseError::IntegerConversion` on overflow.
    pub fn to_usize(self) -> Result<usize, ParseError> {
        usize::try_from(self.0).map_err(|_| ParseError::IntegerConversion {
            field: "byte_offset",
        })
    }
}

/// Validated block size (power of two in 1024..=65536).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockSize(u32);

impl BlockSize {
    pub const MIN: u32 = 1024;
    pub const MAX: u32 = 65536;

    /// Create a `BlockSize` if `value` is a power of two in [1024, 65536].
    pub fn new(value: u32) -> Result<Self, ParseError> {
        if !value.is_power_of_two() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ParseError::InvalidField {
                field: "block_size",
                reason: "must be power of two in 1024..=65536",
            });
        }
        Ok(Self(value))
    }

    /// Derive the block size from `s_log_block_size` (`1024 << log`).
    pub fn from_log(log_block_size: u32) -> Result<Self, ParseError> {
        let value = ext2_block_size_from_log(log_block_size).ok_or(ParseError::InvalidField {
            field: "s_log_block_size",
            reason: "invalid shift",
        })?;
        Self::new(value)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Number of bits to shift to convert between bytes and blocks.
    #[must_use]
    pub fn shift(self) -> u32 {
        self.0.trailing_zeros()
    }

    /// Number of 32-bit block pointers held by one indirection block.
    #[must_use]
    pub fn pointers_per_block(self) -> u32 {
        self.0 / 4
    }

    /// Logical block index containing `byte_offset` (truncating).
    #[must_use]
    pub fn block_index(self, byte_offset: u64) -> u64 {
        byte_offset >> self.shift()
    }

    /// Offset of `byte_offset` within its block.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // masked by a u32 block size
    pub fn offset_in_block(self, byte_offset: u64) -> u32 {
        (byte_offset & (u64::from(self.0) - 1)) as u32
    }

    /// Bytes from `byte_offset` to the end of its block.
    #[must_use]
    pub fn remaining_in_block(self, byte_offset: u64) -> u32 {
        self.0 - self.offset_in_block(byte_offset)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("insufficient data: need {needed} bytes at offset {offset}, got {actual}")]
    InsufficientData {
        needed: usize,
        offset: usize,
        actual: usize,
    },
    #[error("invalid magic: expected {expected:#x}, got {actual:#x}")]
    InvalidMagic { expected: u64, actual: u64 },
    #[error("invalid field: {field} ({reason})")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    #[error("integer conversion failed: {field}")]
    IntegerConversion { field: &'static str },
}

#[inline]
pub fn ensure_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], ParseError> {
    let Some(end) = offset.checked_add(len) else {
        return Err(ParseError::InvalidField {
            field: "offset",
            reason: "overflow",
        });
    };

    if end > data.len() {
        return Err(ParseError::InsufficientData {
            needed: len,
            offset,
            actual: data.len().saturating_sub(offset),
        });
    }

    Ok(&data[offset..end])
}

#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> Result<u8, ParseError> {
    Ok(ensure_slice(data, offset, 1)?[0])
}

#[inline]
pub fn read_le_u16(data: &[u8], offset: usize) -> Result<u16, ParseError> {
    let bytes = ensure_slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub fn read_le_u32(data: &[u8], offset: usize) -> Result<u32, ParseError> {
    let bytes = ensure_slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub fn read_fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], ParseError> {
    let bytes = ensure_slice(data, offset, N)?;
    let mut out = [0_u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Decode a fixed-width, possibly unterminated, NUL-padded string field.
#[must_use]
pub fn trim_nul_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_owned()
}

#[must_use]
pub fn ext2_block_size_from_log(log_block_size: u32) -> Option<u32> {
    let shift = 10_u32.checked_add(log_block_size)?;
    1_u32.checked_shl(shift)
}

/// Number of block groups needed to cover `blocks_count` blocks.
///
/// Returns `None` when `blocks_per_group` is zero.
#[must_use]
pub fn groups_for_blocks(blocks_count: u32, blocks_per_group: u32) -> Option<u32> {
    if blocks_per_group == 0 {
        return None;
    }
    Some(blocks_count.div_ceil(blocks_per_group))
}

/// Block group holding inode `ino`: `(ino - 1) / inodes_per_group`.
#[must_use]
pub fn inode_to_group(ino: InodeNumber, inodes_per_group: u32) -> GroupNumber {
    GroupNumber(ino.0.saturating_sub(1) / inodes_per_group.max(1))
}

/// Index of inode `ino` within its group's inode table.
#[must_use]
pub fn inode_index_in_group(ino: InodeNumber, inodes_per_group: u32) -> u32 {
    ino.0.saturating_sub(1) % inodes_per_group.max(1)
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── POSIX file mode constants ────────────────────────────────────────────────

/// File type mask (upper 4 bits of mode).
pub const S_IFMT: u16 = 0o170_000;
/// Named pipe (FIFO).
pub const S_IFIFO: u16 = 0o010_000;
/// Character device.
pub const S_IFCHR: u16 = 0o020_000;
/// Directory.
pub const S_IFDIR: u16 = 0o040_000;
/// Block device.
pub const S_IFBLK: u16 = 0o060_000;
/// Regular file.
pub const S_IFREG: u16 = 0o100_000;
/// Symbolic link.
pub const S_IFLNK: u16 = 0o120_000;
/// Socket.
pub const S_IFSOCK: u16 = 0o140_000;
