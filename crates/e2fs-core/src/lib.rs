#![forbid(unsafe_code)]
//! Read-only access to ext2 volume images.
//!
//! A [`Volume`] owns the backing device, the parsed superblock, and the
//! group descriptor table. Everything else (inodes, directory entries, file
//! content) is returned as owned values, so the volume can be shared across
//! threads behind a plain reference.
//!
//! Layering, leaves first:
//!
//! | Module | Operation |
//! |--------|-----------|
//! | `volume` | open / close, metadata |
//! | `block` | positioned block reads with sparse zero-fill |
//! | `mapping` | logical block index → physical block (direct, single, double, triple indirect) |
//! | `inode` | inode number → inode record |
//! | `content` | byte-range reads clamped to the file size |
//! | `dir`, `symlink` | directory iteration, path resolution, link targets |

mod block;
mod content;
mod dir;
mod inode;
pub mod mapping;
mod symlink;
mod volume;

pub use dir::{DirCursor, DirEntries, MAX_SYMLINK_FOLLOWS};
pub use mapping::{BlockPath, MapTier};
pub use volume::{GroupInfo, OpenOptions, Volume, VolumeInfo, VolumeState};

pub use e2fs_block::{ByteDevice, CountingByteDevice, FileByteDevice, MemByteDevice};
pub use e2fs_error::{E2fsError, Result};
pub use e2fs_ondisk::{
    Ext2DirEntry, Ext2DirEntryHeader, Ext2FileType, Ext2GroupDesc, Ext2Inode, Ext2Superblock,
};
pub use e2fs_types::{BlockNumber, BlockSize, ByteOffset, GroupNumber, InodeNumber, ParseError};

/// Map a parse failure found while opening a volume.
///
/// Nothing is live yet, so every variant means "not a usable ext2 image".
fn open_parse_error(e: &ParseError) -> E2fsError {
    E2fsError::Format(e.to_string())
}

/// Map a parse failure found in live metadata at `block`.
fn live_parse_error(block: u64, e: &ParseError) -> E2fsError {
    match e {
        ParseError::InvalidMagic { .. } => E2fsError::Format(e.to_string()),
        ParseError::InsufficientData { .. }
        | ParseError::InvalidField { .. }
        | ParseError::IntegerConversion { .. } => E2fsError::Corruption {
            block,
            detail: e.to_string(),
        },
    }
}
