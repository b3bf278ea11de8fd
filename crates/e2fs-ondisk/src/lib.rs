#![forbid(unsafe_code)]
//! On-disk format parsing for ext2 structures.
//!
//! Pure parsing crate: no I/O, no side effects. Turns byte slices into typed
//! superblocks, group descriptors, inodes, and directory entries.

pub mod ext2;

pub use ext2::{
    Ext2DirEntry, Ext2DirEntryHeader, Ext2FileType, Ext2GroupDesc, Ext2Inode, Ext2Superblock,
    rec_len_from_disk,
};
