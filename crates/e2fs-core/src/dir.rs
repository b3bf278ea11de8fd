//! Directory iteration and path resolution.
//!
//! Entries are walked through the content reader, so directories with
//! indirect blocks or holes need no special handling here. Unused slots
//! (inode 0) are skipped and never surface to callers.

use crate::{Volume, live_parse_error};
use e2fs_error::{E2fsError, Result};
use e2fs_ondisk::{Ext2DirEntry, Ext2DirEntryHeader, Ext2Inode};
use e2fs_types::{EXT2_DIR_ENTRY_HEADER_LEN, InodeNumber};
use std::collections::VecDeque;
use tracing::debug;

/// Symlinks followed by one [`Volume::resolve_path_follow`] call before it
/// gives up (the Linux `MAXSYMLINKS` value).
pub const MAX_SYMLINK_FOLLOWS: usize = 40;

const HEADER_LEN: u64 = EXT2_DIR_ENTRY_HEADER_LEN as u64;

/// Byte position inside a directory's content. Start from `default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirCursor {
    offset: u64,
}

impl DirCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the next record to examine.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Iterator over the live entries of one directory.
///
/// Yields `Err` at most once, then ends.
#[derive(Debug)]
pub struct DirEntries<'a> {
    vol: &'a Volume,
    dir: Ext2Inode,
    cursor: DirCursor,
    done: bool,
}

impl Iterator for DirEntries<'_> {
    type Item = Result<Ext2DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.vol.next_dir_entry(&self.dir, &mut self.cursor) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn split_components(path: &[u8]) -> impl DoubleEndedIterator<Item = &[u8]> {
    path.split(|b| *b == b'/').filter(|c| !c.is_empty())
}

/// `NotDirectory` when `path` ends in `/` but `found` is not a directory.
fn check_trailing_slash(path: &str, found: &Ext2Inode) -> Result<()> {
    if path.ends_with('/') && !found.is_dir() {
        return Err(E2fsError::NotDirectory);
    }
    Ok(())
}

impl Volume {
    /// Next live entry at or after `cursor`, advancing it past the entry.
    ///
    /// `Ok(None)` once the directory's size is reached. A record whose
    /// `rec_len` is malformed or runs past its block is `Corruption`.
    pub fn next_dir_entry(
        &self,
        dir: &Ext2Inode,
        cursor: &mut DirCursor,
    ) -> Result<Option<Ext2DirEntry>> {
        self.ensure_open()?;
        if !dir.is_dir() {
            return Err(E2fsError::NotDirectory);
        }
        let size = self.file_size(dir);
        let bs = self.block_size();

        while cursor.offset < size {
            let at = cursor.offset;
            if u64::from(bs.remaining_in_block(at)) < HEADER_LEN {
                return Err(self.dir_corruption(dir, at, "entry header crosses block end"));
            }

            let mut raw = [0_u8; EXT2_DIR_ENTRY_HEADER_LEN];
            if self.read_file_content(dir, at, &mut raw)? < raw.len() {
                return Err(self.dir_corruption(dir, at, "entry header past directory end"));
            }
            let header = Ext2DirEntryHeader::parse_from_bytes(&raw, bs.get())
                .and_then(|h| h.validate().map(|()| h))
                .map_err(|e| live_parse_error(self.dir_block(dir, at), &e))?;
            let rec_len = u64::from(header.rec_len);
            if rec_len > u64::from(bs.remaining_in_block(at)) {
                return Err(self.dir_corruption(dir, at, "rec_len runs past block end"));
            }

            cursor.offset = at + rec_len;
            if header.is_unused() {
                continue;
            }

            let name = self.read_to_vec(dir, at + HEADER_LEN, usize::from(header.name_len))?;
            let entry = Ext2DirEntry::from_header(header, &name)
                .map_err(|e| live_parse_error(self.dir_block(dir, at), &e))?;
            return Ok(Some(entry));
        }
        Ok(None)
    }

    /// Iterate the live entries of `dir` in on-disk order.
    pub fn dir_entries(&self, dir: &Ext2Inode) -> Result<DirEntries<'_>> {
        self.ensure_open()?;
        if !dir.is_dir() {
            return Err(E2fsError::NotDirectory);
        }
        Ok(DirEntries {
            vol: self,
            dir: dir.clone(),
            cursor: DirCursor::default(),
            done: false,
        })
    }

    /// All live entries of `dir`, including `.` and `..`.
    pub fn read_dir(&self, dir: &Ext2Inode) -> Result<Vec<Ext2DirEntry>> {
        self.dir_entries(dir)?.collect()
    }

    /// Entry named exactly `name` in `dir`, or `Ok(None)`.
    pub fn find_in_directory(&self, dir: &Ext2Inode, name: &[u8]) -> Result<Option<Ext2DirEntry>> {
        for entry in self.dir_entries(dir)? {
            let entry = entry?;
            if entry.name == name {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Resolve an absolute path without following symlinks.
    ///
    /// Returns `Ok(None)` when a component is missing and `NotDirectory`
    /// when a non-final component is not a directory. Empty components are
    /// ignored, so `"/"` and `"//"` both name the root. A trailing slash after
    /// a non-directory is `NotDirectory`.
    pub fn resolve_path(&self, path: &str) -> Result<Option<(InodeNumber, Ext2Inode)>> {
        if !path.starts_with('/') {
            return Err(E2fsError::InvalidArgument(format!(
                "path must be absolute: {path:?}"
            )));
        }

        let mut ino = InodeNumber::ROOT;
        let mut inode = self.read_inode(ino)?;
        for component in split_components(path.as_bytes()) {
            if !inode.is_dir() {
                return Err(E2fsError::NotDirectory);
            }
            let Some(entry) = self.find_in_directory(&inode, component)? else {
                debug!(
                    target: "e2fs::path",
                    parent = ino.0,
                    name = %String::from_utf8_lossy(component),
                    "component_missing"
                );
                return Ok(None);
            };
            ino = entry.inode;
            inode = self.read_inode(ino)?;
            debug!(
                target: "e2fs::path",
                name = %entry.name_str(),
                ino = ino.0,
                "component_resolved"
            );
        }
        check_trailing_slash(path, &inode)?;
        Ok(Some((ino, inode)))
    }

    /// Resolve an absolute path, following symlinks in every component.
    ///
    /// Absolute targets restart at the root; relative targets continue from
    /// the directory holding the link. More than [`MAX_SYMLINK_FOLLOWS`]
    /// links is `InvalidArgument`. An empty link target resolves to nothing.
    pub fn resolve_path_follow(&self, path: &str) -> Result<Option<(InodeNumber, Ext2Inode)>> {
        if !path.starts_with('/') {
            return Err(E2fsError::InvalidArgument(format!(
                "path must be absolute: {path:?}"
            )));
        }

        let root = (InodeNumber::ROOT, self.read_inode(InodeNumber::ROOT)?);
        let mut cur = root.clone();
        let mut pending: VecDeque<Vec<u8>> =
            split_components(path.as_bytes()).map(<[u8]>::to_vec).collect();
        let mut follows = 0_usize;

        while let Some(component) = pending.pop_front() {
            if !cur.1.is_dir() {
                return Err(E2fsError::NotDirectory);
            }
            let Some(entry) = self.find_in_directory(&cur.1, &component)? else {
                return Ok(None);
            };
            let child = self.read_inode(entry.inode)?;
            if !child.is_symlink() {
                cur = (entry.inode, child);
                continue;
            }

            follows += 1;
            if follows > MAX_SYMLINK_FOLLOWS {
                return Err(E2fsError::InvalidArgument(format!(
                    "too many levels of symbolic links resolving {path:?}"
                )));
            }
            let target = self.read_symlink(&child)?;
            debug!(
                target: "e2fs::path",
                link = entry.inode.0,
                target = %String::from_utf8_lossy(&target),
                follows,
                "symlink_followed"
            );
            if target.is_empty() {
                return Ok(None);
            }
            if target.first() == Some(&b'/') {
                cur = root.clone();
            }
            for part in split_components(&target).rev() {
                pending.push_front(part.to_vec());
            }
        }
        check_trailing_slash(path, &cur.1)?;
        Ok(Some(cur))
    }

    /// Physical block under directory offset `at`, for error reports.
    fn dir_block(&self, dir: &Ext2Inode, at: u64) -> u64 {
        self.block_number_for_index(dir, self.block_size().block_index(at))
            .map_or(0, |b| u64::from(b.0))
    }

    fn dir_corruption(&self, dir: &Ext2Inode, at: u64, detail: &str) -> E2fsError {
        E2fsError::Corruption {
            block: self.dir_block(dir, at),
            detail: format!("directory offset {at}: {detail}"),
        }
    }
}
