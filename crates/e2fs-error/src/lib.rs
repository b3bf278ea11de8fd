#![forbid(unsafe_code)]
//! Error types for the ext2 reader.
//!
//! # Error Taxonomy
//!
//! Two layers:
//!
//! | Layer | Type | Crate | Purpose |
//! |-------|------|-------|---------|
//! | Parsing | `ParseError` | `e2fs-types` | Byte-level format violations found while decoding a buffer |
//! | Runtime | `E2fsError` | `e2fs-error` (this crate) | Errors returned by every public volume operation |
//!
//! ## Mapping Policy: ParseError → E2fsError
//!
//! This crate does not depend on `e2fs-types`. The conversion lives in
//! `e2fs-core`, which sees both types:
//!
//! | ParseError Variant | At open time | While reading live metadata |
//! |--------------------|--------------|-----------------------------|
//! | `InsufficientData` | `Format` | `Corruption { block, detail }` |
//! | `InvalidMagic` | `Format` | `Format` |
//! | `InvalidField` | `Format` | `Corruption { block, detail }` |
//! | `IntegerConversion` | `Format` | `Corruption { block, detail }` |
//!
//! ## errno Mapping
//!
//! | Variant | errno |
//! |---------|-------|
//! | `Io` | raw OS error, else `EIO` |
//! | `NotFound` | `ENOENT` |
//! | `Format` | `EINVAL` |
//! | `InvalidArgument` | `EINVAL` |
//! | `NotDirectory` | `ENOTDIR` |
//! | `NotSymlink` | `EINVAL` |
//! | `InvalidBlock` | `EIO` |
//! | `OutOfRange` | `EFBIG` |
//! | `InvalidState` | `EBADF` |
//! | `Corruption` | `EIO` |

use thiserror::Error;

/// Error returned by every public operation of the reader.
#[derive(Debug, Error)]
pub enum E2fsError {
    /// Failed or short positioned read on the backing storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing path, or a named object inside the volume, does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Not an ext2 volume, or its superblock / descriptor table is malformed.
    #[error("invalid on-disk format: {0}")]
    Format(String),

    /// Caller passed a value the volume cannot serve (inode 0, relative path).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A directory operation or path component hit a non-directory inode.
    #[error("not a directory")]
    NotDirectory,

    /// A symlink read was attempted on an inode that is not a symlink.
    #[error("not a symbolic link")]
    NotSymlink,

    /// The invalid-block sentinel was read, or an indirection entry could not be fetched.
    #[error("invalid block {block}: {detail}")]
    InvalidBlock { block: u32, detail: String },

    /// Logical block index beyond triple-indirect capacity.
    #[error("logical block {index} out of range (capacity {capacity})")]
    OutOfRange { index: u64, capacity: u64 },

    /// Operation attempted on a closed volume.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Live metadata that cannot be interpreted (truncated inode, bad rec_len).
    #[error("corrupt metadata at block {block}: {detail}")]
    Corruption { block: u64, detail: String },
}

impl E2fsError {
    /// Convert this error into a POSIX errno.
    ///
    /// Every variant has an explicit arm.
    #[must_use]
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            Self::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
            Self::NotFound(_) => libc::ENOENT,
            Self::Format(_) | Self::InvalidArgument(_) | Self::NotSymlink => libc::EINVAL,
            Self::NotDirectory => libc::ENOTDIR,
            Self::InvalidBlock { .. } | Self::Corruption { .. } => libc::EIO,
            Self::OutOfRange { .. } => libc::EFBIG,
            Self::InvalidState(_) => libc::EBADF,
        }
    }

    /// Whether this error means "the object is absent" rather than a fault.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias using `E2fsError`.
pub type Result<T> = std::result::Result<T, E2fsError>;
