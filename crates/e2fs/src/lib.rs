#![forbid(unsafe_code)]
//! Public API facade for the ext2 reader.
//!
//! Re-exports `e2fs-core` through a stable external interface. Downstream
//! consumers (tools, the conformance harness) depend on this crate.

pub use e2fs_core::*;
