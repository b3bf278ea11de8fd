#![forbid(unsafe_code)]
//! Test tooling for the ext2 reader: crafted images and sparse JSON fixtures.

pub mod image;

pub use image::{
    ImageBuilder, ImageConfig, InodeSpec, ROOT_INO, SAMPLE_HELLO, SampleLayout, sample_long_target,
    sample_readme, sample_volume,
};

use anyhow::{Context, Result, bail};
use e2fs_ondisk::Ext2Superblock;
use e2fs_types::{EXT2_SUPERBLOCK_OFFSET, EXT2_SUPERBLOCK_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A mostly-zero image stored as `(offset, hex)` runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseFixture {
    pub size: usize,
    pub writes: Vec<FixtureWrite>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureWrite {
    pub offset: usize,
    pub hex: String,
}

pub fn load_sparse_fixture(path: &Path) -> Result<Vec<u8>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let fixture: SparseFixture = serde_json::from_str(&text)
        .with_context(|| format!("invalid fixture json {}", path.display()))?;
    materialize_fixture(&fixture)
}

/// Expand a fixture into its full byte image.
pub fn materialize_fixture(fixture: &SparseFixture) -> Result<Vec<u8>> {
    let mut bytes = vec![0_u8; fixture.size];
    for write in &fixture.writes {
        let payload = hex::decode(&write.hex)
            .with_context(|| format!("invalid hex at offset {}", write.offset))?;

        let end = write
            .offset
            .checked_add(payload.len())
            .context("fixture offset overflow")?;
        if end > bytes.len() {
            bail!(
                "fixture write out of bounds: offset={} payload={} size={}",
                write.offset,
                payload.len(),
                bytes.len()
            );
        }

        bytes[write.offset..end].copy_from_slice(&payload);
    }

    Ok(bytes)
}

/// Encode the non-zero `chunk`-sized regions of `image` as a sparse fixture.
#[must_use]
pub fn sparse_fixture_from_image(image: &[u8], chunk: usize) -> SparseFixture {
    let chunk = chunk.max(1);
    let mut writes: Vec<FixtureWrite> = Vec::new();
    let mut pending: Option<(usize, Vec<u8>)> = None;

    for (i, piece) in image.chunks(chunk).enumerate() {
        let offset = i * chunk;
        if piece.iter().all(|b| *b == 0) {
            if let Some((start, data)) = pending.take() {
                writes.push(FixtureWrite {
                    offset: start,
                    hex: hex::encode(data),
                });
            }
            continue;
        }
        match &mut pending {
            Some((_, data)) => data.extend_from_slice(piece),
            None => pending = Some((offset, piece.to_vec())),
        }
    }
    if let Some((start, data)) = pending {
        writes.push(FixtureWrite {
            offset: start,
            hex: hex::encode(data),
        });
    }

    SparseFixture {
        size: image.len(),
        writes,
    }
}

/// Load a fixture and parse the superblock at offset 1024.
pub fn validate_ext2_fixture(path: &Path) -> Result<Ext2Superblock> {
    let data = load_sparse_fixture(path)?;
    let region = data
        .get(EXT2_SUPERBLOCK_OFFSET..EXT2_SUPERBLOCK_OFFSET + EXT2_SUPERBLOCK_SIZE)
        .with_context(|| format!("fixture {} too small for a superblock", path.display()))?;
    Ext2Superblock::parse_superblock_region(region)
        .with_context(|| format!("failed ext2 parse for fixture {}", path.display()))
}
