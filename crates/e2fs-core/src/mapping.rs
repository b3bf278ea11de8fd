//! Logical block index → physical block number through the classic
//! direct / single / double / triple indirect scheme.
//!
//! [`locate`] is pure slot arithmetic. [`Volume::block_number_for_index`]
//! walks the resulting path with one 4-byte read per indirection level. A
//! zero pointer anywhere on the path reads back as zeros through the block
//! reader, so a hole at any level yields block 0 for the whole subtree.

use crate::Volume;
use e2fs_error::{E2fsError, Result};
use e2fs_ondisk::Ext2Inode;
use e2fs_types::{
    BlockNumber, EXT2_BLOCK_POINTER_SIZE, EXT2_DIND_BLOCK, EXT2_IND_BLOCK, EXT2_NDIR_BLOCKS,
    EXT2_TIND_BLOCK,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

const NDIR: u64 = EXT2_NDIR_BLOCKS as u64;

/// Number of indirections needed to reach a logical block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapTier {
    Direct,
    Single,
    Double,
    Triple,
}

impl MapTier {
    /// Indirection blocks read on the way to the data block.
    #[must_use]
    pub fn depth(self) -> usize {
        match self {
            Self::Direct => 0,
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }
}

/// Route to one logical block: an `i_block` slot, then one slot per
/// indirection level, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPath {
    pub tier: MapTier,
    /// Index into `i_block` (`0..15`).
    pub root: usize,
    slots: [u32; 3],
}

impl BlockPath {
    /// Slots to read in successive indirection blocks.
    #[must_use]
    pub fn table_slots(&self) -> &[u32] {
        &self.slots[..self.tier.depth()]
    }
}

/// Logical blocks addressable with `ppb` pointers per indirection block.
#[must_use]
pub fn capacity(ppb: u32) -> u64 {
    let p = u64::from(ppb);
    NDIR + p + p * p + p * p * p
}

#[allow(clippy::cast_possible_truncation)] // every slot is < ppb, which fits u32
fn slot(v: u64) -> u32 {
    v as u32
}

/// Compute the path to logical block `index` for `ppb` pointers per block.
pub fn locate(index: u64, ppb: u32) -> Result<BlockPath> {
    let p = u64::from(ppb);
    if index < NDIR {
        return Ok(BlockPath {
            tier: MapTier::Direct,
            root: slot(index) as usize,
            slots: [0; 3],
        });
    }

    let mut j = index - NDIR;
    if j < p {
        return Ok(BlockPath {
            tier: MapTier::Single,
            root: EXT2_IND_BLOCK,
            slots: [slot(j), 0, 0],
        });
    }

    j -= p;
    let p2 = p * p;
    if j < p2 {
        return Ok(BlockPath {
            tier: MapTier::Double,
            root: EXT2_DIND_BLOCK,
            slots: [slot(j / p), slot(j % p), 0],
        });
    }

    j -= p2;
    if j < p2 * p {
        return Ok(BlockPath {
            tier: MapTier::Triple,
            root: EXT2_TIND_BLOCK,
            slots: [slot(j / p2), slot((j % p2) / p), slot(j % p)],
        });
    }

    Err(E2fsError::OutOfRange {
        index,
        capacity: capacity(ppb),
    })
}

impl Volume {
    /// Physical block holding logical block `index` of `inode`.
    ///
    /// Returns `BlockNumber::SPARSE` for holes. Indices past triple-indirect
    /// capacity are `OutOfRange`; an indirection entry that cannot be read is
    /// `InvalidBlock` naming the table block.
    pub fn block_number_for_index(&self, inode: &Ext2Inode, index: u64) -> Result<BlockNumber> {
        self.ensure_open()?;
        let path = locate(index, self.block_size().pointers_per_block())?;
        let mut block = BlockNumber(inode.block[path.root]);
        trace!(
            target: "e2fs::mapping",
            index,
            tier = ?path.tier,
            root = block.0,
            "map_tier"
        );

        for &slot in path.table_slots() {
            block = self.read_pointer(block, slot)?;
        }
        Ok(block)
    }

    /// Read pointer `slot` of indirection block `table`.
    fn read_pointer(&self, table: BlockNumber, slot: u32) -> Result<BlockNumber> {
        let mut raw = [0_u8; EXT2_BLOCK_POINTER_SIZE];
        let offset = slot * EXT2_BLOCK_POINTER_SIZE as u32;
        match self.read_block(table, offset, &mut raw) {
            Ok(_) => {}
            Err(E2fsError::Io(err)) => {
                return Err(E2fsError::InvalidBlock {
                    block: table.0,
                    detail: format!("indirection slot {slot} unreadable: {err}"),
                });
            }
            Err(e) => return Err(e),
        }
        let ptr = BlockNumber(u32::from_le_bytes(raw));
        trace!(target: "e2fs::mapping", table = table.0, slot, ptr = ptr.0, "indirect_slot");
        Ok(ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_image;
    use crate::{CountingByteDevice, MemByteDevice, OpenOptions};
    use e2fs_harness::{ImageBuilder, InodeSpec, ROOT_INO};
    use e2fs_types::InodeNumber;
    use proptest::prelude::*;
    use std::sync::Arc;

    const P: u64 = 256;

    fn reconstruct(path: &BlockPath, ppb: u32) -> u64 {
        let p = u64::from(ppb);
        let s: Vec<u64> = path.table_slots().iter().map(|s| u64::from(*s)).collect();
        match path.tier {
            MapTier::Direct => path.root as u64,
            MapTier::Single => NDIR + s[0],
            MapTier::Double => NDIR + p + s[0] * p + s[1],
            MapTier::Triple => NDIR + p + p * p + s[0] * p * p + s[1] * p + s[2],
        }
    }

    #[test]
    fn tier_boundaries_1k() {
        let cases = [
            (0, MapTier::Direct),
            (11, MapTier::Direct),
            (12, MapTier::Single),
            (12 + P - 1, MapTier::Single),
            (12 + P, MapTier::Double),
            (12 + P + P * P - 1, MapTier::Double),
            (12 + P + P * P, MapTier::Triple),
            (12 + P + P * P + P * P * P - 1, MapTier::Triple),
        ];
        for (index, tier) in cases {
            let path = locate(index, 256).unwrap();
            assert_eq!(path.tier, tier, "index {index}");
        }
    }

    #[test]
    fn slots_at_boundaries() {
        let single = locate(12, 256).unwrap();
        assert_eq!((single.root, single.table_slots()), (12, &[0][..]));

        let last_single = locate(12 + P - 1, 256).unwrap();
        assert_eq!(last_single.table_slots(), &[255]);

        let double = locate(12 + P, 256).unwrap();
        assert_eq!((double.root, double.table_slots()), (13, &[0, 0][..]));

        let double_next_row = locate(12 + P + P, 256).unwrap();
        assert_eq!(double_next_row.table_slots(), &[1, 0]);

        let triple = locate(12 + P + P * P, 256).unwrap();
        assert_eq!((triple.root, triple.table_slots()), (14, &[0, 0, 0][..]));

        let last = locate(capacity(256) - 1, 256).unwrap();
        assert_eq!(last.table_slots(), &[255, 255, 255]);
    }

    #[test]
    fn beyond_triple_is_out_of_range() {
        let cap = capacity(256);
        assert_eq!(cap, 12 + 256 + 65_536 + 16_777_216);
        let err = locate(cap, 256).unwrap_err();
        assert!(matches!(
            err,
            E2fsError::OutOfRange { index, capacity } if index == cap && capacity == cap
        ));
    }

    #[test]
    fn large_block_capacity_fits_u64() {
        let path = locate(capacity(16_384) - 1, 16_384).unwrap();
        assert_eq!(path.tier, MapTier::Triple);
        assert_eq!(path.table_slots(), &[16_383, 16_383, 16_383]);
    }

    proptest! {
        #[test]
        fn locate_slots_reconstruct_index(
            ppb in prop::sample::select(vec![256_u32, 512, 1024, 4096]),
            frac in 0.0_f64..1.0,
        ) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let index = ((capacity(ppb) as f64) * frac) as u64;
            let index = index.min(capacity(ppb) - 1);
            let path = locate(index, ppb).unwrap();
            prop_assert!(path.table_slots().iter().all(|s| *s < ppb));
            prop_assert_eq!(reconstruct(&path, ppb), index);
        }

        #[test]
        fn small_indices_stay_in_low_tiers(index in 0_u64..(12 + 256)) {
            let path = locate(index, 256).unwrap();
            prop_assert!(path.tier.depth() <= 1);
            prop_assert_eq!(reconstruct(&path, 256), index);
        }
    }

    /// Regular file with a marker block at each listed logical index.
    fn file_with_blocks(indices: &[u64]) -> (Vec<u8>, u32) {
        let mut b = ImageBuilder::with_block_size(1024).unwrap();
        let payloads: Vec<Vec<u8>> = indices
            .iter()
            .map(|i| vec![(*i % 251) as u8 + 1; 1024])
            .collect();
        let blocks: Vec<(u64, &[u8])> = indices
            .iter()
            .zip(payloads.iter())
            .map(|(i, p)| (*i, p.as_slice()))
            .collect();
        let last = indices.iter().copied().max().unwrap_or(0);
        let ino = b
            .add_sparse_file(ROOT_INO, "f", (last + 1) * 1024, &blocks)
            .unwrap();
        (b.build().unwrap(), ino)
    }

    fn first_byte(vol: &Volume, block: BlockNumber) -> u8 {
        let mut byte = [0_u8; 1];
        vol.read_block(block, 0, &mut byte).unwrap();
        byte[0]
    }

    #[test]
    fn resolves_every_tier() {
        let triple_a = 12 + P + P * P;
        let triple_b = triple_a + P * P + 2 * P + 3;
        let indices = [0, 11, 12, 12 + P - 1, 12 + P, 12 + P + 5 * P + 7, triple_a, triple_b];
        let (image, ino) = file_with_blocks(&indices);
        let vol = open_image(image);
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();

        for index in indices {
            let block = vol.block_number_for_index(&inode, index).unwrap();
            assert!(!block.is_sparse(), "index {index}");
            assert_eq!(first_byte(&vol, block), (index % 251) as u8 + 1, "index {index}");
        }
    }

    #[test]
    fn direct_lookup_does_no_io() {
        let (image, ino) = file_with_blocks(&[0, 3, 11]);
        let dev = Arc::new(CountingByteDevice::new(MemByteDevice::from_vec(image)));
        let vol = Volume::from_device(Box::new(Arc::clone(&dev)), &OpenOptions::default()).unwrap();
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();
        dev.reset();

        for i in 0..12 {
            assert_eq!(
                vol.block_number_for_index(&inode, i).unwrap(),
                inode.direct_block(i as usize).unwrap()
            );
        }
        assert_eq!(dev.reads(), 0);
    }

    #[test]
    fn indirect_reads_one_slot_per_level() {
        let triple = 12 + P + P * P + 9;
        let (image, ino) = file_with_blocks(&[12, 12 + P, triple]);
        let dev = Arc::new(CountingByteDevice::new(MemByteDevice::from_vec(image)));
        let vol = Volume::from_device(Box::new(Arc::clone(&dev)), &OpenOptions::default()).unwrap();
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();

        for (index, reads) in [(12, 1), (12 + P, 2), (triple, 3)] {
            dev.reset();
            vol.block_number_for_index(&inode, index).unwrap();
            assert_eq!(dev.reads(), reads, "index {index}");
            assert_eq!(dev.bytes_read(), reads * 4);
        }
    }

    #[test]
    fn zero_pointer_makes_subtree_sparse() {
        // Only a direct block: single, double, and triple roots are all zero.
        let (image, ino) = file_with_blocks(&[0]);
        let vol = open_image(image);
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();
        for index in [5, 12, 12 + P - 1, 12 + P, 12 + P + P * P - 1, 12 + P + P * P, capacity(256) - 1] {
            assert_eq!(
                vol.block_number_for_index(&inode, index).unwrap(),
                BlockNumber::SPARSE,
                "index {index}"
            );
        }
    }

    #[test]
    fn zero_pointer_mid_chain_is_sparse() {
        // Double-indirect row 0 populated; row 1 pointer left zero.
        let (image, ino) = file_with_blocks(&[12 + P]);
        let vol = open_image(image);
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();
        assert!(!vol.block_number_for_index(&inode, 12 + P).unwrap().is_sparse());
        assert!(vol.block_number_for_index(&inode, 12 + P + 1).unwrap().is_sparse());
        assert!(vol.block_number_for_index(&inode, 12 + 2 * P).unwrap().is_sparse());
    }

    #[test]
    fn unreadable_table_is_invalid_block() {
        let mut b = ImageBuilder::with_block_size(1024).unwrap();
        let mut spec = InodeSpec::new(e2fs_types::S_IFREG | 0o644, 20 * 1024);
        spec.block[12] = 3_000_000; // far past the 2 MiB image
        let ino = b.add_inode(spec).unwrap();
        b.link(ROOT_INO, "broken", ino).unwrap();
        let vol = open_image(b.build().unwrap());
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();

        let err = vol.block_number_for_index(&inode, 12).unwrap_err();
        assert!(matches!(err, E2fsError::InvalidBlock { block: 3_000_000, .. }), "{err:?}");
    }

    #[test]
    fn sentinel_table_pointer_is_invalid_block() {
        let mut b = ImageBuilder::with_block_size(1024).unwrap();
        let mut spec = InodeSpec::new(e2fs_types::S_IFREG | 0o644, 20 * 1024);
        spec.block[12] = u32::MAX;
        let ino = b.add_inode(spec).unwrap();
        let vol = open_image(b.build().unwrap());
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();
        assert!(matches!(
            vol.block_number_for_index(&inode, 13),
            Err(E2fsError::InvalidBlock { block: u32::MAX, .. })
        ));
    }

    #[test]
    fn out_of_range_index_from_volume() {
        let (image, ino) = file_with_blocks(&[0]);
        let vol = open_image(image);
        let inode = vol.read_inode(InodeNumber(ino)).unwrap();
        assert!(matches!(
            vol.block_number_for_index(&inode, capacity(256)),
            Err(E2fsError::OutOfRange { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn any_mapped_index_resolves_to_its_block(index in 0_u64..(12 + P + P * P + 3 * P * P)) {
            let (image, ino) = file_with_blocks(&[index]);
            let vol = open_image(image);
            let inode = vol.read_inode(InodeNumber(ino)).unwrap();
            let block = vol.block_number_for_index(&inode, index).unwrap();
            prop_assert!(!block.is_sparse());
            prop_assert_eq!(first_byte(&vol, block), (index % 251) as u8 + 1);
            if index > 0 {
                prop_assert!(vol.block_number_for_index(&inode, index - 1).unwrap().is_sparse());
            }
        }
    }
}
