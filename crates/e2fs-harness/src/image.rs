//! In-memory ext2 image construction.
//!
//! `ImageBuilder` lays out a volume the way `mke2fs` does for a small image
//! (superblock, one-block descriptor table, bitmaps, inode tables, then data)
//! and maps file blocks through direct and indirect pointers as needed, so
//! tests can place data at any logical index.

use anyhow::{Context, Result, bail, ensure};
use e2fs_ondisk::Ext2FileType;
use e2fs_types::{
    BlockSize, EXT2_DIR_ENTRY_HEADER_LEN, EXT2_FAST_SYMLINK_MAX, EXT2_GOOD_OLD_FIRST_INO,
    EXT2_GROUP_DESC_SIZE, EXT2_N_BLOCKS, EXT2_NAME_LEN, EXT2_NDIR_BLOCKS, EXT2_SUPER_MAGIC,
    EXT2_SUPERBLOCK_OFFSET, EXT2_VALID_FS, InodeNumber, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG,
    groups_for_blocks,
};
use std::collections::BTreeMap;

/// Root directory inode number.
pub const ROOT_INO: u32 = InodeNumber::ROOT.0;

/// Geometry and identity of a crafted volume.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub block_size: u32,
    pub blocks_count: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub inode_size: u16,
    pub rev_level: u32,
    pub state: u16,
    pub volume_name: String,
    pub last_mounted: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            blocks_count: 2048,
            blocks_per_group: 8192,
            inodes_per_group: 64,
            inode_size: 128,
            rev_level: 1,
            state: EXT2_VALID_FS,
            volume_name: "e2fs-test".to_owned(),
            last_mounted: String::new(),
        }
    }
}

impl ImageConfig {
    #[must_use]
    pub fn with_block_size(block_size: u32) -> Self {
        Self {
            block_size,
            blocks_per_group: block_size.saturating_mul(8),
            ..Self::default()
        }
    }
}

/// Inode fields the builder writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InodeSpec {
    pub mode: u16,
    pub size: u64,
    pub links_count: u16,
    pub block: [u32; EXT2_N_BLOCKS],
    /// `i_blocks` in 512-byte sectors.
    pub sectors: u32,
}

impl InodeSpec {
    #[must_use]
    pub fn new(mode: u16, size: u64) -> Self {
        Self {
            mode,
            size,
            links_count: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct DirRecord {
    inode: u32,
    name: Vec<u8>,
    file_type: u8,
}

#[derive(Debug, Clone)]
struct GroupLayout {
    block_bitmap: u32,
    inode_bitmap: u32,
    inode_table: u32,
}

/// Builder for a single- or multi-group ext2 image held in memory.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    config: ImageConfig,
    image: Vec<u8>,
    next_block: u32,
    next_inode: u32,
    groups: Vec<GroupLayout>,
    inodes: BTreeMap<u32, InodeSpec>,
    dirs: BTreeMap<u32, Vec<DirRecord>>,
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

impl ImageBuilder {
    /// Start an image with an empty root directory.
    pub fn new(config: ImageConfig) -> Result<Self> {
        let block_size = BlockSize::new(config.block_size).context("block size")?;
        ensure!(config.blocks_per_group > 0, "blocks_per_group must be non-zero");
        ensure!(config.inodes_per_group > 0, "inodes_per_group must be non-zero");
        ensure!(
            config.inode_size >= 128 && config.inode_size.is_power_of_two(),
            "inode_size must be a power of two >= 128"
        );
        let groups = groups_for_blocks(config.blocks_count, config.blocks_per_group)
            .context("group count")?;
        ensure!(groups > 0, "image needs at least one group");
        ensure!(
            groups as usize * EXT2_GROUP_DESC_SIZE <= block_size.get() as usize,
            "descriptor table must fit in one block"
        );

        let image_len = usize::try_from(u64::from(config.blocks_count) * u64::from(config.block_size))
            .context("image size")?;
        let first_data_block = u32::from(config.block_size == 1024);

        let mut builder = Self {
            image: vec![0_u8; image_len],
            // superblock block, then the descriptor table block
            next_block: first_data_block + 2,
            next_inode: EXT2_GOOD_OLD_FIRST_INO,
            groups: Vec::new(),
            inodes: BTreeMap::new(),
            dirs: BTreeMap::new(),
            config,
        };

        let table_bytes =
            u64::from(builder.config.inodes_per_group) * u64::from(builder.config.inode_size);
        let table_blocks = u32::try_from(table_bytes.div_ceil(u64::from(block_size.get())))
            .context("inode table size")?;
        for _ in 0..groups {
            let block_bitmap = builder.alloc_block()?;
            let inode_bitmap = builder.alloc_block()?;
            let inode_table = builder.next_block;
            for _ in 0..table_blocks {
                builder.alloc_block()?;
            }
            builder.groups.push(GroupLayout {
                block_bitmap,
                inode_bitmap,
                inode_table,
            });
        }

        let mut root = InodeSpec::new(S_IFDIR | 0o755, 0);
        root.links_count = 2;
        builder.inodes.insert(ROOT_INO, root);
        builder.dirs.insert(
            ROOT_INO,
            vec![
                DirRecord {
                    inode: ROOT_INO,
                    name: b".".to_vec(),
                    file_type: Ext2FileType::Dir as u8,
                },
                DirRecord {
                    inode: ROOT_INO,
                    name: b"..".to_vec(),
                    file_type: Ext2FileType::Dir as u8,
                },
            ],
        );
        Ok(builder)
    }

    /// Default geometry with the given block size.
    pub fn with_block_size(block_size: u32) -> Result<Self> {
        Self::new(ImageConfig::with_block_size(block_size))
    }

    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.config.block_size
    }

    /// Block pointers per indirection block.
    #[must_use]
    pub fn pointers_per_block(&self) -> u64 {
        u64::from(self.config.block_size / 4)
    }

    #[must_use]
    pub fn inodes_count(&self) -> u32 {
        self.config
            .inodes_per_group
            .saturating_mul(u32::try_from(self.groups.len()).unwrap_or(u32::MAX))
    }

    /// Next unused block, in allocation order.
    pub fn alloc_block(&mut self) -> Result<u32> {
        ensure!(
            self.next_block < self.config.blocks_count,
            "image out of blocks ({} total)",
            self.config.blocks_count
        );
        let block = self.next_block;
        self.next_block += 1;
        Ok(block)
    }

    fn alloc_inode(&mut self) -> Result<u32> {
        ensure!(
            self.next_inode <= self.inodes_count(),
            "image out of inodes ({} total)",
            self.inodes_count()
        );
        let ino = self.next_inode;
        self.next_inode += 1;
        Ok(ino)
    }

    fn block_range(&self, block: u32, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let bs = self.config.block_size as usize;
        ensure!(offset + len <= bs, "write crosses block boundary");
        let start = (block as usize)
            .checked_mul(bs)
            .and_then(|b| b.checked_add(offset))
            .context("block offset overflow")?;
        ensure!(start + len <= self.image.len(), "block {block} outside image");
        Ok(start..start + len)
    }

    /// Copy `data` to the start of `block`.
    pub fn write_block(&mut self, block: u32, data: &[u8]) -> Result<()> {
        let range = self.block_range(block, 0, data.len())?;
        self.image[range].copy_from_slice(data);
        Ok(())
    }

    /// Store `value` in pointer slot `slot` of indirection block `table`.
    pub fn write_pointer(&mut self, table: u32, slot: u64, value: u32) -> Result<()> {
        let offset = usize::try_from(slot * 4).context("slot offset")?;
        let range = self.block_range(table, offset, 4)?;
        self.image[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn read_pointer(&self, table: u32, slot: u64) -> Result<u32> {
        let offset = usize::try_from(slot * 4).context("slot offset")?;
        let range = self.block_range(table, offset, 4)?;
        let bytes: [u8; 4] = self.image[range].try_into().context("pointer width")?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Point logical block `index` of `ptrs` at `phys`, allocating indirection blocks on demand.
    pub fn map_block(&mut self, ptrs: &mut [u32; EXT2_N_BLOCKS], index: u64, phys: u32) -> Result<()> {
        let p = self.pointers_per_block();
        if index < EXT2_NDIR_BLOCKS as u64 {
            ptrs[index as usize] = phys;
            return Ok(());
        }

        let mut rel = index - EXT2_NDIR_BLOCKS as u64;
        let (root_slot, levels) = if rel < p {
            (12, 1)
        } else if rel - p < p * p {
            rel -= p;
            (13, 2)
        } else if rel - p - p * p < p * p * p {
            rel -= p + p * p;
            (14, 3)
        } else {
            bail!("logical block {index} beyond triple-indirect capacity");
        };

        if ptrs[root_slot] == 0 {
            ptrs[root_slot] = self.alloc_block()?;
        }
        let mut table = ptrs[root_slot];
        for level in (0..levels).rev() {
            let slot = (rel / p.pow(level)) % p;
            if level == 0 {
                self.write_pointer(table, slot, phys)?;
            } else {
                let mut next = self.read_pointer(table, slot)?;
                if next == 0 {
                    next = self.alloc_block()?;
                    self.write_pointer(table, slot, next)?;
                }
                table = next;
            }
        }
        Ok(())
    }

    /// Register an inode with arbitrary fields; it is not linked anywhere.
    pub fn add_inode(&mut self, spec: InodeSpec) -> Result<u32> {
        let ino = self.alloc_inode()?;
        self.inodes.insert(ino, spec);
        Ok(ino)
    }

    #[must_use]
    pub fn inode(&self, ino: u32) -> Option<&InodeSpec> {
        self.inodes.get(&ino)
    }

    pub fn inode_mut(&mut self, ino: u32) -> Option<&mut InodeSpec> {
        self.inodes.get_mut(&ino)
    }

    /// Add a directory entry `name -> ino` to `parent`.
    pub fn link(&mut self, parent: u32, name: &str, ino: u32) -> Result<()> {
        ensure!(
            !name.is_empty() && name.len() <= EXT2_NAME_LEN,
            "invalid entry name {name:?}"
        );
        let mode = self.inodes.get(&ino).context("link target inode")?.mode;
        let records = self.dirs.get_mut(&parent).context("parent is not a directory")?;
        records.push(DirRecord {
            inode: ino,
            name: name.as_bytes().to_vec(),
            file_type: Ext2FileType::from_mode(mode) as u8,
        });
        Ok(())
    }

    /// Add a deleted slot (inode 0) carrying `name` to `parent`.
    pub fn add_unused_entry(&mut self, parent: u32, name: &str) -> Result<()> {
        let records = self.dirs.get_mut(&parent).context("parent is not a directory")?;
        records.push(DirRecord {
            inode: 0,
            name: name.as_bytes().to_vec(),
            file_type: 0,
        });
        Ok(())
    }

    pub fn mkdir(&mut self, parent: u32, name: &str) -> Result<u32> {
        let mut spec = InodeSpec::new(S_IFDIR | 0o755, 0);
        spec.links_count = 2;
        let ino = self.add_inode(spec)?;
        self.dirs.insert(
            ino,
            vec![
                DirRecord {
                    inode: ino,
                    name: b".".to_vec(),
                    file_type: Ext2FileType::Dir as u8,
                },
                DirRecord {
                    inode: parent,
                    name: b"..".to_vec(),
                    file_type: Ext2FileType::Dir as u8,
                },
            ],
        );
        self.link(parent, name, ino)?;
        if let Some(p) = self.inodes.get_mut(&parent) {
            p.links_count = p.links_count.saturating_add(1);
        }
        Ok(ino)
    }

    /// Regular file whose every block is allocated.
    pub fn add_file(&mut self, parent: u32, name: &str, content: &[u8]) -> Result<u32> {
        let bs = self.config.block_size as usize;
        let blocks: Vec<(u64, &[u8])> = content
            .chunks(bs)
            .enumerate()
            .map(|(i, chunk)| (i as u64, chunk))
            .collect();
        self.add_sparse_file(parent, name, content.len() as u64, &blocks)
    }

    /// Regular file of `size` bytes with data only at the listed logical blocks.
    pub fn add_sparse_file(
        &mut self,
        parent: u32,
        name: &str,
        size: u64,
        blocks: &[(u64, &[u8])],
    ) -> Result<u32> {
        let ino = self.add_inode(InodeSpec::new(S_IFREG | 0o644, size))?;
        self.place_blocks(ino, blocks)?;
        self.link(parent, name, ino)?;
        Ok(ino)
    }

    /// Allocate and map data blocks for an existing inode.
    pub fn place_blocks(&mut self, ino: u32, blocks: &[(u64, &[u8])]) -> Result<()> {
        let mut spec = self.inodes.get(&ino).context("unknown inode")?.clone();
        let sectors_per_block = self.config.block_size / 512;
        for (index, data) in blocks {
            let phys = self.alloc_block()?;
            self.write_block(phys, data)?;
            self.map_block(&mut spec.block, *index, phys)?;
            spec.sectors = spec.sectors.saturating_add(sectors_per_block);
        }
        self.inodes.insert(ino, spec);
        Ok(())
    }

    /// Symlink to `target`: inline below 60 bytes, else in data blocks.
    pub fn add_symlink(&mut self, parent: u32, name: &str, target: &[u8]) -> Result<u32> {
        let mut spec = InodeSpec::new(S_IFLNK | 0o777, target.len() as u64);
        if target.len() < EXT2_FAST_SYMLINK_MAX {
            let mut area = [0_u8; EXT2_FAST_SYMLINK_MAX];
            area[..target.len()].copy_from_slice(target);
            for (ptr, word) in spec.block.iter_mut().zip(area.chunks_exact(4)) {
                *ptr = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            }
            let ino = self.add_inode(spec)?;
            self.link(parent, name, ino)?;
            return Ok(ino);
        }

        let ino = self.add_inode(spec)?;
        let bs = self.config.block_size as usize;
        let blocks: Vec<(u64, &[u8])> = target
            .chunks(bs)
            .enumerate()
            .map(|(i, chunk)| (i as u64, chunk))
            .collect();
        self.place_blocks(ino, &blocks)?;
        self.link(parent, name, ino)?;
        Ok(ino)
    }

    /// Pack directory records into blocks; the last record of each block
    /// absorbs the slack up to the block end.
    fn pack_dir(&self, records: &[DirRecord]) -> Result<Vec<Vec<u8>>> {
        let bs = self.config.block_size as usize;
        let mut blocks = Vec::new();
        let mut cur = vec![0_u8; bs];
        let mut off = 0_usize;
        let mut last: Option<usize> = None;

        let close = |cur: &mut Vec<u8>, last: Option<usize>| {
            if let Some(at) = last {
                let rec_len = u16::try_from(bs - at).unwrap_or(u16::MAX);
                put_u16(cur, at + 4, rec_len);
            }
        };

        for rec in records {
            let need = align4(EXT2_DIR_ENTRY_HEADER_LEN + rec.name.len());
            ensure!(need <= bs, "entry does not fit a block");
            if off + need > bs {
                close(&mut cur, last);
                blocks.push(std::mem::replace(&mut cur, vec![0_u8; bs]));
                off = 0;
                last = None;
            }
            put_u32(&mut cur, off, rec.inode);
            put_u16(&mut cur, off + 4, u16::try_from(need).context("rec_len")?);
            cur[off + 6] = u8::try_from(rec.name.len()).context("name_len")?;
            cur[off + 7] = rec.file_type;
            cur[off + 8..off + 8 + rec.name.len()].copy_from_slice(&rec.name);
            last = Some(off);
            off += need;
        }
        close(&mut cur, last);
        blocks.push(cur);
        Ok(blocks)
    }

    fn write_inode(&mut self, ino: u32, spec: &InodeSpec) -> Result<()> {
        let ipg = self.config.inodes_per_group;
        let group = ((ino - 1) / ipg) as usize;
        let index = ((ino - 1) % ipg) as usize;
        let layout = self.groups.get(group).context("inode group")?;
        let base = layout.inode_table as usize * self.config.block_size as usize
            + index * usize::from(self.config.inode_size);
        ensure!(base + 128 <= self.image.len(), "inode {ino} outside image");

        let raw = &mut self.image[base..base + 128];
        put_u16(raw, 0x00, spec.mode);
        #[allow(clippy::cast_possible_truncation)]
        put_u32(raw, 0x04, spec.size as u32);
        put_u16(raw, 0x1A, spec.links_count);
        put_u32(raw, 0x1C, spec.sectors);
        for (slot, ptr) in spec.block.iter().enumerate() {
            put_u32(raw, 0x28 + slot * 4, *ptr);
        }
        if spec.mode & S_IFMT == S_IFREG {
            put_u32(raw, 0x6C, u32::try_from(spec.size >> 32).context("size_high")?);
        }
        Ok(())
    }

    /// Materialize directories, inodes, descriptors, and the superblock.
    pub fn build(mut self) -> Result<Vec<u8>> {
        let bs = self.config.block_size;
        let dir_inos: Vec<u32> = self.dirs.keys().copied().collect();
        for ino in dir_inos {
            let records = self.dirs.get(&ino).cloned().unwrap_or_default();
            let packed = self.pack_dir(&records)?;
            let mut spec = self.inodes.get(&ino).context("directory inode")?.clone();
            spec.size = packed.len() as u64 * u64::from(bs);
            for (index, data) in packed.iter().enumerate() {
                let phys = self.alloc_block()?;
                self.write_block(phys, data)?;
                self.map_block(&mut spec.block, index as u64, phys)?;
                spec.sectors = spec.sectors.saturating_add(bs / 512);
            }
            self.inodes.insert(ino, spec);
        }

        let specs: Vec<(u32, InodeSpec)> =
            self.inodes.iter().map(|(k, v)| (*k, v.clone())).collect();
        for (ino, spec) in &specs {
            self.write_inode(*ino, spec)?;
        }

        self.write_group_descriptors()?;
        self.write_superblock();
        Ok(self.image)
    }

    fn write_group_descriptors(&mut self) -> Result<()> {
        let bs = self.config.block_size as usize;
        let gdt = if bs == 1024 { 2048 } else { bs };
        let ipg = self.config.inodes_per_group;
        let used_inodes = self.next_inode - 1;

        for (g, layout) in self.groups.clone().iter().enumerate() {
            let g32 = u32::try_from(g).context("group index")?;
            let first_ino = g32 * ipg + 1;
            let last_ino = first_ino + ipg - 1;
            let used_here = used_inodes.clamp(first_ino - 1, last_ino) - (first_ino - 1);
            let dirs_here = self
                .dirs
                .keys()
                .filter(|ino| (**ino - 1) / ipg == g32)
                .count();
            let free_blocks = if g == 0 {
                self.config
                    .blocks_per_group
                    .min(self.config.blocks_count)
                    .saturating_sub(self.next_block)
            } else {
                0
            };

            let off = gdt + g * EXT2_GROUP_DESC_SIZE;
            let raw = &mut self.image[off..off + EXT2_GROUP_DESC_SIZE];
            put_u32(raw, 0x00, layout.block_bitmap);
            put_u32(raw, 0x04, layout.inode_bitmap);
            put_u32(raw, 0x08, layout.inode_table);
            put_u16(raw, 0x0C, u16::try_from(free_blocks).unwrap_or(u16::MAX));
            put_u16(raw, 0x0E, u16::try_from(ipg - used_here).unwrap_or(u16::MAX));
            put_u16(raw, 0x10, u16::try_from(dirs_here).unwrap_or(u16::MAX));
        }
        Ok(())
    }

    fn write_superblock(&mut self) {
        let cfg = &self.config;
        let inodes_count = self.inodes_count();
        let sb = &mut self.image[EXT2_SUPERBLOCK_OFFSET..EXT2_SUPERBLOCK_OFFSET + 1024];
        put_u32(sb, 0x00, inodes_count);
        put_u32(sb, 0x04, cfg.blocks_count);
        put_u32(sb, 0x08, cfg.blocks_count / 20);
        put_u32(sb, 0x0C, cfg.blocks_count.saturating_sub(self.next_block));
        put_u32(sb, 0x10, inodes_count.saturating_sub(self.next_inode - 1));
        put_u32(sb, 0x14, u32::from(cfg.block_size == 1024));
        put_u32(sb, 0x18, cfg.block_size.trailing_zeros() - 10);
        put_u32(sb, 0x1C, cfg.block_size.trailing_zeros() - 10);
        put_u32(sb, 0x20, cfg.blocks_per_group);
        put_u32(sb, 0x24, cfg.blocks_per_group);
        put_u32(sb, 0x28, cfg.inodes_per_group);
        put_u16(sb, 0x36, 20);
        put_u16(sb, 0x38, EXT2_SUPER_MAGIC);
        put_u16(sb, 0x3A, cfg.state);
        put_u16(sb, 0x3C, 1);
        put_u32(sb, 0x4C, cfg.rev_level);
        put_u32(sb, 0x54, EXT2_GOOD_OLD_FIRST_INO);
        put_u16(sb, 0x58, cfg.inode_size);
        for (i, b) in sb[0x68..0x78].iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *b = 0xE2 ^ (i as u8);
            }
        }
        let name = cfg.volume_name.as_bytes();
        let n = name.len().min(16);
        sb[0x78..0x78 + n].copy_from_slice(&name[..n]);
        let mounted = cfg.last_mounted.as_bytes();
        let m = mounted.len().min(64);
        sb[0x88..0x88 + m].copy_from_slice(&mounted[..m]);
    }
}

/// Inode numbers of the entries in [`sample_volume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLayout {
    /// `/hello.txt`, one partial block.
    pub hello: u32,
    /// `/docs`.
    pub docs: u32,
    /// `/docs/readme.md`, three full blocks plus a tail.
    pub readme: u32,
    /// `/docs/hello`, relative symlink to `../hello.txt`.
    pub link: u32,
    /// `/sparse.bin`: block 0 data, block 1 hole, block 12 data (single indirect).
    pub sparse: u32,
    /// `/long-link`, symlink with a target stored in a data block.
    pub long_link: u32,
}

pub const SAMPLE_HELLO: &[u8] = b"hello, ext2\n";

/// Deterministic payload used for `/docs/readme.md`.
#[must_use]
pub fn sample_readme(block_size: u32) -> Vec<u8> {
    let len = block_size as usize * 3 + 100;
    (0..len)
        .map(|i| {
            #[allow(clippy::cast_possible_truncation)]
            let b = (i % 251) as u8;
            b
        })
        .collect()
}

/// Target of `/long-link` (longer than the inline limit).
#[must_use]
pub fn sample_long_target() -> Vec<u8> {
    let mut target = b"/docs/".to_vec();
    target.extend(std::iter::repeat_n(b'x', 70));
    target
}

/// A small, fully populated volume shared by conformance tests and benches.
pub fn sample_volume(block_size: u32) -> Result<(Vec<u8>, SampleLayout)> {
    let mut b = ImageBuilder::new(ImageConfig {
        volume_name: "sample".to_owned(),
        last_mounted: "/mnt/sample".to_owned(),
        ..ImageConfig::with_block_size(block_size)
    })?;
    let bs = block_size as usize;

    let hello = b.add_file(ROOT_INO, "hello.txt", SAMPLE_HELLO)?;
    let docs = b.mkdir(ROOT_INO, "docs")?;
    let readme = b.add_file(docs, "readme.md", &sample_readme(block_size))?;
    let link = b.add_symlink(docs, "hello", b"../hello.txt")?;
    b.add_unused_entry(docs, "deleted.tmp")?;

    let first = vec![0xA1_u8; bs];
    let last = vec![0xB2_u8; bs];
    let size = 13 * block_size as u64;
    let sparse = b.add_sparse_file(
        ROOT_INO,
        "sparse.bin",
        size,
        &[(0, first.as_slice()), (12, last.as_slice())],
    )?;
    let long_link = b.add_symlink(ROOT_INO, "long-link", &sample_long_target())?;

    let image = b.build()?;
    Ok((
        image,
        SampleLayout {
            hello,
            docs,
            readme,
            link,
            sparse,
            long_link,
        },
    ))
}
