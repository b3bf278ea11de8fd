#![forbid(unsafe_code)]

use e2fs::{InodeNumber, MemByteDevice, OpenOptions, Volume};
use e2fs_harness::{load_sparse_fixture, validate_ext2_fixture};
use std::path::Path;

fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("workspace root")
        .join("conformance")
        .join("fixtures")
        .join(name)
}

fn open_fixture(name: &str) -> Volume {
    let image = load_sparse_fixture(&fixture_path(name)).expect("load fixture");
    Volume::from_device(
        Box::new(MemByteDevice::from_vec(image)),
        &OpenOptions::default(),
    )
    .expect("open fixture volume")
}

#[test]
fn minimal_volume_superblock_conforms() {
    let sb = validate_ext2_fixture(&fixture_path("ext2_minimal_volume.json"))
        .expect("ext2 minimal fixture");
    sb.validate_geometry().expect("geometry");
    assert_eq!(sb.block_size.get(), 1024);
    assert_eq!(sb.blocks_count, 64);
    assert_eq!(sb.inodes_count, 16);
    assert_eq!(sb.inodes_per_group, 16);
    assert_eq!(sb.first_data_block, 1);
    assert_eq!(sb.revision(), (1, 0));
    assert_eq!(sb.volume_name, "fixture");
    assert_eq!(sb.last_mounted, "/mnt/fixture");
    assert!(sb.is_clean());
}

#[test]
fn minimal_volume_metadata() {
    let vol = open_fixture("ext2_minimal_volume.json");
    let info = vol.info();
    assert_eq!(info.total_bytes, 64 * 1024);
    assert_eq!(info.groups_count, 1);
    assert_eq!(info.groups.len(), 1);
    assert_eq!(info.groups[0].inode_table, 5);
    assert_eq!(info.groups[0].used_dirs, 2);
    assert_eq!(info.groups[0].free_inodes, 1);
    assert_eq!(info.free_blocks_count, 51);
}

#[test]
fn minimal_volume_tree() {
    let vol = open_fixture("ext2_minimal_volume.json");
    let root = vol.root_inode().expect("root");
    let names: Vec<String> = vol
        .read_dir(&root)
        .expect("root listing")
        .iter()
        .map(e2fs::Ext2DirEntry::name_str)
        .collect();
    assert_eq!(names, [".", "..", "hello.txt", "data", "link"]);

    let (ino, hello) = vol.resolve_path("/hello.txt").unwrap().expect("hello.txt");
    assert_eq!(ino, InodeNumber(12));
    assert_eq!(vol.read_file(&hello).unwrap(), b"hello from a fixture\n");
}

#[test]
fn minimal_volume_sparse_file() {
    let vol = open_fixture("ext2_minimal_volume.json");
    let (_, notes) = vol.resolve_path("/data/notes.txt").unwrap().expect("notes");
    assert_eq!(vol.file_size(&notes), 13 * 1024);

    let data = vol.read_file(&notes).unwrap();
    assert!(data[..1024].iter().all(|b| *b == b'N'));
    assert!(data[1024..12 * 1024].iter().all(|b| *b == 0));
    assert!(data[12 * 1024..].iter().all(|b| *b == b'Z'));

    let mapped = vol.mapped_blocks(&notes, 64).unwrap();
    let pairs: Vec<(u64, u32)> = mapped.iter().map(|(i, b)| (*i, b.0)).collect();
    assert_eq!(pairs, [(0, 10), (12, 12)]);
}

#[test]
fn minimal_volume_symlink() {
    let vol = open_fixture("ext2_minimal_volume.json");
    let (_, link) = vol.resolve_path("/link").unwrap().expect("link");
    assert!(link.is_fast_symlink());
    assert_eq!(vol.read_symlink(&link).unwrap(), b"data/notes.txt");

    let (ino, _) = vol.resolve_path_follow("/link").unwrap().expect("followed");
    assert_eq!(ino, InodeNumber(15));
}
