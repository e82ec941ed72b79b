//! Pack/extract round trips over real directory trees.

use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use walkdir::WalkDir;
use yz_core::{
    CodecId, EncoderOptions, EntryType, PackOptions, Trailer, extract, list, pack, part_paths,
};

// ---------- helpers ----------

fn write_file(path: &Path, data: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(data).unwrap();
}

/// A tree with empty files, empty dirs, incompressible and compressible data.
fn build_tree(root: &Path, rng: &mut StdRng) {
    let mut noise = vec![0u8; 300 * 1024];
    rng.fill_bytes(&mut noise);
    write_file(&root.join("a/b/noise.bin"), &noise);

    let text: String = (0..5000).map(|i| format!("line {i}\n")).collect();
    write_file(&root.join("a/text.txt"), text.as_bytes());

    write_file(&root.join("empty.txt"), b"");
    write_file(&root.join("z/tiny"), b"x");
    fs::create_dir_all(root.join("emptydir")).unwrap();
    fs::create_dir_all(root.join("a/c/deeper")).unwrap();

    for i in 0..rng.gen_range(3..8) {
        let len = rng.gen_range(0..10_000);
        let mut buf = vec![0u8; len];
        rng.fill_bytes(&mut buf);
        write_file(&root.join(format!("many/f{i:02}.dat")), &buf);
    }
}

/// Relative path -> file bytes (None for directories).
fn snapshot(root: &Path) -> Vec<(PathBuf, Option<Vec<u8>>)> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            let body = e.file_type().is_file().then(|| fs::read(e.path()).unwrap());
            (rel, body)
        })
        .collect()
}

fn opts(chunk_size: usize, part_size_limit: u64, workers: usize, codec: CodecId) -> PackOptions {
    PackOptions {
        part_size_limit,
        codec,
        encoder: EncoderOptions {
            chunk_size,
            workers,
            ..Default::default()
        },
    }
}

fn roundtrip(src: &Path, o: &PackOptions) {
    let out = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let summary = pack(src, out.path(), Some(o)).unwrap();
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.parts as usize, part_paths(&summary.archive).unwrap().len());

    let ex = extract(&summary.archive, dest.path(), Some(&yz_core::ExtractOptions { codec: o.codec }))
        .unwrap();
    assert_eq!(ex.files + ex.dirs + ex.symlinks, summary.entries);
    assert_eq!(snapshot(src), snapshot(dest.path()));
}

// ---------- tests ----------

#[test]
fn tree_survives_across_chunk_and_part_sizes() {
    let mut rng = StdRng::seed_from_u64(7);
    let src = tempdir().unwrap();
    build_tree(src.path(), &mut rng);

    for (chunk, part) in [(2048, 1000), (4096, 64 * 1024), (128 * 1024, 100 * 1024 * 1024)] {
        for workers in [0, 1, 4] {
            roundtrip(src.path(), &opts(chunk, part, workers, CodecId::Deflate));
        }
    }
}

#[test]
fn zstd_tree_round_trip() {
    let mut rng = StdRng::seed_from_u64(11);
    let src = tempdir().unwrap();
    build_tree(src.path(), &mut rng);
    roundtrip(src.path(), &opts(8192, 50_000, 3, CodecId::Zstd));
}

#[test]
fn directory_only_tree() {
    let src = tempdir().unwrap();
    fs::create_dir_all(src.path().join("x/y/z")).unwrap();
    fs::create_dir_all(src.path().join("w")).unwrap();
    roundtrip(src.path(), &PackOptions::default());

    let out = tempdir().unwrap();
    let s = pack(src.path(), out.path(), None).unwrap();
    let entries = list(&s.archive, CodecId::Deflate).unwrap();
    assert!(entries.iter().all(|e| e.kind == EntryType::Directory && e.size == 0));
    assert_eq!(entries.len(), 4);
}

#[test]
fn list_follows_traversal_order() {
    let src = tempdir().unwrap();
    write_file(&src.path().join("b.txt"), b"bbb");
    write_file(&src.path().join("a/inner.txt"), b"inner");
    write_file(&src.path().join("c"), b"");

    let out = tempdir().unwrap();
    let s = pack(src.path(), out.path(), None).unwrap();
    let got: Vec<_> = list(&s.archive, CodecId::Deflate)
        .unwrap()
        .into_iter()
        .map(|e| (e.name, e.kind, e.size))
        .collect();
    assert_eq!(
        got,
        vec![
            ("a".to_string(), EntryType::Directory, 0),
            ("a/inner.txt".to_string(), EntryType::File, 5),
            ("b.txt".to_string(), EntryType::File, 3),
            ("c".to_string(), EntryType::File, 0),
        ]
    );
}

#[test]
fn extract_and_list_accept_the_output_directory() {
    let src = tempdir().unwrap();
    write_file(&src.path().join("only.txt"), b"hello");
    let out = tempdir().unwrap();
    pack(src.path(), out.path(), Some(&opts(2048, 10, 2, CodecId::Deflate))).unwrap();

    let dest = tempdir().unwrap();
    extract(out.path(), dest.path(), None).unwrap();
    assert_eq!(fs::read(dest.path().join("only.txt")).unwrap(), b"hello");
    assert_eq!(list(out.path(), CodecId::Deflate).unwrap().len(), 1);
}

#[test]
fn random_trailer_does_not_affect_contents() {
    let mut rng = StdRng::seed_from_u64(3);
    let src = tempdir().unwrap();
    build_tree(src.path(), &mut rng);
    let mut o = opts(4096, 1 << 20, 2, CodecId::Deflate);
    o.encoder.trailer = Trailer::Random;
    roundtrip(src.path(), &o);
}

#[cfg(unix)]
#[test]
fn symlinks_are_restored_not_followed() {
    let src = tempdir().unwrap();
    write_file(&src.path().join("real/data.txt"), b"payload");
    std::os::unix::fs::symlink("real/data.txt", src.path().join("link")).unwrap();

    let out = tempdir().unwrap();
    let s = pack(src.path(), out.path(), None).unwrap();
    let link = list(&s.archive, CodecId::Deflate)
        .unwrap()
        .into_iter()
        .find(|e| e.name == "link")
        .unwrap();
    assert_eq!(link.kind, EntryType::Symlink);

    let dest = tempdir().unwrap();
    let ex = extract(&s.archive, dest.path(), None).unwrap();
    assert_eq!(ex.symlinks, 1);
    let restored = dest.path().join("link");
    assert!(fs::symlink_metadata(&restored).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&restored).unwrap(), Path::new("real/data.txt"));
    assert_eq!(fs::read(&restored).unwrap(), b"payload");
}

#[test]
fn missing_input_directory_is_io_error() {
    let out = tempdir().unwrap();
    let err = pack(&out.path().join("nope"), out.path(), None).unwrap_err();
    assert!(matches!(err, yz_core::YzError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
}

#[test]
fn sibling_files_extract_in_sequence() {
    let src = tempdir().unwrap();
    write_file(&src.path().join("a.txt"), b"hello");
    write_file(&src.path().join("b.txt"), b"world");
    write_file(&src.path().join("c.txt"), b"");

    let out = tempdir().unwrap();
    let s = pack(src.path(), out.path(), None).unwrap();
    let dest = tempdir().unwrap();
    let ex = extract(&s.archive, dest.path(), None).unwrap();

    assert_eq!(ex.files, 3);
    assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(dest.path().join("b.txt")).unwrap(), b"world");
    assert!(fs::read(dest.path().join("c.txt")).unwrap().is_empty());
}
