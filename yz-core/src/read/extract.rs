use crate::codec::CodecId;
use crate::container::header::EntryType;
use crate::error::{Result, YzError};
use crate::read::stream::DecodeReader;
use crate::split::{ARCHIVE_EXT, MultipartReader};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    /// Must match the codec the archive was packed with.
    pub codec: CodecId,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ExtractSummary {
    pub archive: PathBuf,
    pub files: u64,
    pub dirs: u64,
    pub symlinks: u64,
    pub bytes_out: u64,
}

/// Resolves the head `.zip` file: `input` itself, or the first one found beneath it.
pub fn locate_archive(input: &Path) -> Result<PathBuf> {
    if input.is_file() {
        return Ok(input.to_path_buf());
    }
    if !input.exists() {
        return Err(YzError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input does not exist: {}", input.display()),
        )));
    }
    for e in walkdir::WalkDir::new(input).sort_by_file_name() {
        let e = e.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if e.file_type().is_file()
            && e.path().extension().is_some_and(|x| x == ARCHIVE_EXT)
        {
            return Ok(e.into_path());
        }
    }
    Err(YzError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no .{ARCHIVE_EXT} archive under {}", input.display()),
    )))
}

/// Opens the decode stream over every part of the archive headed by `archive`.
pub fn open_archive(archive: &Path, codec: CodecId) -> Result<DecodeReader<MultipartReader>> {
    DecodeReader::with_codec(MultipartReader::open(archive)?, codec)
}

fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);
    let clean = p.components().all(|c| matches!(c, Component::Normal(_)));
    if rel.is_empty() || !clean {
        return Err(YzError::format(format!("unsafe entry name: {rel}")));
    }
    Ok(root.join(p))
}

fn write_file(reader: &mut impl Read, out: &Path) -> Result<u64> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(out)?);
    let n = io::copy(reader, &mut w)?;
    w.flush()?;
    Ok(n)
}

#[cfg(unix)]
fn make_symlink(target: &str, at: &Path) -> Result<()> {
    if let Some(parent) = at.parent() {
        fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(target, at)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_symlink(target: &str, at: &Path) -> Result<()> {
    warn!(path = %at.display(), target, "symlinks unsupported here; skipping");
    Ok(())
}

/// Rebuilds the archived tree under `dest`. `input` is the `.zip` head file
/// or a directory holding one.
pub fn extract(input: &Path, dest: &Path, opts: Option<&ExtractOptions>) -> Result<ExtractSummary> {
    let codec = opts.map(|o| o.codec).unwrap_or_default();
    let archive = locate_archive(input)?;
    fs::create_dir_all(dest)?;

    let mut reader = open_archive(&archive, codec)?;
    let mut summary = ExtractSummary {
        archive: archive.clone(),
        ..Default::default()
    };

    while let Some(entry) = reader.next_entry()? {
        let out = safe_join(dest, &entry.name)?;
        match entry.kind {
            EntryType::Directory => {
                fs::create_dir_all(&out)?;
                summary.dirs += 1;
            }
            EntryType::File => {
                summary.bytes_out += write_file(&mut reader, &out)?;
                summary.files += 1;
            }
            EntryType::Symlink => {
                let mut target = String::new();
                reader
                    .read_to_string(&mut target)
                    .map_err(|e| match YzError::from(e) {
                        YzError::Io(io) if io.kind() == io::ErrorKind::InvalidData => {
                            YzError::format(format!("symlink target of {} is not UTF-8", entry.name))
                        }
                        other => other,
                    })?;
                make_symlink(&target, &out)?;
                summary.symlinks += 1;
            }
        }
        reader.close_entry()?;
    }

    if summary.files + summary.dirs + summary.symlinks == 0 {
        warn!(archive = %archive.display(), "archive held no entries");
    }
    info!(
        archive = %archive.display(),
        files = summary.files,
        dirs = summary.dirs,
        bytes = summary.bytes_out,
        "extract complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_join_rejects_escapes() {
        let root = Path::new("/dest");
        assert!(safe_join(root, "a/b.txt").is_ok());
        assert!(matches!(safe_join(root, "../x"), Err(YzError::Format(_))));
        assert!(matches!(safe_join(root, "/etc/passwd"), Err(YzError::Format(_))));
        assert!(matches!(safe_join(root, "a/../../x"), Err(YzError::Format(_))));
        assert!(matches!(safe_join(root, ""), Err(YzError::Format(_))));
    }
}
