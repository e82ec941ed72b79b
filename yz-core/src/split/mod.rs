//! Spreads one logical byte stream over size-bounded part files.
//!
//! The head file keeps the reserved `.zip` name; earlier parts trade the last
//! two characters of the extension for their index (`a.zip` -> `a.z0`, `a.z1`, ...).

use crate::error::{Result, YzError};
use std::path::{Path, PathBuf};

pub mod reader;
pub mod writer;

pub use reader::MultipartReader;
pub use writer::MultipartWriter;

pub const ARCHIVE_EXT: &str = "zip";

pub(crate) fn check_archive_path(path: &Path) -> Result<&str> {
    let s = path
        .to_str()
        .ok_or_else(|| YzError::usage(format!("archive path is not UTF-8: {}", path.display())))?;
    if s.is_empty() {
        return Err(YzError::usage("archive path is empty"));
    }
    if !s.ends_with(ARCHIVE_EXT) {
        return Err(YzError::usage(format!(
            "archive path must end with .{ARCHIVE_EXT}: {s}"
        )));
    }
    Ok(s)
}

/// Name of the indexed part `index` that sits beside `archive`.
pub fn part_path(archive: &Path, index: u32) -> Result<PathBuf> {
    let s = check_archive_path(archive)?;
    Ok(PathBuf::from(format!("{}{}", &s[..s.len() - 2], index)))
}

/// Every physical file of the archive headed by `archive`, in part order.
/// The head file itself is always last.
pub fn part_paths(archive: &Path) -> Result<Vec<PathBuf>> {
    check_archive_path(archive)?;
    let mut parts = Vec::new();
    for index in 0u32.. {
        let p = part_path(archive, index)?;
        if !p.is_file() {
            break;
        }
        parts.push(p);
    }
    if !archive.is_file() {
        return Err(YzError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("archive head not found: {}", archive.display()),
        )));
    }
    parts.push(archive.to_path_buf());
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_names_replace_extension_tail() {
        let head = Path::new("/tmp/out/archive.zip");
        assert_eq!(part_path(head, 0).unwrap(), Path::new("/tmp/out/archive.z0"));
        assert_eq!(part_path(head, 12).unwrap(), Path::new("/tmp/out/archive.z12"));
    }

    #[test]
    fn rejects_empty_and_foreign_paths() {
        assert!(matches!(part_path(Path::new(""), 0), Err(YzError::Usage(_))));
        assert!(matches!(part_path(Path::new("abc"), 0), Err(YzError::Usage(_))));
    }
}
