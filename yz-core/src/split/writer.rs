use super::{check_archive_path, part_path};
use crate::container::part::PartHeader;
use crate::error::{Result, YzError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `Write` sink that fills the head path up to `limit` payload bytes, then
/// renames it to the next indexed part and starts over.
/// Part headers do not count towards `limit`.
pub struct MultipartWriter {
    path: PathBuf,
    limit: u64,
    index: u32,
    written: u64,
    out: Option<BufWriter<File>>,
}

impl MultipartWriter {
    pub fn create(path: impl AsRef<Path>, limit: u64) -> Result<Self> {
        let path = path.as_ref();
        check_archive_path(path)?;
        if limit == 0 {
            return Err(YzError::usage("part size limit must be positive"));
        }
        let mut w = Self {
            path: path.to_path_buf(),
            limit,
            index: 0,
            written: 0,
            out: None,
        };
        w.open_part()?;
        Ok(w)
    }

    /// Number of part files produced so far, the open one included.
    pub fn parts(&self) -> u32 {
        self.index + 1
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_part(&mut self) -> Result<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        PartHeader { index: self.index }.write_to(&mut out)?;
        self.out = Some(out);
        self.written = 0;
        Ok(())
    }

    fn current(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        self.out
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "multipart writer closed"))
    }

    fn roll_over(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        let target = part_path(&self.path, self.index)?;
        fs::rename(&self.path, &target)?;
        debug!(part = self.index, path = %target.display(), "part sealed");
        self.index += 1;
        self.open_part()
    }

    /// Flushes the open part. It stays under the reserved name.
    pub fn close(mut self) -> Result<u32> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(self.parts())
    }
}

impl Write for MultipartWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut rest = buf;
        loop {
            let room = usize::try_from(self.limit - self.written).unwrap_or(usize::MAX);
            if rest.len() <= room {
                self.current()?.write_all(rest)?;
                self.written += rest.len() as u64;
                return Ok(buf.len());
            }
            let (now, later) = rest.split_at(room);
            self.current()?.write_all(now)?;
            self.roll_over()?;
            rest = later;
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.current()?.flush()
    }
}

impl Drop for MultipartWriter {
    fn drop(&mut self) {
        if let Some(mut out) = self.out.take() {
            let _ = out.flush();
        }
    }
}
