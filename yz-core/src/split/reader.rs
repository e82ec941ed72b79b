use super::part_paths;
use crate::container::part::PartHeader;
use crate::error::{Result, YzError};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Stitches the parts of a split archive back into one `Read` stream,
/// starting from the head (`.zip`) path.
pub struct MultipartReader {
    pending: VecDeque<PathBuf>,
    next_index: u32,
    cur: Option<BufReader<File>>,
}

impl MultipartReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let parts = part_paths(path.as_ref())?;
        let mut r = Self {
            pending: parts.into(),
            next_index: 0,
            cur: None,
        };
        r.advance()?;
        Ok(r)
    }

    /// Opens the next part and checks its header. `false` once the head part is done.
    fn advance(&mut self) -> Result<bool> {
        let Some(p) = self.pending.pop_front() else {
            self.cur = None;
            return Ok(false);
        };
        let mut f = BufReader::new(File::open(&p)?);
        let h = PartHeader::read_from(&mut f)?;
        if h.index != self.next_index {
            return Err(YzError::format(format!(
                "{}: part index {} where {} was expected",
                p.display(),
                h.index,
                self.next_index
            )));
        }
        self.next_index += 1;
        self.cur = Some(f);
        Ok(true)
    }
}

impl Read for MultipartReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let Some(cur) = self.cur.as_mut() else {
                return Ok(0);
            };
            let n = cur.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            if !self.advance()? {
                return Ok(0);
            }
        }
    }
}
