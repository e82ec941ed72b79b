use crate::codec::CodecId;
use crate::container::header::Entry;
use crate::error::Result;
use crate::read::extract::{locate_archive, open_archive};
use std::path::Path;

/// Every entry in archive order, without touching the filesystem beyond the parts.
pub fn list(input: &Path, codec: CodecId) -> Result<Vec<Entry>> {
    let archive = locate_archive(input)?;
    open_archive(&archive, codec)?.entries()
}
