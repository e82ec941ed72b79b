use crate::codec::CodecId;
use crate::container::header::{Entry, EntryType};
use crate::error::{Result, YzError};
use crate::pack::pipeline::{EncoderOptions, ParallelEncoder};
use crate::split::{ARCHIVE_EXT, MultipartWriter};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DEFAULT_PART_SIZE: u64 = 100 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct PackOptions {
    /// Payload bytes per part file, headers excluded.
    pub part_size_limit: u64,
    pub codec: CodecId,
    pub encoder: EncoderOptions,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            part_size_limit: DEFAULT_PART_SIZE,
            codec: CodecId::Deflate,
            encoder: EncoderOptions::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PackSummary {
    pub archive: PathBuf,
    pub entries: u64,
    /// Paths that vanished between listing and reading.
    pub skipped: u64,
    pub bytes_in: u64,
    pub units: u64,
    pub parts: u32,
}

fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| YzError::usage(format!("{} is outside {}", path.display(), root.display())))?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

fn is_vanished(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound
}

/// Archives one path. `Ok(None)` when the path disappeared before it could be read.
fn add_path<W: io::Write + Send + 'static>(
    enc: &mut ParallelEncoder<W>,
    name: String,
    path: &Path,
    kind: EntryType,
) -> Result<Option<u64>> {
    match kind {
        EntryType::Directory => {
            enc.put_entry(Entry::dir(name))?;
            enc.close_entry()?;
            Ok(Some(0))
        }
        EntryType::Symlink => {
            let target = match fs::read_link(path) {
                Ok(t) => t,
                Err(e) if is_vanished(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let bytes = target.to_string_lossy().into_owned().into_bytes();
            enc.put_entry(Entry::new(name, EntryType::Symlink, bytes.len() as u64))?;
            enc.write_data(&bytes)?;
            enc.close_entry()?;
            Ok(Some(bytes.len() as u64))
        }
        EntryType::File => {
            // Open before framing so a vanished file leaves no header behind.
            let f = match File::open(path) {
                Ok(f) => f,
                Err(e) if is_vanished(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let size = f.metadata()?.len();
            enc.put_entry(Entry::file(name, size))?;
            let copied = io::copy(&mut BufReader::new(f), enc)?;
            enc.close_entry()?;
            Ok(Some(copied))
        }
    }
}

/// Archives `input_dir` into `<output_dir>/<input_dir name>.zip`, split into parts
/// of at most `part_size_limit` payload bytes.
pub fn pack(input_dir: &Path, output_dir: &Path, opts: Option<&PackOptions>) -> Result<PackSummary> {
    let default_opts = PackOptions::default();
    let opts = opts.unwrap_or(&default_opts);

    if !input_dir.is_dir() {
        return Err(YzError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input directory does not exist: {}", input_dir.display()),
        )));
    }
    fs::create_dir_all(output_dir)?;

    let stem = input_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let archive = output_dir.join(format!("{stem}.{ARCHIVE_EXT}"));

    let sink = MultipartWriter::create(&archive, opts.part_size_limit)?;
    let mut enc = ParallelEncoder::with_codec(sink, opts.codec, opts.encoder.clone())?;
    let mut summary = PackSummary {
        archive: archive.clone(),
        ..Default::default()
    };

    for e in WalkDir::new(input_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let e = match e {
            Ok(e) => e,
            Err(err) if err.io_error().is_some_and(is_vanished) => {
                warn!(error = %err, "entry vanished during traversal; skipping");
                summary.skipped += 1;
                continue;
            }
            Err(err) => return Err(io::Error::new(io::ErrorKind::Other, err).into()),
        };
        let ft = e.file_type();
        let kind = if ft.is_symlink() {
            EntryType::Symlink
        } else if ft.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        };
        let name = entry_name(input_dir, e.path())?;
        match add_path(&mut enc, name, e.path(), kind)? {
            Some(n) => {
                summary.entries += 1;
                summary.bytes_in += n;
            }
            None => {
                warn!(path = %e.path().display(), "entry vanished during traversal; skipping");
                summary.skipped += 1;
            }
        }
    }

    let sink = enc.finish()?;
    summary.units = enc.units_submitted();
    summary.parts = sink.close()?;

    info!(
        archive = %archive.display(),
        entries = summary.entries,
        skipped = summary.skipped,
        parts = summary.parts,
        "pack complete"
    );
    Ok(summary)
}
