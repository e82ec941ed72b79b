use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

use yz_core::error::{Result, YzError};
use yz_core::read::extract::locate_archive;
use yz_core::{
    CodecId, EncoderOptions, EntryType, ExtractOptions, PackOptions, Trailer, extract, list, pack,
    part_paths,
};

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)
        .map_err(|e| YzError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
    println!("{s}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_pack(
    input: PathBuf,
    output: PathBuf,
    part_size_mb: u64,
    chunk_size: usize,
    workers: usize,
    codec: CodecId,
    random_trailer: bool,
    json: bool,
) -> Result<()> {
    let part_size_limit = part_size_mb
        .checked_mul(1024 * 1024)
        .filter(|&n| n > 0)
        .ok_or_else(|| YzError::usage(format!("invalid part size: {part_size_mb} MiB")))?;
    let opts = PackOptions {
        part_size_limit,
        codec,
        encoder: EncoderOptions {
            chunk_size,
            workers,
            trailer: if random_trailer {
                Trailer::Random
            } else {
                Trailer::Zeroed
            },
            ..Default::default()
        },
    };
    let summary = pack(&input, &output, Some(&opts))?;
    if json {
        print_json(&summary)?;
    } else {
        info!(
            archive = %summary.archive.display(),
            entries = summary.entries,
            parts = summary.parts,
            skipped = summary.skipped,
            "packed"
        );
    }
    Ok(())
}

pub fn handle_extract(archive: PathBuf, dest: PathBuf, codec: CodecId) -> Result<()> {
    let summary = extract(&archive, &dest, Some(&ExtractOptions { codec }))?;
    info!(
        archive = %summary.archive.display(),
        dest = %dest.display(),
        files = summary.files,
        dirs = summary.dirs,
        "extracted"
    );
    Ok(())
}

pub fn handle_list(archive: PathBuf, codec: CodecId, json: bool) -> Result<()> {
    let entries = list(&archive, codec)?;
    if json {
        return print_json(&entries);
    }
    let mut out = io::stdout().lock();
    for e in entries {
        let tag = match e.kind {
            EntryType::File => 'f',
            EntryType::Directory => 'd',
            EntryType::Symlink => 'l',
        };
        writeln!(out, "{tag} {:>12}  {}", e.size, e.name)?;
    }
    Ok(())
}

pub fn handle_parts(archive: PathBuf) -> Result<()> {
    let head = locate_archive(&archive)?;
    let mut out = io::stdout().lock();
    for p in part_paths(&head)? {
        writeln!(out, "{}", p.display())?;
    }
    Ok(())
}
