//! Block headers. Every block opens with a little-endian 64-bit signature;
//! a FILE header follows it with the entry's metadata. Payload is whatever
//! remains of the decompressed block after the header.
//!
//! ```text
//! FILE   sig(8) | name_len(4) | name(name_len) | type(2) | size(8)
//! CHUNK  sig(8)
//! END    sig(8) | padding(1024)
//! ```

use crate::error::{Result, YzError};
use serde::Serialize;

#[repr(u64)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signature {
    File = 0x0_2012_4b50,
    Chunk = 0x0_8074_2b50,
    End = 0x1_0808_4b50,
    Part = 0x1_3213_2123,
}

impl Signature {
    pub const LEN: usize = 8;

    pub fn from_u64(v: u64) -> Option<Self> {
        match v {
            x if x == Signature::File as u64 => Some(Signature::File),
            x if x == Signature::Chunk as u64 => Some(Signature::Chunk),
            x if x == Signature::End as u64 => Some(Signature::End),
            x if x == Signature::Part as u64 => Some(Signature::Part),
            _ => None,
        }
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        (self as u64).to_le_bytes()
    }
}

pub const END_PADDING_LEN: usize = 1024;
/// A CHUNK header on its own: the shortest buffer that still carries no payload.
pub const CHUNK_HEADER_LEN: usize = Signature::LEN;
const FILE_FIXED_LEN: usize = Signature::LEN + 4 + 2 + 8;

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EntryType {
    File = 0,
    Directory = 1,
    Symlink = 2,
}

impl EntryType {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(EntryType::File),
            1 => Some(EntryType::Directory),
            2 => Some(EntryType::Symlink),
            _ => None,
        }
    }
}

/// One archived filesystem object. `size` is what the producer declared and
/// is never checked against the bytes that follow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub kind: EntryType,
    pub size: u64,
}

impl Entry {
    pub fn new(name: impl Into<String>, kind: EntryType, size: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
        }
    }

    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self::new(name, EntryType::File, size)
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self::new(name, EntryType::Directory, 0)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryType::Directory
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Header {
    File(Entry),
    Chunk,
    End,
}

pub fn write_file_header(buf: &mut Vec<u8>, entry: &Entry) {
    let name = entry.name.as_bytes();
    buf.extend_from_slice(&Signature::File.to_le_bytes());
    buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(&(entry.kind as u16).to_le_bytes());
    buf.extend_from_slice(&entry.size.to_le_bytes());
}

pub fn write_chunk_header(buf: &mut Vec<u8>) {
    buf.extend_from_slice(&Signature::Chunk.to_le_bytes());
}

pub fn write_end_header(buf: &mut Vec<u8>, padding: &[u8; END_PADDING_LEN]) {
    buf.extend_from_slice(&Signature::End.to_le_bytes());
    buf.extend_from_slice(padding);
}

#[inline]
fn le16(x: &[u8]) -> u16 {
    u16::from_le_bytes([x[0], x[1]])
}

#[inline]
fn le32(x: &[u8]) -> u32 {
    u32::from_le_bytes([x[0], x[1], x[2], x[3]])
}

#[inline]
pub(crate) fn le64(x: &[u8]) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&x[..8]);
    u64::from_le_bytes(b)
}

/// Parses the header at the front of a decompressed block.
/// Returns the header and the offset where payload starts.
pub fn read_header(block: &[u8]) -> Result<(Header, usize)> {
    if block.len() < Signature::LEN {
        return Err(YzError::format(format!(
            "block too short for a signature: {} bytes",
            block.len()
        )));
    }
    let raw = le64(block);
    match Signature::from_u64(raw) {
        Some(Signature::Chunk) => Ok((Header::Chunk, Signature::LEN)),
        Some(Signature::End) => Ok((Header::End, Signature::LEN)),
        Some(Signature::File) => read_file_header(block),
        Some(Signature::Part) | None => Err(YzError::format(format!(
            "unexpected block signature 0x{raw:x}"
        ))),
    }
}

fn read_file_header(block: &[u8]) -> Result<(Header, usize)> {
    if block.len() < FILE_FIXED_LEN {
        return Err(YzError::format("truncated FILE header"));
    }
    let name_len = le32(&block[8..12]) as usize;
    let end = FILE_FIXED_LEN
        .checked_add(name_len)
        .filter(|&e| e <= block.len())
        .ok_or_else(|| YzError::format(format!("FILE header name length {name_len} overruns block")))?;

    let name_end = 12 + name_len;
    let name = std::str::from_utf8(&block[12..name_end])
        .map_err(|e| YzError::format(format!("entry name is not UTF-8: {e}")))?
        .to_string();
    let code = le16(&block[name_end..name_end + 2]);
    let kind = EntryType::from_u16(code)
        .ok_or_else(|| YzError::format(format!("unknown entry type code {code}")))?;
    let size = le64(&block[name_end + 2..end]);

    Ok((Header::File(Entry { name, kind, size }), end))
}
