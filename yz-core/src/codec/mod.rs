use crate::error::{Result, YzError};
use crate::util::pushback::Unread;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum CodecId {
    #[default]
    Deflate = 0,
    Zstd = 1,
}

impl std::str::FromStr for CodecId {
    type Err = YzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "deflate" => Ok(CodecId::Deflate),
            "zstd" => Ok(CodecId::Zstd),
            other => Err(YzError::usage(format!("unknown codec: {other}"))),
        }
    }
}

/// Turns one chunk into one self-delimited compressed block.
/// Implementations keep no state between calls and are shared by every worker.
pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Reads exactly one block back out of a raw byte stream.
///
/// Raw bytes pulled from `src` beyond the end of the block must be handed back
/// through [`Unread::unread`] so the next call starts on the next block.
pub trait Decompressor: Send {
    fn id(&self) -> CodecId;
    fn decompress(&mut self, src: &mut dyn Unread) -> Result<Vec<u8>>;
}

pub fn compressor_for(id: CodecId) -> Box<dyn Compressor> {
    match id {
        CodecId::Deflate => Box::new(deflate::DeflateCompressor::default()),
        CodecId::Zstd => Box::new(zstdc::ZstdCompressor::default()),
    }
}

pub fn decompressor_for(id: CodecId) -> Result<Box<dyn Decompressor>> {
    match id {
        CodecId::Deflate => Ok(Box::new(deflate::DeflateDecompressor::new())),
        CodecId::Zstd => Ok(Box::new(zstdc::ZstdDecompressor::new()?)),
    }
}

pub mod deflate;
pub mod zstdc;
