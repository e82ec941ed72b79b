use super::{CodecId, Compressor, Decompressor};
use crate::error::{Result, YzError};
use crate::util::pushback::Unread;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

pub const DEFAULT_LEVEL: u32 = 5;
const IN_BUF: usize = 8 * 1024;
const OUT_BUF: usize = 32 * 1024;

/// Raw deflate, one finished stream per block.
pub struct DeflateCompressor {
    level: Compression,
}

impl DeflateCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for DeflateCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl Compressor for DeflateCompressor {
    fn id(&self) -> CodecId {
        CodecId::Deflate
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let mut enc = DeflateEncoder::new(Vec::with_capacity(data.len() / 2 + 64), self.level);
        enc.write_all(data)?;
        Ok(enc.finish()?)
    }
}

pub struct DeflateDecompressor {
    inflater: Decompress,
    input: Box<[u8]>,
    scratch: Box<[u8]>,
}

impl DeflateDecompressor {
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(false),
            input: vec![0u8; IN_BUF].into_boxed_slice(),
            scratch: vec![0u8; OUT_BUF].into_boxed_slice(),
        }
    }
}

impl Default for DeflateDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for DeflateDecompressor {
    fn id(&self) -> CodecId {
        CodecId::Deflate
    }

    fn decompress(&mut self, src: &mut dyn Unread) -> Result<Vec<u8>> {
        self.inflater.reset(false);
        let mut out = Vec::new();
        let (mut pos, mut len) = (0usize, 0usize);
        // A full scratch buffer may leave output queued in the decoder.
        let mut full = false;

        loop {
            if pos == len && !full {
                len = src.read(&mut self.input)?;
                pos = 0;
                if len == 0 {
                    return Err(YzError::format("unexpected end of deflate stream"));
                }
            }

            let in_before = self.inflater.total_in();
            let out_before = self.inflater.total_out();
            let status = self
                .inflater
                .decompress(&self.input[pos..len], &mut self.scratch, FlushDecompress::None)
                .map_err(|e| YzError::format(format!("corrupt deflate block: {e}")))?;
            let consumed = (self.inflater.total_in() - in_before) as usize;
            let produced = (self.inflater.total_out() - out_before) as usize;
            pos += consumed;
            out.extend_from_slice(&self.scratch[..produced]);
            full = produced == self.scratch.len();

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if consumed == 0 && produced == 0 && pos < len {
                        return Err(YzError::format("deflate decoder made no progress"));
                    }
                }
            }
        }

        // Whatever followed the final deflate block belongs to the next one.
        if pos < len {
            src.unread(&self.input[pos..len]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::pushback::PushbackReader;
    use std::io::Read;

    #[test]
    fn back_to_back_blocks_split_cleanly() {
        let c = DeflateCompressor::default();
        let a: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let b = b"second block".to_vec();
        let mut stream = c.compress(&a).unwrap();
        stream.extend(c.compress(&b).unwrap());
        stream.extend_from_slice(b"tail");

        let mut src = PushbackReader::new(&stream[..]);
        let mut d = DeflateDecompressor::new();
        assert_eq!(d.decompress(&mut src).unwrap(), a);
        assert_eq!(d.decompress(&mut src).unwrap(), b);

        let mut rest = Vec::new();
        src.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"tail");
    }

    #[test]
    fn truncated_block_is_a_format_error() {
        let c = DeflateCompressor::default();
        let block = c.compress(&vec![7u8; 4096]).unwrap();
        let mut src = PushbackReader::new(&block[..block.len() / 2]);
        let err = DeflateDecompressor::new().decompress(&mut src).unwrap_err();
        assert!(matches!(err, YzError::Format(_)));
    }
}
