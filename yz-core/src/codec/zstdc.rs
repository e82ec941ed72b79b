use super::{CodecId, Compressor, Decompressor};
use crate::error::{Result, YzError};
use crate::util::pushback::Unread;
use zstd::stream::raw::{Decoder, InBuffer, Operation, OutBuffer};

pub const DEFAULT_LEVEL: i32 = 3;
const IN_BUF: usize = 8 * 1024;
const OUT_BUF: usize = 64 * 1024;

/// One zstd frame per block.
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn new(level: i32) -> Self {
        Self {
            level: level.max(1),
        }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl Compressor for ZstdCompressor {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(data, self.level).map_err(|e| YzError::Codec(e.to_string()))
    }
}

pub struct ZstdDecompressor {
    dec: Decoder<'static>,
    input: Box<[u8]>,
    scratch: Box<[u8]>,
}

impl ZstdDecompressor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dec: Decoder::new()?,
            input: vec![0u8; IN_BUF].into_boxed_slice(),
            scratch: vec![0u8; OUT_BUF].into_boxed_slice(),
        })
    }
}

impl Decompressor for ZstdDecompressor {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn decompress(&mut self, src: &mut dyn Unread) -> Result<Vec<u8>> {
        self.dec.reinit()?;
        let mut out = Vec::new();
        let (mut pos, mut len) = (0usize, 0usize);
        // A full scratch buffer may leave output queued in the decoder.
        let mut full = false;

        loop {
            if pos == len && !full {
                len = src.read(&mut self.input)?;
                pos = 0;
                if len == 0 {
                    return Err(YzError::format("unexpected end of zstd stream"));
                }
            }

            let mut inb = InBuffer::around(&self.input[pos..len]);
            let mut outb = OutBuffer::around(&mut self.scratch[..]);
            let hint = self
                .dec
                .run(&mut inb, &mut outb)
                .map_err(|e| YzError::format(format!("corrupt zstd block: {e}")))?;
            let consumed = inb.pos();
            let produced = outb.pos();
            pos += consumed;
            out.extend_from_slice(&self.scratch[..produced]);
            full = produced == self.scratch.len();

            // A zero hint means the frame is decoded and fully flushed.
            if hint == 0 {
                break;
            }
        }

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

    #[test]
    fn frames_resynchronise_after_pushback() {
        let c = ZstdCompressor::default();
        let blocks: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 10_000 + i as usize]).collect();
        let mut stream = Vec::new();
        for b in &blocks {
            stream.extend(c.compress(b).unwrap());
        }
        let mut src = PushbackReader::new(&stream[..]);
        let mut d = ZstdDecompressor::new().unwrap();
        for b in &blocks {
            assert_eq!(&d.decompress(&mut src).unwrap(), b);
        }
    }
}
