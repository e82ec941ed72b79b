use crate::codec::{CodecId, Decompressor, decompressor_for};
use crate::container::header::{Entry, Header, read_header};
use crate::error::{Result, YzError};
use crate::util::pushback::PushbackReader;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// A FILE header has been read; its entry waits for `next_entry`.
    AwaitingEntry,
    EntryOpen,
    Done,
}

/// Pulls blocks one at a time out of a compressed stream and exposes the
/// entries they carry, in archive order.
///
/// `read` on an open entry returns its payload; it returns `Ok(0)` once the
/// next block starts another entry or ends the archive. Reads outside an open
/// entry (before the first `next_entry`, after the payload ran out, or after
/// the END block) also return `Ok(0)` rather than failing.
pub struct DecodeReader<R: Read> {
    src: PushbackReader<R>,
    codec: Box<dyn Decompressor>,
    state: DecodeState,
    pending: Option<Entry>,
    /// The entry handed out last was read to its end; closing it is a no-op.
    drained: bool,
    block: Vec<u8>,
    pos: usize,
    blocks: u64,
}

impl<R: Read> DecodeReader<R> {
    pub fn with_codec(src: R, codec: CodecId) -> Result<Self> {
        Self::new(src, decompressor_for(codec)?)
    }

    /// Decodes the first block, which must be a FILE header.
    pub fn new(src: R, codec: Box<dyn Decompressor>) -> Result<Self> {
        let mut r = Self {
            src: PushbackReader::new(src),
            codec,
            state: DecodeState::AwaitingEntry,
            pending: None,
            drained: false,
            block: Vec::new(),
            pos: 0,
            blocks: 0,
        };
        match r.load_block()? {
            Header::File(entry) => {
                r.pending = Some(entry);
                Ok(r)
            }
            other => Err(YzError::format(format!(
                "archive must start with a FILE block, found {other:?}"
            ))),
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Blocks decoded so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks
    }

    fn load_block(&mut self) -> Result<Header> {
        self.block = self.codec.decompress(&mut self.src).map_err(|e| match e {
            YzError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                YzError::format("archive ended before its END block")
            }
            other => other,
        })?;
        self.blocks += 1;
        let (header, payload_at) = read_header(&self.block)?;
        self.pos = payload_at;
        Ok(header)
    }

    /// Returns the next entry, skipping whatever is left of the open one.
    /// `None` once the END block has been seen.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        if self.state == DecodeState::EntryOpen {
            self.close_entry()?;
        }
        match self.state {
            DecodeState::Done => Ok(None),
            _ => {
                let entry = self
                    .pending
                    .take()
                    .ok_or_else(|| YzError::format("no pending entry"))?;
                self.state = DecodeState::EntryOpen;
                self.drained = false;
                Ok(Some(entry))
            }
        }
    }

    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state != DecodeState::EntryOpen || buf.is_empty() {
            return Ok(0);
        }
        loop {
            let remain = self.block.len() - self.pos;
            if remain > 0 {
                let n = remain.min(buf.len());
                buf[..n].copy_from_slice(&self.block[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if !self.advance()? {
                return Ok(0);
            }
        }
    }

    /// Moves past the exhausted block. `true` if the next one continues the open entry.
    fn advance(&mut self) -> Result<bool> {
        match self.load_block()? {
            Header::Chunk => Ok(true),
            Header::File(next) => {
                self.pending = Some(next);
                self.state = DecodeState::AwaitingEntry;
                self.drained = true;
                Ok(false)
            }
            Header::End => {
                self.state = DecodeState::Done;
                Ok(false)
            }
        }
    }

    /// Drains the open entry. A no-op after the END block, or when reads
    /// already ran the entry to its end.
    pub fn close_entry(&mut self) -> Result<()> {
        match self.state {
            DecodeState::Done => Ok(()),
            DecodeState::AwaitingEntry if self.drained => {
                self.drained = false;
                Ok(())
            }
            DecodeState::AwaitingEntry => Err(YzError::usage("no entry is open")),
            DecodeState::EntryOpen => {
                while self.advance()? {}
                self.drained = false;
                Ok(())
            }
        }
    }

    /// Walks the rest of the archive, returning every remaining entry.
    pub fn entries(mut self) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        while let Some(e) = self.next_entry()? {
            out.push(e);
        }
        Ok(out)
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_data(buf)?)
    }
}
