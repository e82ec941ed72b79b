use std::io::{Read, Result};

/// A byte source that accepts bytes back after they were read.
pub trait Unread: Read {
    /// Returns `bytes` to the front of the stream; the next read yields them first.
    fn unread(&mut self, bytes: &[u8]);
}

pub struct PushbackReader<R: Read> {
    inner: R,
    pending: Vec<u8>,
    pos: usize,
}

impl<R: Read> PushbackReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            pos: 0,
        }
    }

    /// Bytes waiting to be served before the inner reader is touched again.
    pub fn pending(&self) -> usize {
        self.pending.len() - self.pos
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for PushbackReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos < self.pending.len() {
            let n = buf.len().min(self.pending.len() - self.pos);
            buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
            self.pos += n;
            if self.pos == self.pending.len() {
                self.pending.clear();
                self.pos = 0;
            }
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

impl<R: Read> Unread for PushbackReader<R> {
    fn unread(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut front = Vec::with_capacity(bytes.len() + self.pending());
        front.extend_from_slice(bytes);
        front.extend_from_slice(&self.pending[self.pos..]);
        self.pending = front;
        self.pos = 0;
    }
}
