//! Parallel encoder: frames entries into chunks, compresses the chunks on a
//! bounded worker pool and writes the compressed blocks in chunk order.
//!
//! ```text
//!  caller ──chunk──▶ [bounded queue] ──▶ workers ──▶ ordering heap ──▶ writer ──▶ W
//!     └── queue full: compress inline ──────────────────┘
//! ```
//!
//! Every chunk gets its sequence number when it is cut, before compression.
//! The writer only ever emits the block whose number is next, so the output
//! does not depend on which worker finishes first.

use crate::codec::{CodecId, Compressor, compressor_for};
use crate::container::header::{
    CHUNK_HEADER_LEN, END_PADDING_LEN, Entry, write_chunk_header, write_end_header,
    write_file_header,
};
use crate::error::{Result, YzError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chunk sizes at or below this are rejected.
pub const MIN_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_DEPTH: usize = 100;
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// How the END block's padding is filled. Readers never look at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trailer {
    #[default]
    Zeroed,
    Random,
}

#[derive(Clone, Debug)]
pub struct EncoderOptions {
    /// Buffered bytes (header included) that trigger a compression unit.
    pub chunk_size: usize,
    /// Compression threads. Zero compresses everything on the calling thread.
    pub workers: usize,
    /// Units that may wait for a worker before the caller compresses inline.
    pub queue_depth: usize,
    pub drain_timeout: Duration,
    pub trailer: Trailer,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            trailer: Trailer::Zeroed,
        }
    }
}

impl EncoderOptions {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size <= MIN_CHUNK_SIZE {
            return Err(YzError::usage(format!(
                "chunk size {} is too small (must exceed {MIN_CHUNK_SIZE})",
                self.chunk_size
            )));
        }
        Ok(())
    }
}

struct Task {
    seq: u64,
    data: Vec<u8>,
}

struct Ready {
    seq: u64,
    data: Vec<u8>,
}

impl PartialEq for Ready {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}
impl Eq for Ready {}
impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Ready {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

#[derive(Default)]
struct OrderState {
    heap: BinaryHeap<Reverse<Ready>>,
    /// Known once `finish` has cut the last unit.
    total: Option<u64>,
    failure: Option<String>,
}

/// Ordering heap shared by the workers (producers) and the writer (sole consumer).
#[derive(Default)]
struct Shared {
    state: Mutex<OrderState>,
    ready: Condvar,
    aborted: AtomicBool,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, OrderState>> {
        self.state
            .lock()
            .map_err(|_| YzError::Aborted("ordering queue poisoned".into()))
    }

    fn push(&self, seq: u64, data: Vec<u8>) {
        match self.state.lock() {
            Ok(mut st) => {
                st.heap.push(Reverse(Ready { seq, data }));
                self.ready.notify_one();
            }
            Err(_) => self.fail(format!("unit {seq} dropped: ordering queue poisoned")),
        }
    }

    /// Records the first failure. Still recorded when the lock is poisoned.
    fn fail(&self, msg: String) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.failure.get_or_insert(msg);
        drop(st);
        self.ready.notify_all();
    }

    fn set_total(&self, total: u64) -> Result<()> {
        self.lock()?.total = Some(total);
        self.ready.notify_all();
        Ok(())
    }

    fn abort(&self) {
        self.aborted.store(true, AtomicOrdering::SeqCst);
        self.fail("cancelled".into());
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(AtomicOrdering::SeqCst)
    }

    /// Surfaces a worker or writer failure to the submitting thread.
    fn check(&self) -> Result<()> {
        match &self.lock()?.failure {
            Some(msg) => Err(YzError::Aborted(msg.clone())),
            None => Ok(()),
        }
    }

    /// Blocks until unit `seq` is at the head of the heap, or returns `None`
    /// once every unit has been handed out.
    fn take(&self, seq: u64) -> Result<Option<Vec<u8>>> {
        let mut st = self.lock()?;
        loop {
            if let Some(msg) = &st.failure {
                return Err(YzError::Aborted(msg.clone()));
            }
            if st.heap.peek().is_some_and(|Reverse(r)| r.seq == seq) {
                return Ok(st.heap.pop().map(|Reverse(r)| r.data));
            }
            if st.total == Some(seq) {
                return Ok(None);
            }
            st = self
                .ready
                .wait(st)
                .map_err(|_| YzError::Aborted("ordering queue poisoned".into()))?;
        }
    }
}

fn compress_unit(compressor: &dyn Compressor, shared: &Shared, task: Task) {
    if shared.is_aborted() {
        return;
    }
    match compressor.compress(&task.data) {
        Ok(block) => shared.push(task.seq, block),
        Err(e) => shared.fail(format!("unit {} failed to compress: {e}", task.seq)),
    }
}

fn write_in_order<W: Write>(out: &mut W, shared: &Shared) -> Result<u64> {
    let mut next = 0u64;
    while let Some(block) = shared.take(next)? {
        out.write_all(&block)?;
        next += 1;
    }
    out.flush()?;
    Ok(next)
}

/// Streaming archive encoder over any `Write` sink.
///
/// Call [`put_entry`](Self::put_entry), any number of writes, then
/// [`close_entry`](Self::close_entry) per entry; finish with
/// [`finish`](Self::finish), which hands the sink back.
pub struct ParallelEncoder<W: Write + Send + 'static> {
    opts: EncoderOptions,
    compressor: Arc<dyn Compressor>,
    shared: Arc<Shared>,
    tasks: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    done: Receiver<Result<(W, u64)>>,
    current: Option<Entry>,
    buf: Vec<u8>,
    seq: u64,
    inline_units: u64,
    finished: bool,
}

impl<W: Write + Send + 'static> ParallelEncoder<W> {
    pub fn with_codec(out: W, codec: CodecId, opts: EncoderOptions) -> Result<Self> {
        Self::new(out, Arc::from(compressor_for(codec)), opts)
    }

    pub fn new(out: W, compressor: Arc<dyn Compressor>, opts: EncoderOptions) -> Result<Self> {
        opts.validate()?;
        let shared = Arc::new(Shared::default());
        let (task_tx, task_rx) = bounded::<Task>(opts.queue_depth);

        let mut workers = Vec::with_capacity(opts.workers);
        for i in 0..opts.workers {
            let rx = task_rx.clone();
            let shared = Arc::clone(&shared);
            let compressor = Arc::clone(&compressor);
            let h = thread::Builder::new()
                .name(format!("yz-compress-{i}"))
                .spawn(move || {
                    for task in rx {
                        compress_unit(compressor.as_ref(), &shared, task);
                    }
                })?;
            workers.push(h);
        }
        drop(task_rx);

        let (done_tx, done_rx) = bounded(1);
        let writer = {
            let shared = Arc::clone(&shared);
            let mut out = out;
            thread::Builder::new()
                .name("yz-writer".into())
                .spawn(move || {
                    let res = write_in_order(&mut out, &shared);
                    if let Err(e) = &res {
                        shared.fail(format!("writer: {e}"));
                    }
                    let _ = done_tx.send(res.map(|n| (out, n)));
                })?
        };

        let cap = opts.chunk_size + CHUNK_HEADER_LEN;
        Ok(Self {
            opts,
            compressor,
            shared,
            tasks: Some(task_tx),
            workers,
            writer: Some(writer),
            done: done_rx,
            current: None,
            buf: Vec::with_capacity(cap),
            seq: 0,
            inline_units: 0,
            finished: false,
        })
    }

    /// Units cut so far; also the next sequence number.
    pub fn units_submitted(&self) -> u64 {
        self.seq
    }

    /// Units the caller had to compress itself because the queue was full.
    pub fn inline_units(&self) -> u64 {
        self.inline_units
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        self.current.as_ref()
    }

    pub fn put_entry(&mut self, entry: Entry) -> Result<()> {
        if self.finished || self.tasks.is_none() {
            return Err(YzError::usage("encoder already finished"));
        }
        if let Some(open) = &self.current {
            return Err(YzError::usage(format!(
                "entry {} is still open; close it first",
                open.name
            )));
        }
        write_file_header(&mut self.buf, &entry);
        self.current = Some(entry);
        Ok(())
    }

    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        match &self.current {
            None => return Err(YzError::usage("no entry to write")),
            Some(e) if e.is_dir() => {
                return Err(YzError::usage(format!("can't write to directory {}", e.name)));
            }
            Some(_) => {}
        }

        let mut rest = data;
        while !rest.is_empty() {
            let room = self.opts.chunk_size.saturating_sub(self.buf.len());
            let take = room.min(rest.len());
            self.buf.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.buf.len() >= self.opts.chunk_size {
                self.submit()?;
                write_chunk_header(&mut self.buf);
            }
        }
        Ok(())
    }

    pub fn close_entry(&mut self) -> Result<()> {
        let Some(entry) = self.current.take() else {
            return Err(YzError::usage("no entry to close"));
        };
        // A bare CHUNK signature means the entry ended exactly on a chunk boundary.
        if entry.is_dir() || self.buf.len() > CHUNK_HEADER_LEN {
            self.submit()?;
        }
        self.buf.clear();
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        self.shared.check()?;
        let cap = self.opts.chunk_size + CHUNK_HEADER_LEN;
        let data = std::mem::replace(&mut self.buf, Vec::with_capacity(cap));
        let task = Task {
            seq: self.seq,
            data,
        };
        self.seq += 1;

        if self.workers.is_empty() {
            self.inline_units += 1;
            compress_unit(self.compressor.as_ref(), &self.shared, task);
            debug!(seq = self.seq - 1, "unit compressed inline");
            return Ok(());
        }
        let tx = self
            .tasks
            .as_ref()
            .ok_or_else(|| YzError::usage("encoder already finished"))?;
        match tx.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) => {
                // Backpressure: the caller pays for the unit instead of queueing it.
                self.inline_units += 1;
                compress_unit(self.compressor.as_ref(), &self.shared, task);
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(YzError::Aborted("compression workers are gone".into()));
            }
        }
        debug!(seq = self.seq - 1, "unit submitted");
        Ok(())
    }

    fn trailer_padding(&self) -> Result<[u8; END_PADDING_LEN]> {
        let mut pad = [0u8; END_PADDING_LEN];
        if self.opts.trailer == Trailer::Random {
            getrandom::getrandom(&mut pad).map_err(|e| {
                YzError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?;
        }
        Ok(pad)
    }

    fn halt(&mut self) {
        self.shared.abort();
        self.tasks = None;
        // Threads that are mid-unit are left to notice the abort flag on their own.
        self.workers.clear();
        self.writer = None;
    }

    /// Appends the END block, waits for every unit to be written and returns the sink.
    /// Exceeding the drain timeout aborts all outstanding work; the output is then unusable.
    pub fn finish(&mut self) -> Result<W> {
        if self.finished || self.tasks.is_none() {
            return Err(YzError::usage("encoder already finished"));
        }
        if let Some(open) = &self.current {
            return Err(YzError::usage(format!("entry {} is not closed", open.name)));
        }

        let pad = self.trailer_padding()?;
        self.buf.clear();
        write_end_header(&mut self.buf, &pad);
        self.submit()?;

        let total = self.seq;
        self.tasks = None;
        self.shared.set_total(total)?;

        match self.done.recv_timeout(self.opts.drain_timeout) {
            Ok(Ok((out, written))) => {
                for h in self.workers.drain(..) {
                    h.join()
                        .map_err(|_| YzError::Aborted("compression worker panicked".into()))?;
                }
                if let Some(h) = self.writer.take() {
                    h.join()
                        .map_err(|_| YzError::Aborted("writer thread panicked".into()))?;
                }
                self.finished = true;
                info!(
                    units = written,
                    inline = self.inline_units,
                    "archive stream finished"
                );
                Ok(out)
            }
            Ok(Err(e)) => {
                self.halt();
                Err(e)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.opts.drain_timeout, "drain timed out; aborting");
                self.halt();
                Err(YzError::Timeout(self.opts.drain_timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.halt();
                Err(YzError::Aborted("writer exited without a result".into()))
            }
        }
    }
}

impl<W: Write + Send + 'static> Write for ParallelEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_data(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<W: Write + Send + 'static> Drop for ParallelEncoder<W> {
    fn drop(&mut self) {
        if !self.finished {
            self.halt();
        }
    }
}
