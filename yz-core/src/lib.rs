#![forbid(unsafe_code)]

pub mod error;

pub mod util {
    pub mod pushback;
}

pub mod codec;

pub mod container {
    pub mod header;
    pub mod part;
}

pub mod split;

pub mod pack {
    pub mod pipeline;
    pub mod writer;
}

pub mod read {
    pub mod extract;
    pub mod stream;
}

pub mod list;

// Re-exports: stable API surface
pub use codec::CodecId;
pub use container::header::{Entry, EntryType};
pub use error::{Result, YzError};
pub use list::list;
pub use pack::pipeline::{EncoderOptions, ParallelEncoder, Trailer};
pub use pack::writer::{PackOptions, PackSummary, pack};
pub use read::extract::{ExtractOptions, ExtractSummary, extract};
pub use read::stream::{DecodeReader, DecodeState};
pub use split::{MultipartReader, MultipartWriter, part_paths};
