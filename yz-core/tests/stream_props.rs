//! In-memory encoder/decoder properties.

use proptest::prelude::*;
use std::io::{Read, Write};
use yz_core::{CodecId, DecodeReader, EncoderOptions, Entry, EntryType, ParallelEncoder};

fn encode(files: &[Vec<u8>], chunk_size: usize, workers: usize, codec: CodecId) -> Vec<u8> {
    let opts = EncoderOptions {
        chunk_size,
        workers,
        queue_depth: 2,
        ..Default::default()
    };
    let mut enc = ParallelEncoder::with_codec(Vec::new(), codec, opts).unwrap();
    for (i, body) in files.iter().enumerate() {
        enc.put_entry(Entry::file(format!("f{i}"), body.len() as u64)).unwrap();
        // Uneven writes so entries straddle chunk boundaries at arbitrary points.
        for piece in body.chunks(777) {
            enc.write_all(piece).unwrap();
        }
        enc.close_entry().unwrap();
    }
    enc.put_entry(Entry::dir("tail")).unwrap();
    enc.close_entry().unwrap();
    enc.finish().unwrap()
}

fn decode(stream: &[u8], codec: CodecId) -> Vec<(Entry, Vec<u8>)> {
    let mut r = DecodeReader::with_codec(stream, codec).unwrap();
    let mut out = Vec::new();
    while let Some(e) = r.next_entry().unwrap() {
        let mut body = Vec::new();
        r.read_to_end(&mut body).unwrap();
        out.push((e, body));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn entries_come_back_in_order(
        files in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..12_000), 1..6),
        chunk_size in 1025usize..6000,
        workers in 0usize..4,
    ) {
        let stream = encode(&files, chunk_size, workers, CodecId::Deflate);
        let got = decode(&stream, CodecId::Deflate);

        prop_assert_eq!(got.len(), files.len() + 1);
        for (i, body) in files.iter().enumerate() {
            prop_assert_eq!(&got[i].0, &Entry::file(format!("f{i}"), body.len() as u64));
            prop_assert_eq!(&got[i].1, body);
        }
        let (last, body) = &got[files.len()];
        prop_assert_eq!(last.kind, EntryType::Directory);
        prop_assert!(body.is_empty());
    }

    #[test]
    fn output_does_not_depend_on_worker_count(
        body in prop::collection::vec(any::<u8>(), 0..40_000),
        workers in 1usize..6,
    ) {
        let files = [body];
        let serial = encode(&files, 2048, 0, CodecId::Zstd);
        let parallel = encode(&files, 2048, workers, CodecId::Zstd);
        prop_assert_eq!(serial, parallel);
    }
}
