//! Streaming behavior: chunked calls, flushes and the stream facade.

use oxiflate::{
    Codec, CodecStream, CompressStatus, DecompressStatus, DeflateOptions, ErrorKind, FlushMode,
    Format, InflateOptions, Mode, OxiflateError,
};
use std::io::{Read, Write};

fn corpus() -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..2000u32 {
        data.extend_from_slice(format!("line {:05}: value={} ", i, i * 7 % 113).as_bytes());
        if i % 3 == 0 {
            data.extend_from_slice(b"repeat repeat repeat\n");
        }
    }
    data
}

fn one_shot(format: Format, level: u8, data: &[u8]) -> Vec<u8> {
    let mut codec = Codec::new(format);
    codec.init_deflate(DeflateOptions::new(level)).unwrap();
    codec.compress_to_vec(data).unwrap()
}

fn chunked_compress(format: Format, level: u8, data: &[u8], in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut codec = Codec::new(format);
    codec.init_deflate(DeflateOptions::new(level)).unwrap();
    let mut out = vec![0u8; out_chunk];
    let mut packed = Vec::new();

    for chunk in data.chunks(in_chunk) {
        let mut pos = 0;
        loop {
            let (consumed, produced, status) =
                codec.compress(&chunk[pos..], &mut out, FlushMode::None).unwrap();
            pos += consumed;
            packed.extend_from_slice(&out[..produced]);
            if pos == chunk.len() && status == CompressStatus::NeedsInput {
                break;
            }
        }
    }
    loop {
        let (_, produced, status) = codec.compress(&[], &mut out, FlushMode::Finish).unwrap();
        packed.extend_from_slice(&out[..produced]);
        if status == CompressStatus::Done {
            break;
        }
    }
    packed
}

fn chunked_decompress(format: Format, packed: &[u8], in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut codec = Codec::new(format);
    codec.init_inflate(InflateOptions::default()).unwrap();
    let mut out = vec![0u8; out_chunk];
    let mut plain = Vec::new();

    'outer: for chunk in packed.chunks(in_chunk) {
        let mut pos = 0;
        loop {
            let (consumed, produced, status) = codec.decompress(&chunk[pos..], &mut out).unwrap();
            pos += consumed;
            plain.extend_from_slice(&out[..produced]);
            match status {
                DecompressStatus::Done => break 'outer,
                DecompressStatus::NeedsInput if pos == chunk.len() => break,
                _ => {}
            }
        }
    }
    assert!(codec.is_finished());
    plain
}

#[test]
fn test_compress_chunking_invariance() {
    let data = corpus();
    for format in [Format::Raw, Format::Zlib, Format::Gzip] {
        for level in [0, 1, 6, 9] {
            let expected = one_shot(format, level, &data);
            for (in_chunk, out_chunk) in [(1, 4096), (7, 13), (1000, 1), (65536, 65536)] {
                let packed = chunked_compress(format, level, &data, in_chunk, out_chunk);
                assert_eq!(
                    packed, expected,
                    "{} level {} chunks {}/{}",
                    format, level, in_chunk, out_chunk
                );
            }
        }
    }
}

#[test]
fn test_decompress_chunking_invariance() {
    let data = corpus();
    for format in [Format::Raw, Format::Zlib, Format::Gzip] {
        let packed = one_shot(format, 6, &data);
        for (in_chunk, out_chunk) in [(1, 1), (3, 257), (512, 7), (packed.len(), 1 << 16)] {
            let plain = chunked_decompress(format, &packed, in_chunk, out_chunk);
            assert_eq!(plain, data, "{} chunks {}/{}", format, in_chunk, out_chunk);
        }
    }
}

#[test]
fn test_interleaved_flushes_stay_decodable() {
    let data = corpus();
    for flush in [FlushMode::Partial, FlushMode::Sync, FlushMode::Full] {
        let mut codec = Codec::new(Format::Zlib);
        codec.init_deflate(DeflateOptions::new(6)).unwrap();
        let mut out = vec![0u8; 1 << 16];
        let mut packed = Vec::new();
        for chunk in data.chunks(3000) {
            let (consumed, produced, _) = codec.compress(chunk, &mut out, flush).unwrap();
            assert_eq!(consumed, chunk.len());
            packed.extend_from_slice(&out[..produced]);
        }
        let (_, produced, status) = codec.compress(&[], &mut out, FlushMode::Finish).unwrap();
        assert_eq!(status, CompressStatus::Done);
        packed.extend_from_slice(&out[..produced]);

        assert_eq!(oxiflate::zlib_decompress(&packed).unwrap(), data, "{:?}", flush);
    }
}

#[test]
fn test_sync_flush_prefix_is_complete() {
    let mut codec = Codec::new(Format::Raw);
    codec.init_deflate(DeflateOptions::new(9)).unwrap();
    let mut out = vec![0u8; 4096];
    let (_, produced, _) = codec
        .compress(b"the first message", &mut out, FlushMode::Sync)
        .unwrap();
    let first = out[..produced].to_vec();

    let mut reader = Codec::new(Format::Raw);
    reader.init_inflate(InflateOptions::default()).unwrap();
    let mut plain = vec![0u8; 64];
    let (consumed, n, status) = reader.decompress(&first, &mut plain).unwrap();
    assert_eq!(consumed, first.len());
    assert_eq!(&plain[..n], b"the first message");
    assert_eq!(status, DecompressStatus::NeedsInput);
}

#[test]
fn test_stream_small_buffers() {
    let data = corpus();
    for format in [Format::Raw, Format::Zlib, Format::Gzip] {
        let mut writer = CodecStream::new(Vec::new(), Mode::Compress, format);
        writer.set_buffer_size(128).unwrap();
        writer.set_level(9).unwrap();
        for chunk in data.chunks(1000) {
            writer.write_all(chunk).unwrap();
        }
        let packed = writer.into_inner().unwrap();
        assert_eq!(packed, one_shot(format, 9, &data));

        let mut reader = CodecStream::new(&packed[..], Mode::Decompress, format);
        reader.set_buffer_size(128).unwrap();
        let mut plain = Vec::new();
        let mut buf = [0u8; 100];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            plain.extend_from_slice(&buf[..n]);
        }
        assert_eq!(plain, data);
    }
}

#[test]
fn test_stream_flush_mode_per_write() {
    let mut writer = CodecStream::new(Vec::new(), Mode::Compress, Format::Zlib);
    writer.set_flush_mode(FlushMode::Sync).unwrap();
    writer.write_all(b"message one;").unwrap();
    let after_first = writer.get_ref().unwrap().len();
    assert!(after_first > 2);
    writer.write_all(b"message two;").unwrap();
    let packed = writer.into_inner().unwrap();
    assert_eq!(
        oxiflate::zlib_decompress(&packed).unwrap(),
        b"message one;message two;"
    );
    assert!(writer_rejects_finish_flush());
}

fn writer_rejects_finish_flush() -> bool {
    let mut writer = CodecStream::new(Vec::<u8>::new(), Mode::Compress, Format::Zlib);
    matches!(
        writer.set_flush_mode(FlushMode::Finish),
        Err(OxiflateError::InvalidConfig { .. })
    )
}

#[test]
fn test_trailer_split_across_reads() {
    // A source that hands out one byte per read.
    struct Trickle<'a>(&'a [u8]);
    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    let data = corpus();
    let packed = one_shot(Format::Gzip, 6, &data);
    let mut reader = CodecStream::new(Trickle(&packed), Mode::Decompress, Format::Gzip);
    let mut plain = Vec::new();
    reader.read_to_end(&mut plain).unwrap();
    assert_eq!(plain, data);
    assert_eq!(reader.total_in(), packed.len() as u64);
}

#[test]
fn test_write_after_finish_is_state_error() {
    let mut codec = Codec::new(Format::Gzip);
    codec.init_deflate(DeflateOptions::default()).unwrap();
    codec.compress_to_vec(b"finished").unwrap();
    let mut out = [0u8; 32];
    let err = codec.compress(b"late", &mut out, FlushMode::None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let mut writer = CodecStream::new(Vec::new(), Mode::Compress, Format::Gzip);
    writer.write_all(b"finished").unwrap();
    writer.close().unwrap();
    let err = writer.write_all(b"late").unwrap_err();
    assert_eq!(OxiflateError::from_io(err).kind(), ErrorKind::State);
}

#[test]
fn test_corrupt_trailer_reported_after_payload() {
    let data = corpus();
    let mut packed = one_shot(Format::Gzip, 6, &data);
    let n = packed.len();
    packed[n - 6] ^= 0x01;

    let mut reader = CodecStream::new(&packed[..], Mode::Decompress, Format::Gzip);
    let mut plain = Vec::new();
    let mut buf = [0u8; 4096];
    let err = loop {
        match reader.read(&mut buf) {
            Ok(0) => panic!("corruption went unnoticed"),
            Ok(n) => plain.extend_from_slice(&buf[..n]),
            Err(err) => break err,
        }
    };
    assert_eq!(plain, data);
    assert_eq!(OxiflateError::from_io(err).kind(), ErrorKind::Integrity);
}
