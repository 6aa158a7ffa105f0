//! Property tests over levels, strategies, framings and chunkings.

use oxiflate::Strategy as MatchStrategy;
use oxiflate::{Codec, DecompressStatus, DeflateOptions, ErrorKind, Format, InflateOptions};
use oxiflate_core::{Adler32, Crc32};
use proptest::prelude::*;

fn strategy_of(index: u8) -> MatchStrategy {
    match index % 4 {
        0 => MatchStrategy::Default,
        1 => MatchStrategy::Filtered,
        2 => MatchStrategy::HuffmanOnly,
        _ => MatchStrategy::Fixed,
    }
}

fn format_of(index: u8) -> Format {
    match index % 3 {
        0 => Format::Raw,
        1 => Format::Zlib,
        _ => Format::Gzip,
    }
}

fn compress(format: Format, options: DeflateOptions, data: &[u8]) -> Vec<u8> {
    let mut codec = Codec::new(format);
    codec.init_deflate(options).unwrap();
    codec.compress_to_vec(data).unwrap()
}

fn decompress(format: Format, packed: &[u8]) -> oxiflate::Result<Vec<u8>> {
    let mut codec = Codec::new(format);
    codec.init_inflate(InflateOptions::default())?;
    codec.decompress_to_vec(packed)
}

/// Inputs with enough repetition to exercise matches.
fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..2048),
        proptest::collection::vec(0u8..4, 0..4096),
        (proptest::collection::vec(any::<u8>(), 1..16), 1usize..400).prop_map(|(unit, times)| {
            unit.iter().copied().cycle().take(unit.len() * times).collect()
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip_any_configuration(
        data in payload(),
        level in 0u8..=9,
        strategy in 0u8..4,
        format in 0u8..3,
    ) {
        let format = format_of(format);
        let options = DeflateOptions::new(level).with_strategy(strategy_of(strategy));
        let packed = compress(format, options, &data);
        prop_assert_eq!(decompress(format, &packed).unwrap(), data);
    }

    #[test]
    fn decoding_is_chunking_invariant(
        data in payload(),
        format in 0u8..3,
        in_chunk in 1usize..64,
        out_chunk in 1usize..64,
    ) {
        let format = format_of(format);
        let packed = compress(format, DeflateOptions::new(6), &data);

        let mut codec = Codec::new(format);
        codec.init_inflate(InflateOptions::default()).unwrap();
        let mut out = vec![0u8; out_chunk];
        let mut plain = Vec::new();
        let mut pos = 0;
        loop {
            let end = (pos + in_chunk).min(packed.len());
            let (consumed, produced, status) = codec.decompress(&packed[pos..end], &mut out).unwrap();
            pos += consumed;
            plain.extend_from_slice(&out[..produced]);
            if status == DecompressStatus::Done {
                break;
            }
            prop_assert!(consumed > 0 || produced > 0, "decoder stalled at {}", pos);
        }
        prop_assert_eq!(pos, packed.len());
        prop_assert_eq!(plain, data);
    }

    #[test]
    fn stored_level_overhead_is_bounded(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let packed = compress(Format::Raw, DeflateOptions::new(0), &data);
        let blocks = data.len().div_ceil(65535).max(1);
        prop_assert!(packed.len() <= data.len() + 5 * blocks);
    }

    #[test]
    fn trailer_corruption_is_detected(
        data in proptest::collection::vec(any::<u8>(), 1..1024),
        gzip in any::<bool>(),
        offset in 0usize..8,
        bit in 0u8..8,
    ) {
        let format = if gzip { Format::Gzip } else { Format::Zlib };
        let mut packed = compress(format, DeflateOptions::new(6), &data);
        let trailer = if gzip { 8 } else { 4 };
        let at = packed.len() - trailer + offset % trailer;
        packed[at] ^= 1 << bit;

        let err = decompress(format, &packed).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn arbitrary_input_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        for format in [Format::Raw, Format::Zlib, Format::Gzip] {
            let _ = decompress(format, &data);
        }
    }

    #[test]
    fn crc32_is_incremental(data in proptest::collection::vec(any::<u8>(), 0..1024), split in any::<prop::sample::Index>()) {
        let at = split.index(data.len() + 1);
        let mut crc = Crc32::new();
        crc.update(&data[..at]);
        crc.update(&data[at..]);
        prop_assert_eq!(crc.value(), Crc32::compute(&data));
    }

    #[test]
    fn crc32_combine_matches_concatenation(
        a in proptest::collection::vec(any::<u8>(), 0..512),
        b in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        let whole: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        let combined = Crc32::new().combine(Crc32::compute(&a), Crc32::compute(&b), b.len() as u64);
        prop_assert_eq!(combined, Crc32::compute(&whole));
    }

    #[test]
    fn adler32_is_incremental_and_combines(
        a in proptest::collection::vec(any::<u8>(), 0..2048),
        b in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let whole: Vec<u8> = a.iter().chain(b.iter()).copied().collect();

        let mut adler = Adler32::new();
        adler.update(&a);
        adler.update(&b);
        prop_assert_eq!(adler.finish(), Adler32::checksum(&whole));

        let combined = Adler32::combine(Adler32::checksum(&a), Adler32::checksum(&b), b.len() as u64);
        prop_assert_eq!(combined, Adler32::checksum(&whole));
    }
}
