//! Constant tables for DEFLATE (RFC 1951).
//!
//! Everything here is immutable, computed at compile time where possible,
//! and shared by every encoder and decoder instance.

use crate::huffman::{DecodeTable, Entry, build_static_table, reverse_bits};

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_BITS: usize = 15;

/// Maximum code length of the bit-length tree.
pub const MAX_BL_BITS: usize = 7;

/// Size of the literal/length alphabet actually used (0-285).
pub const LITLEN_CODES: usize = 286;

/// Size of the literal/length alphabet including the two reserved codes.
pub const LITLEN_CODES_FIXED: usize = 288;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_CODES: usize = 30;

/// Size of the code length alphabet (0-18).
pub const CODELEN_CODES: usize = 19;

/// Number of literal byte symbols.
pub const LITERALS: usize = 256;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Shortest match.
pub const MIN_MATCH: usize = 3;

/// Longest match.
pub const MAX_MATCH: usize = 258;

/// Repeat previous length 3-6 times (2 extra bits).
pub const REP_3_6: usize = 16;

/// Repeat a zero length 3-10 times (3 extra bits).
pub const REPZ_3_10: usize = 17;

/// Repeat a zero length 11-138 times (7 extra bits).
pub const REPZ_11_138: usize = 18;

/// Largest payload of one stored block.
pub const MAX_STORED: usize = 65535;

/// Block type field values.
pub mod block_type {
    /// Stored (uncompressed).
    pub const STORED: u32 = 0;
    /// Fixed Huffman codes.
    pub const FIXED: u32 = 1;
    /// Dynamic Huffman codes.
    pub const DYNAMIC: u32 = 2;
}

/// Length code base values (RFC 1951 Section 3.2.5).
///
/// For length codes 257-285, this gives the base length value.
/// Extra bits are added to get the final length.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264: 0 extra bits
    11, 13, 15, 17, // 265-268: 1 extra bit
    19, 23, 27, 31, // 269-272: 2 extra bits
    35, 43, 51, 59, // 273-276: 3 extra bits
    67, 83, 99, 115, // 277-280: 4 extra bits
    131, 163, 195, 227, // 281-284: 5 extra bits
    258, // 285: 0 extra bits (special case)
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Distance code base values (RFC 1951 Section 3.2.5).
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Extra bits of the code length symbols 0-18.
pub const CODELEN_EXTRA_BITS: [u8; CODELEN_CODES] =
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// Order of code length codes in dynamic block header.
///
/// Code length codes are transmitted in this order (RFC 1951 Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; CODELEN_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub const FIXED_LITLEN_LENGTHS: [u8; LITLEN_CODES_FIXED] = {
    let mut lengths = [8u8; LITLEN_CODES_FIXED];
    let mut i = 144;
    while i < 256 {
        lengths[i] = 9;
        i += 1;
    }
    while i < 280 {
        lengths[i] = 7;
        i += 1;
    }
    lengths
};

/// Fixed distance code lengths: all 30 codes (plus the two reserved) use 5 bits.
pub const FIXED_DISTANCE_LENGTHS: [u8; 32] = [5u8; 32];

/// A code ready for the bit writer: bit-reversed value and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Code {
    /// Code bits, first bit in the LSB.
    pub code: u16,
    /// Code length in bits.
    pub len: u8,
}

const fn static_codes<const N: usize>(lengths: &[u8; N]) -> [Code; N] {
    let mut counts = [0u16; MAX_BITS + 1];
    let mut i = 0;
    while i < N {
        counts[lengths[i] as usize] += 1;
        i += 1;
    }
    counts[0] = 0;

    let mut next_code = [0u16; MAX_BITS + 1];
    let mut code = 0u16;
    let mut bits = 1;
    while bits <= MAX_BITS {
        code = (code + counts[bits - 1]) << 1;
        next_code[bits] = code;
        bits += 1;
    }

    let mut codes = [Code { code: 0, len: 0 }; N];
    let mut symbol = 0;
    while symbol < N {
        let len = lengths[symbol];
        codes[symbol] = Code {
            code: reverse_bits(next_code[len as usize], len),
            len,
        };
        next_code[len as usize] += 1;
        symbol += 1;
    }
    codes
}

/// Fixed literal/length tree for the encoder.
pub const STATIC_LITLEN_CODES: [Code; LITLEN_CODES_FIXED] = static_codes(&FIXED_LITLEN_LENGTHS);

/// Fixed distance tree for the encoder.
pub const STATIC_DISTANCE_CODES: [Code; 32] = static_codes(&FIXED_DISTANCE_LENGTHS);

const FIXED_LITLEN_ENTRIES: [Entry; 512] = build_static_table(&FIXED_LITLEN_LENGTHS);
const FIXED_DISTANCE_ENTRIES: [Entry; 32] = build_static_table(&FIXED_DISTANCE_LENGTHS);

/// Fixed literal/length decode table (9-bit root, no sub-tables).
pub static FIXED_LITLEN_TABLE: DecodeTable = DecodeTable::from_static(&FIXED_LITLEN_ENTRIES, 9);

/// Fixed distance decode table (5-bit root).
pub static FIXED_DISTANCE_TABLE: DecodeTable =
    DecodeTable::from_static(&FIXED_DISTANCE_ENTRIES, 5);

/// Length (3-258) to length code index (0-28, i.e. symbol minus 257).
pub const LENGTH_CODE: [u8; MAX_MATCH + 1] = {
    let mut table = [0u8; MAX_MATCH + 1];
    let mut code = 0;
    while code < 28 {
        let base = LENGTH_BASE[code] as usize;
        let span = 1usize << LENGTH_EXTRA_BITS[code];
        let mut n = 0;
        while n < span {
            table[base + n] = code as u8;
            n += 1;
        }
        code += 1;
    }
    // 258 has its own code even though 284 + 31 would reach it.
    table[MAX_MATCH] = 28;
    table
};

/// Convert a length value (3-258) to a length code (257-285).
///
/// Returns (code, extra bits, extra value).
#[inline]
pub fn length_to_code(length: u16) -> (u16, u8, u16) {
    debug_assert!(
        (3..=258).contains(&length),
        "Length out of range: {}",
        length
    );

    let index = LENGTH_CODE[length as usize] as usize;
    (
        index as u16 + 257,
        LENGTH_EXTRA_BITS[index],
        length - LENGTH_BASE[index],
    )
}

/// Distance code for a distance minus one.
///
/// Distances up to 256 are looked up directly; larger ones use the upper
/// table indexed by `(distance - 1) >> 7`.
#[inline]
pub fn distance_code_index(dist_minus_one: usize) -> usize {
    if dist_minus_one < 256 {
        DIST_CODE_LOW[dist_minus_one] as usize
    } else {
        DIST_CODE_HIGH[dist_minus_one >> 7] as usize
    }
}

const DIST_CODE_LOW: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut code = 0;
    while code < 16 {
        let base = DISTANCE_BASE[code] as usize - 1;
        let span = 1usize << DISTANCE_EXTRA_BITS[code];
        let mut n = 0;
        while n < span && base + n < 256 {
            table[base + n] = code as u8;
            n += 1;
        }
        code += 1;
    }
    table
};

const DIST_CODE_HIGH: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut code = 16;
    while code < 30 {
        let base = (DISTANCE_BASE[code] as usize - 1) >> 7;
        let span = 1usize << (DISTANCE_EXTRA_BITS[code] - 7);
        let mut n = 0;
        while n < span {
            table[base + n] = code as u8;
            n += 1;
        }
        code += 1;
    }
    table
};

/// Convert a distance value (1-32768) to a distance code (0-29).
///
/// Returns (code, extra bits, extra value).
#[inline]
pub fn distance_to_code(distance: u16) -> (u16, u8, u16) {
    debug_assert!(
        (1..=32768).contains(&distance),
        "Distance out of range: {}",
        distance
    );

    let code = distance_code_index(distance as usize - 1);
    (
        code as u16,
        DISTANCE_EXTRA_BITS[code],
        distance - DISTANCE_BASE[code],
    )
}

/// Decode a length from a length code and extra bits.
pub fn decode_length(code: u16, extra: u16) -> u16 {
    debug_assert!((257..=285).contains(&code), "Invalid length code: {}", code);
    LENGTH_BASE[(code - 257) as usize] + extra
}

/// Decode a distance from a distance code and extra bits.
pub fn decode_distance(code: u16, extra: u16) -> u16 {
    debug_assert!(code < 30, "Invalid distance code: {}", code);
    DISTANCE_BASE[code as usize] + extra
}

/// Match loop flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Stored blocks only.
    Store,
    /// Greedy matching.
    Fast,
    /// Lazy matching.
    Slow,
}

/// Per-level match policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Quarter the chain walk once a match this long is in hand.
    pub good_length: u16,
    /// Greedy: only re-hash match interiors up to this length.
    /// Lazy: do not look for a better match after one this long.
    pub max_lazy: u16,
    /// Stop searching at a match this long.
    pub nice_length: u16,
    /// Maximum hash chain links followed per search.
    pub max_chain: u16,
    /// Loop used for this level.
    pub flavor: Flavor,
}

const fn level(
    good_length: u16,
    max_lazy: u16,
    nice_length: u16,
    max_chain: u16,
    flavor: Flavor,
) -> LevelConfig {
    LevelConfig {
        good_length,
        max_lazy,
        nice_length,
        max_chain,
        flavor,
    }
}

/// Match policy for levels 0-9.
pub const LEVEL_CONFIG: [LevelConfig; 10] = [
    level(0, 0, 0, 0, Flavor::Store),
    level(4, 4, 8, 4, Flavor::Fast),
    level(4, 5, 16, 8, Flavor::Fast),
    level(4, 6, 32, 32, Flavor::Fast),
    level(4, 4, 16, 16, Flavor::Slow),
    level(8, 16, 32, 32, Flavor::Slow),
    level(8, 16, 128, 128, Flavor::Slow),
    level(8, 32, 128, 256, Flavor::Slow),
    level(32, 128, 258, 1024, Flavor::Slow),
    level(32, 258, 258, 4096, Flavor::Slow),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::canonical_codes;

    #[test]
    fn test_fixed_litlen_lengths() {
        let lengths = FIXED_LITLEN_LENGTHS;

        assert_eq!(lengths[0], 8);
        assert_eq!(lengths[143], 8);
        assert_eq!(lengths[144], 9);
        assert_eq!(lengths[255], 9);
        assert_eq!(lengths[256], 7); // End of block
        assert_eq!(lengths[279], 7);
        assert_eq!(lengths[280], 8);
        assert_eq!(lengths[287], 8);
    }

    #[test]
    fn test_static_codes_match_runtime_assignment() {
        let runtime = canonical_codes(&FIXED_LITLEN_LENGTHS);
        for (i, code) in STATIC_LITLEN_CODES.iter().enumerate() {
            assert_eq!(code.code, runtime[i], "symbol {}", i);
        }
        // EOB is seven zero bits
        assert_eq!(STATIC_LITLEN_CODES[256], Code { code: 0, len: 7 });
        // Literal 0 is 00110000, reversed
        assert_eq!(STATIC_LITLEN_CODES[0].code, 0b00001100);
    }

    #[test]
    fn test_fixed_decode_tables_complete() {
        assert!(
            FIXED_LITLEN_TABLE
                .entries()
                .iter()
                .all(|e| matches!(e, Entry::Symbol { .. }))
        );
        assert_eq!(FIXED_DISTANCE_TABLE.entries().len(), 32);
    }

    #[test]
    fn test_length_to_code_roundtrip() {
        for length in 3..=258 {
            let (code, extra_bits, extra_value) = length_to_code(length);
            assert!(extra_value < (1 << extra_bits) || extra_bits == 0 && extra_value == 0);
            assert_eq!(decode_length(code, extra_value), length);
        }
    }

    #[test]
    fn test_distance_to_code_roundtrip() {
        for distance in 1..=32768u16 {
            let (code, extra_bits, extra_value) = distance_to_code(distance);
            assert!(extra_value < (1 << extra_bits) || extra_bits == 0 && extra_value == 0);
            assert_eq!(decode_distance(code, extra_value), distance);
        }
    }

    #[test]
    fn test_specific_lengths() {
        assert_eq!(length_to_code(3), (257, 0, 0));
        assert_eq!(length_to_code(10), (264, 0, 0));
        assert_eq!(length_to_code(11), (265, 1, 0));
        assert_eq!(length_to_code(12), (265, 1, 1));
        assert_eq!(length_to_code(257), (284, 5, 30));
        assert_eq!(length_to_code(258), (285, 0, 0));
    }

    #[test]
    fn test_specific_distances() {
        assert_eq!(distance_to_code(1), (0, 0, 0));
        assert_eq!(distance_to_code(4), (3, 0, 0));
        assert_eq!(distance_to_code(5), (4, 1, 0));
        assert_eq!(distance_to_code(6), (4, 1, 1));
        assert_eq!(distance_to_code(257), (16, 7, 0));
        assert_eq!(distance_to_code(32768), (29, 13, 8191));
    }

    #[test]
    fn test_level_config() {
        assert_eq!(LEVEL_CONFIG[0].flavor, Flavor::Store);
        assert!(LEVEL_CONFIG[1..4].iter().all(|c| c.flavor == Flavor::Fast));
        assert!(LEVEL_CONFIG[4..].iter().all(|c| c.flavor == Flavor::Slow));
        assert_eq!(LEVEL_CONFIG[9].max_chain, 4096);
    }
}
