//! Block encoder: symbol tallies, tree construction and block emission.
//!
//! The match loops feed literals and matches into a [`BlockEncoder`]. When
//! the symbol buffer fills, or on a flush, the block is closed: the encoder
//! builds dynamic trees for the tallied frequencies, prices the stored,
//! fixed and dynamic encodings, and writes whichever is smallest.

use crate::huffman::{HuffmanBuilder, canonical_codes};
use crate::lz77::Lz77Token;
use crate::tables::{
    CODE_LENGTH_ORDER, CODELEN_CODES, CODELEN_EXTRA_BITS, Code, DISTANCE_CODES,
    DISTANCE_EXTRA_BITS, END_OF_BLOCK, LENGTH_EXTRA_BITS, LITERALS, LITLEN_CODES, MAX_BITS,
    MAX_BL_BITS, MAX_STORED, REP_3_6, REPZ_3_10, REPZ_11_138, STATIC_DISTANCE_CODES,
    STATIC_LITLEN_CODES, block_type, distance_to_code, length_to_code,
};
use oxiflate_core::bitstream::BitWriter;
use oxiflate_core::error::Result;
use oxiflate_core::traits::Strategy;
use tracing::trace;

/// Symbols buffered before a block is forced out.
pub const SYMBOL_LIMIT: usize = (1 << 14) - 1;

/// Encoding chosen for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Raw bytes with a length header.
    Stored,
    /// The fixed RFC 1951 codes.
    Fixed,
    /// Codes built for this block.
    Dynamic,
}

/// One run-length coded entry of a tree description: a code-length symbol
/// (0-18) and the value of its extra bits.
type LengthSymbol = (u8, u8);

/// Dynamic trees for one block, ready to transmit.
struct DynamicTrees {
    litlen: Vec<Code>,
    distance: Vec<Code>,
    codelen: Vec<Code>,
    codelen_lengths: Vec<u8>,
    header: Vec<LengthSymbol>,
    litlen_count: usize,
    distance_count: usize,
    codelen_count: usize,
    /// Size of the whole block in bits, header included.
    cost: u64,
}

fn to_codes(lengths: &[u8]) -> Vec<Code> {
    canonical_codes(lengths)
        .into_iter()
        .zip(lengths)
        .map(|(code, &len)| Code { code, len })
        .collect()
}

/// Number of leading entries up to the last non-zero length.
fn used_prefix(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&l| l != 0).map_or(0, |i| i + 1)
}

/// Run-length code a sequence of code lengths with symbols 16, 17 and 18.
///
/// A non-zero length is always sent once literally before it can be
/// repeated with symbol 16; zero runs use 17 or 18 directly.
pub fn rle_code_lengths(lengths: &[u8], out: &mut Vec<LengthSymbol>) {
    let mut prev: Option<u8> = None;
    let mut i = 0;

    while i < lengths.len() {
        let current = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == current).count();
        let mut count = run;

        if current == 0 {
            while count >= 11 {
                let n = count.min(138);
                out.push((REPZ_11_138 as u8, (n - 11) as u8));
                count -= n;
            }
            if count >= 3 {
                out.push((REPZ_3_10 as u8, (count - 3) as u8));
                count = 0;
            }
        } else {
            if prev != Some(current) {
                out.push((current, 0));
                count -= 1;
            }
            while count >= 3 {
                let n = count.min(6);
                out.push((REP_3_6 as u8, (n - 3) as u8));
                count -= n;
            }
        }
        for _ in 0..count {
            out.push((current, 0));
        }

        prev = Some(current);
        i += run;
    }
}

/// Accumulates the symbols of the current block.
#[derive(Debug, Clone)]
pub struct BlockEncoder {
    symbols: Vec<Lz77Token>,
    litlen_freq: [u32; LITLEN_CODES],
    distance_freq: [u32; DISTANCE_CODES],
    strategy: Strategy,
    store_only: bool,
}

impl BlockEncoder {
    /// Create an encoder. With `store_only` every block is stored.
    pub fn new(strategy: Strategy, store_only: bool) -> Self {
        Self {
            symbols: Vec::with_capacity(SYMBOL_LIMIT),
            litlen_freq: [0; LITLEN_CODES],
            distance_freq: [0; DISTANCE_CODES],
            strategy,
            store_only,
        }
    }

    /// Drop the tallied symbols.
    pub fn reset(&mut self) {
        self.symbols.clear();
        self.litlen_freq.fill(0);
        self.distance_freq.fill(0);
    }

    /// Whether no symbol has been tallied.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Tallied symbols.
    pub fn symbols(&self) -> &[Lz77Token] {
        &self.symbols
    }

    /// Record a literal. Returns `true` when the block must be flushed.
    #[inline]
    pub fn tally_literal(&mut self, byte: u8) -> bool {
        self.symbols.push(Lz77Token::Literal(byte));
        self.litlen_freq[byte as usize] += 1;
        self.symbols.len() == SYMBOL_LIMIT
    }

    /// Record a match. Returns `true` when the block must be flushed.
    #[inline]
    pub fn tally_match(&mut self, distance: usize, length: usize) -> bool {
        let (length_symbol, _, _) = length_to_code(length as u16);
        let (distance_symbol, _, _) = distance_to_code(distance as u16);
        self.symbols.push(Lz77Token::Match {
            length: length as u16,
            distance: distance as u16,
        });
        self.litlen_freq[length_symbol as usize] += 1;
        self.distance_freq[distance_symbol as usize] += 1;
        self.symbols.len() == SYMBOL_LIMIT
    }

    fn extra_bits(&self) -> u64 {
        let length_extra: u64 = LENGTH_EXTRA_BITS
            .iter()
            .zip(&self.litlen_freq[LITERALS + 1..])
            .map(|(&bits, &freq)| bits as u64 * freq as u64)
            .sum();
        let distance_extra: u64 = DISTANCE_EXTRA_BITS
            .iter()
            .zip(&self.distance_freq)
            .map(|(&bits, &freq)| bits as u64 * freq as u64)
            .sum();
        length_extra + distance_extra
    }

    fn fixed_cost(&self) -> u64 {
        let litlen: u64 = self
            .litlen_freq
            .iter()
            .zip(STATIC_LITLEN_CODES.iter())
            .map(|(&freq, code)| freq as u64 * code.len as u64)
            .sum();
        let distance: u64 = self
            .distance_freq
            .iter()
            .zip(STATIC_DISTANCE_CODES.iter())
            .map(|(&freq, code)| freq as u64 * code.len as u64)
            .sum();
        3 + litlen + distance + STATIC_LITLEN_CODES[END_OF_BLOCK as usize].len as u64
            + self.extra_bits()
    }

    fn build_dynamic(&self) -> DynamicTrees {
        let mut litlen_freq = self.litlen_freq;
        litlen_freq[END_OF_BLOCK as usize] = 1;

        let litlen_lengths =
            HuffmanBuilder::from_frequencies(&litlen_freq, MAX_BITS as u8).build_lengths();
        let distance_lengths =
            HuffmanBuilder::from_frequencies(&self.distance_freq, MAX_BITS as u8).build_lengths();

        let litlen_count = used_prefix(&litlen_lengths).max(LITERALS + 1);
        let distance_count = used_prefix(&distance_lengths).max(1);

        let mut header = Vec::with_capacity(litlen_count + distance_count);
        rle_code_lengths(&litlen_lengths[..litlen_count], &mut header);
        rle_code_lengths(&distance_lengths[..distance_count], &mut header);

        let mut codelen_builder = HuffmanBuilder::new(CODELEN_CODES, MAX_BL_BITS as u8);
        for &(symbol, _) in &header {
            codelen_builder.add(symbol as u16);
        }
        let codelen_lengths = codelen_builder.build_lengths();

        let codelen_count = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&symbol| codelen_lengths[symbol] != 0)
            .map_or(0, |i| i + 1)
            .max(4);

        let header_cost: u64 = header
            .iter()
            .map(|&(symbol, _)| {
                codelen_lengths[symbol as usize] as u64
                    + CODELEN_EXTRA_BITS[symbol as usize] as u64
            })
            .sum();
        let litlen_cost: u64 = litlen_freq
            .iter()
            .zip(&litlen_lengths)
            .map(|(&freq, &len)| freq as u64 * len as u64)
            .sum();
        let distance_cost: u64 = self
            .distance_freq
            .iter()
            .zip(&distance_lengths)
            .map(|(&freq, &len)| freq as u64 * len as u64)
            .sum();
        let cost = 3
            + 5
            + 5
            + 4
            + 3 * codelen_count as u64
            + header_cost
            + litlen_cost
            + distance_cost
            + self.extra_bits();

        DynamicTrees {
            litlen: to_codes(&litlen_lengths),
            distance: to_codes(&distance_lengths),
            codelen: to_codes(&codelen_lengths),
            codelen_lengths,
            header,
            litlen_count,
            distance_count,
            codelen_count,
            cost,
        }
    }

    /// Close the current block and write it.
    ///
    /// `stored` holds the raw bytes the block covers, when they are still
    /// available; without them the stored encoding is not an option.
    pub fn flush_block(
        &mut self,
        out: &mut BitWriter<Vec<u8>>,
        stored: Option<&[u8]>,
        last: bool,
    ) -> Result<BlockKind> {
        let stored = stored.filter(|bytes| bytes.len() <= MAX_STORED);
        let stored_len = stored.map_or(0, <[u8]>::len);

        let (dynamic, opt_bytes, fixed_bytes) = if self.store_only {
            let bytes = stored_len as u64 + 5;
            (None, bytes, bytes)
        } else {
            let dynamic = self.build_dynamic();
            let fixed_bytes = (self.fixed_cost() + 7) >> 3;
            let mut opt_bytes = (dynamic.cost + 7) >> 3;
            if fixed_bytes <= opt_bytes || self.strategy == Strategy::Fixed {
                opt_bytes = fixed_bytes;
            }
            trace!(
                symbols = self.symbols.len(),
                stored_len,
                fixed_bytes,
                dynamic_bytes = (dynamic.cost + 7) >> 3,
                "pricing block"
            );
            (Some(dynamic), opt_bytes, fixed_bytes)
        };

        let kind = match (stored, dynamic) {
            (Some(bytes), _) if stored_len as u64 + 4 <= opt_bytes => {
                write_stored_block(out, bytes, last)?;
                BlockKind::Stored
            }
            (_, Some(trees)) if fixed_bytes != opt_bytes => {
                out.write_bits((block_type::DYNAMIC << 1) | last as u32, 3)?;
                self.send_trees(out, &trees)?;
                self.compress_block(out, &trees.litlen, &trees.distance)?;
                BlockKind::Dynamic
            }
            _ => {
                out.write_bits((block_type::FIXED << 1) | last as u32, 3)?;
                self.compress_block(out, &STATIC_LITLEN_CODES, &STATIC_DISTANCE_CODES)?;
                BlockKind::Fixed
            }
        };

        self.reset();
        if last {
            out.align_to_byte()?;
        }
        Ok(kind)
    }

    fn send_trees(&self, out: &mut BitWriter<Vec<u8>>, trees: &DynamicTrees) -> Result<()> {
        out.write_bits((trees.litlen_count - (LITERALS + 1)) as u32, 5)?;
        out.write_bits((trees.distance_count - 1) as u32, 5)?;
        out.write_bits((trees.codelen_count - 4) as u32, 4)?;
        for &symbol in &CODE_LENGTH_ORDER[..trees.codelen_count] {
            out.write_bits(trees.codelen_lengths[symbol] as u32, 3)?;
        }
        for &(symbol, extra) in &trees.header {
            let code = trees.codelen[symbol as usize];
            out.write_bits(code.code as u32, code.len as u32)?;
            let extra_bits = CODELEN_EXTRA_BITS[symbol as usize];
            if extra_bits > 0 {
                out.write_bits(extra as u32, extra_bits as u32)?;
            }
        }
        Ok(())
    }

    fn compress_block(
        &self,
        out: &mut BitWriter<Vec<u8>>,
        litlen: &[Code],
        distance: &[Code],
    ) -> Result<()> {
        for token in &self.symbols {
            match *token {
                Lz77Token::Literal(byte) => {
                    let code = litlen[byte as usize];
                    out.write_bits(code.code as u32, code.len as u32)?;
                }
                Lz77Token::Match { length, distance: dist } => {
                    let (symbol, extra_bits, extra) = length_to_code(length);
                    let code = litlen[symbol as usize];
                    out.write_bits(code.code as u32, code.len as u32)?;
                    out.write_bits(extra as u32, extra_bits as u32)?;

                    let (symbol, extra_bits, extra) = distance_to_code(dist);
                    let code = distance[symbol as usize];
                    out.write_bits(code.code as u32, code.len as u32)?;
                    out.write_bits(extra as u32, extra_bits as u32)?;
                }
            }
        }
        let eob = litlen[END_OF_BLOCK as usize];
        out.write_bits(eob.code as u32, eob.len as u32)
    }
}

/// Write a stored block: header bits, alignment, LEN, NLEN, payload.
pub fn write_stored_block(out: &mut BitWriter<Vec<u8>>, data: &[u8], last: bool) -> Result<()> {
    debug_assert!(data.len() <= MAX_STORED);
    out.write_bits((block_type::STORED << 1) | last as u32, 3)?;
    out.align_to_byte()?;
    let len = data.len() as u16;
    out.write_bytes(&len.to_le_bytes())?;
    out.write_bytes(&(!len).to_le_bytes())?;
    out.write_bytes(data)
}

/// Write an empty fixed-code block so everything before it is decodable.
///
/// Up to seven bits may remain buffered in the writer afterwards.
pub fn write_empty_fixed_block(out: &mut BitWriter<Vec<u8>>) -> Result<()> {
    out.write_bits(block_type::FIXED << 1, 3)?;
    let eob = STATIC_LITLEN_CODES[END_OF_BLOCK as usize];
    out.write_bits(eob.code as u32, eob.len as u32)?;
    out.flush_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish(writer: BitWriter<Vec<u8>>) -> Vec<u8> {
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_rle_literal_then_repeat() {
        let mut out = Vec::new();
        rle_code_lengths(&[8, 8, 8, 8, 8, 8, 8, 8], &mut out);
        assert_eq!(out, vec![(8, 0), (16, 3), (8, 0)]);
    }

    #[test]
    fn test_rle_zero_runs() {
        let mut out = Vec::new();
        rle_code_lengths(&[0; 150], &mut out);
        assert_eq!(out, vec![(18, 127), (18, 1)]);

        out.clear();
        rle_code_lengths(&[3, 0, 0, 5, 5, 5, 5], &mut out);
        assert_eq!(out, vec![(3, 0), (0, 0), (0, 0), (5, 0), (16, 0)]);
    }

    #[test]
    fn test_rle_continues_previous_length() {
        let mut out = Vec::new();
        rle_code_lengths(&[4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4], &mut out);
        // One literal, then 11 repeats: 6 + 5.
        assert_eq!(out, vec![(4, 0), (16, 3), (16, 2)]);
    }

    #[test]
    fn test_empty_final_block_is_fixed() {
        let mut encoder = BlockEncoder::new(Strategy::Default, false);
        let mut out = BitWriter::new(Vec::new());
        let kind = encoder.flush_block(&mut out, Some(&[]), true).unwrap();
        assert_eq!(kind, BlockKind::Fixed);
        assert_eq!(finish(out), vec![0x03, 0x00]);
    }

    #[test]
    fn test_store_only_uses_stored_blocks() {
        let mut encoder = BlockEncoder::new(Strategy::Default, true);
        let mut out = BitWriter::new(Vec::new());
        let kind = encoder.flush_block(&mut out, Some(b"abc"), true).unwrap();
        assert_eq!(kind, BlockKind::Stored);
        assert_eq!(finish(out), vec![0x01, 3, 0, 0xFC, 0xFF, b'a', b'b', b'c']);
    }

    #[test]
    fn test_incompressible_block_is_stored() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut encoder = BlockEncoder::new(Strategy::Default, false);
        for &b in &data {
            encoder.tally_literal(b);
        }
        let mut out = BitWriter::new(Vec::new());
        let kind = encoder.flush_block(&mut out, Some(&data), true).unwrap();
        assert_eq!(kind, BlockKind::Stored);
        assert_eq!(finish(out).len(), 256 + 5);
    }

    #[test]
    fn test_skewed_block_is_dynamic() {
        let mut encoder = BlockEncoder::new(Strategy::Default, false);
        for _ in 0..2000 {
            encoder.tally_literal(b'a');
        }
        for _ in 0..50 {
            encoder.tally_literal(b'b');
        }
        let mut out = BitWriter::new(Vec::new());
        let kind = encoder.flush_block(&mut out, None, true).unwrap();
        assert_eq!(kind, BlockKind::Dynamic);
        assert!(encoder.is_empty());
    }

    #[test]
    fn test_fixed_strategy_never_dynamic() {
        let mut encoder = BlockEncoder::new(Strategy::Fixed, false);
        for _ in 0..2000 {
            encoder.tally_literal(b'a');
        }
        let mut out = BitWriter::new(Vec::new());
        let kind = encoder.flush_block(&mut out, None, false).unwrap();
        assert_eq!(kind, BlockKind::Fixed);
    }

    #[test]
    fn test_tally_limit() {
        let mut encoder = BlockEncoder::new(Strategy::Default, false);
        for _ in 0..SYMBOL_LIMIT - 1 {
            assert!(!encoder.tally_literal(0));
        }
        assert!(encoder.tally_match(1, 3));
    }

    #[test]
    fn test_sync_marker_bytes() {
        let mut out = BitWriter::new(Vec::new());
        write_stored_block(&mut out, &[], false).unwrap();
        assert_eq!(finish(out), vec![0x00, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_empty_fixed_block_bits() {
        let mut out = BitWriter::new(Vec::new());
        write_empty_fixed_block(&mut out).unwrap();
        assert_eq!(out.bits_written(), 10);
        assert_eq!(out.get_ref(), &vec![0x02]);
    }
}
