//! Huffman coding for DEFLATE.
//!
//! DEFLATE uses canonical Huffman codes: only the code length of every
//! symbol is transmitted, and codes of equal length are consecutive integers
//! ordered by symbol value.
//!
//! # Alphabets
//!
//! - **Literal/Length**: 0-285 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-29 (back-reference distances)
//! - **Code Length**: 0-18 (for encoding dynamic Huffman trees)
//!
//! The encoder side is [`HuffmanBuilder`] plus [`canonical_codes`]. The
//! decoder side is [`DecodeTable`], a two-level lookup table: the low
//! `root_bits` of the input index a root table, and codes longer than that
//! continue in a sub-table the root entry links to.

use crate::tables::MAX_BITS;
use oxiflate_core::BitAccumulator;
use oxiflate_core::error::{OxiflateError, Result};
use std::borrow::Cow;

/// Builder for creating length-limited Huffman code lengths from frequencies.
///
/// Construction is the classic two-smallest merge over a binary heap. Ties
/// between equal frequencies go to the node with the smaller subtree depth,
/// which makes the result deterministic and keeps trees shallow. Lengths that
/// still exceed the limit are redistributed afterwards.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder {
    frequencies: Vec<u32>,
    max_length: u8,
}

impl HuffmanBuilder {
    /// Create a new Huffman builder.
    pub fn new(alphabet_size: usize, max_length: u8) -> Self {
        Self {
            frequencies: vec![0; alphabet_size],
            max_length,
        }
    }

    /// Create a builder over existing counts.
    pub fn from_frequencies(frequencies: &[u32], max_length: u8) -> Self {
        Self {
            frequencies: frequencies.to_vec(),
            max_length,
        }
    }

    /// Add a symbol occurrence.
    pub fn add(&mut self, symbol: u16) {
        self.add_count(symbol, 1);
    }

    /// Add multiple occurrences of a symbol.
    pub fn add_count(&mut self, symbol: u16, count: u32) {
        if let Some(freq) = self.frequencies.get_mut(symbol as usize) {
            *freq += count;
        }
    }

    /// Current frequency table.
    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }

    /// Forget all counts.
    pub fn clear(&mut self) {
        self.frequencies.fill(0);
    }

    /// Build code lengths from frequencies.
    ///
    /// Returns an array where `result[i]` is the code length for symbol `i`.
    /// At least two symbols always receive a code, even if that means
    /// assigning one to an unused symbol, because a one-code tree cannot be
    /// transmitted as a complete prefix code.
    pub fn build_lengths(&self) -> Vec<u8> {
        let elems = self.frequencies.len();
        let nodes = 2 * elems + 1;

        let mut freq: Vec<u32> = Vec::with_capacity(nodes);
        freq.extend_from_slice(&self.frequencies);
        freq.resize(nodes, 0);
        let mut depth = vec![0u8; nodes];
        let mut dad = vec![0usize; nodes];
        let mut len = vec![0u8; nodes];

        // heap[0] is unused; heap[heap_max..] collects nodes in merge order.
        let mut heap = vec![0usize; nodes];
        let mut heap_len = 0usize;
        let mut heap_max = nodes;
        let mut max_code: isize = -1;

        for (symbol, &f) in self.frequencies.iter().enumerate() {
            if f != 0 {
                heap_len += 1;
                heap[heap_len] = symbol;
                max_code = symbol as isize;
            }
        }

        while heap_len < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            heap_len += 1;
            heap[heap_len] = node;
            freq[node] = 1;
            depth[node] = 0;
        }
        let max_code = max_code as usize;

        for k in (1..=heap_len / 2).rev() {
            pq_down(&mut heap, heap_len, &freq, &depth, k);
        }

        let mut node = elems;
        loop {
            let n = heap[1];
            heap[1] = heap[heap_len];
            heap_len -= 1;
            pq_down(&mut heap, heap_len, &freq, &depth, 1);
            let m = heap[1];

            heap_max -= 1;
            heap[heap_max] = n;
            heap_max -= 1;
            heap[heap_max] = m;

            freq[node] = freq[n] + freq[m];
            depth[node] = depth[n].max(depth[m]) + 1;
            dad[n] = node;
            dad[m] = node;

            heap[1] = node;
            node += 1;
            pq_down(&mut heap, heap_len, &freq, &depth, 1);

            if heap_len < 2 {
                break;
            }
        }
        heap_max -= 1;
        heap[heap_max] = heap[1];

        // Root has length 0; every other node is one deeper than its parent.
        let max_length = self.max_length;
        let mut bl_count = [0u16; MAX_BITS + 1];
        let mut overflow = 0i32;
        len[heap[heap_max]] = 0;
        for &n in &heap[heap_max + 1..nodes] {
            let mut bits = len[dad[n]] + 1;
            if bits > max_length {
                bits = max_length;
                overflow += 1;
            }
            len[n] = bits;
            if n <= max_code {
                bl_count[bits as usize] += 1;
            }
        }

        if overflow > 0 {
            // Move leaves up from the deepest level until the code fits again.
            let max = max_length as usize;
            while overflow > 0 {
                let mut bits = max - 1;
                while bl_count[bits] == 0 {
                    bits -= 1;
                }
                bl_count[bits] -= 1;
                bl_count[bits + 1] += 2;
                bl_count[max] -= 1;
                overflow -= 2;
            }

            // Leaves in heap order are sorted by frequency, so reassigning
            // lengths from the longest down keeps frequent symbols short.
            let mut h = nodes;
            for bits in (1..=max).rev() {
                let mut n = bl_count[bits];
                while n != 0 {
                    h -= 1;
                    let m = heap[h];
                    if m > max_code {
                        continue;
                    }
                    len[m] = bits as u8;
                    n -= 1;
                }
            }
        }

        len.truncate(elems);
        len
    }
}

/// Heap order: lower frequency first, then shallower subtree.
#[inline]
fn smaller(freq: &[u32], depth: &[u8], n: usize, m: usize) -> bool {
    freq[n] < freq[m] || (freq[n] == freq[m] && depth[n] <= depth[m])
}

/// Sift `heap[k]` down to restore the heap property.
fn pq_down(heap: &mut [usize], heap_len: usize, freq: &[u32], depth: &[u8], mut k: usize) {
    let v = heap[k];
    let mut j = k << 1;
    while j <= heap_len {
        if j < heap_len && smaller(freq, depth, heap[j + 1], heap[j]) {
            j += 1;
        }
        if smaller(freq, depth, v, heap[j]) {
            break;
        }
        heap[k] = heap[j];
        k = j;
        j <<= 1;
    }
    heap[k] = v;
}

/// Count codes per length. Index 0 is always zero.
pub fn bit_length_counts(lengths: &[u8]) -> [u16; MAX_BITS + 1] {
    let mut counts = [0u16; MAX_BITS + 1];
    for &len in lengths {
        if len > 0 {
            counts[len as usize] += 1;
        }
    }
    counts
}

/// Reverse the low `length` bits of `code`.
#[inline]
pub const fn reverse_bits(code: u16, length: u8) -> u16 {
    if length == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - length as u32)
}

/// Assign canonical codes to code lengths.
///
/// Codes come back bit-reversed, ready to be written LSB-first.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u16> {
    let counts = bit_length_counts(lengths);
    let mut next_code = [0u16; MAX_BITS + 1];
    let mut code = 0u16;
    for bits in 1..=MAX_BITS {
        code = (code + counts[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return 0;
            }
            let code = next_code[len as usize];
            next_code[len as usize] += 1;
            reverse_bits(code, len)
        })
        .collect()
}

/// One slot of a [`DecodeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// A complete code: `len` total bits map to `value`.
    Symbol {
        /// Total code length in bits.
        len: u8,
        /// Decoded symbol.
        value: u16,
    },
    /// Continue in a sub-table indexed by the next `sub_bits` bits.
    Link {
        /// Index bits of the sub-table.
        sub_bits: u8,
        /// Start of the sub-table in the entry array.
        offset: u16,
    },
    /// No code has this prefix.
    Invalid,
}

/// Outcome of decoding one symbol from a [`BitAccumulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A symbol; its bits have been consumed.
    Symbol(u16),
    /// The input ran out before a full code was available.
    NeedInput,
}

/// Multi-level Huffman decode table.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    entries: Cow<'static, [Entry]>,
    root_bits: u32,
}

/// Which alphabet a table decodes; controls the incomplete-code rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The 19-symbol code-length alphabet; must be complete.
    CodeLengths,
    /// Literal/length or distance; a single one-bit code is tolerated.
    Symbols,
}

impl DecodeTable {
    /// Wrap a prebuilt single-level table.
    pub const fn from_static(entries: &'static [Entry], root_bits: u32) -> Self {
        Self {
            entries: Cow::Borrowed(entries),
            root_bits,
        }
    }

    /// A table with no codes; every lookup is invalid.
    pub fn empty() -> Self {
        Self::from_static(&[Entry::Invalid; 2], 1)
    }

    /// Build a table from code lengths.
    ///
    /// Over-subscribed lengths are always rejected. Incomplete lengths are
    /// rejected too, except for the single one-bit code DEFLATE allows in
    /// the literal/length and distance trees. All-zero lengths give an empty
    /// table.
    pub fn from_code_lengths(lengths: &[u8], root_bits: u32, kind: TableKind) -> Result<Self> {
        if lengths.iter().any(|&l| l as usize > MAX_BITS) {
            return Err(OxiflateError::invalid_code_lengths("code length above 15"));
        }
        let counts = bit_length_counts(lengths);

        let max_len = (1..=MAX_BITS).rev().find(|&b| counts[b] != 0).unwrap_or(0);
        if max_len == 0 {
            return Ok(Self::empty());
        }

        let mut left: i32 = 1;
        for &count in &counts[1..] {
            left <<= 1;
            left -= count as i32;
            if left < 0 {
                return Err(OxiflateError::invalid_code_lengths(
                    "over-subscribed code lengths",
                ));
            }
        }
        if left > 0 && (kind == TableKind::CodeLengths || max_len != 1) {
            return Err(OxiflateError::invalid_code_lengths(
                "incomplete code lengths",
            ));
        }

        let root_bits = root_bits.min(max_len as u32);
        let root_size = 1usize << root_bits;
        let root_mask = (root_size - 1) as u16;
        let codes = canonical_codes(lengths);

        // Size each sub-table by its longest code.
        let mut sub_bits = vec![0u8; root_size];
        for (&len, &code) in lengths.iter().zip(&codes) {
            if len as u32 > root_bits {
                let slot = &mut sub_bits[(code & root_mask) as usize];
                *slot = (*slot).max(len - root_bits as u8);
            }
        }

        let mut entries = vec![Entry::Invalid; root_size];
        for (prefix, &bits) in sub_bits.iter().enumerate() {
            if bits > 0 {
                entries[prefix] = Entry::Link {
                    sub_bits: bits,
                    offset: entries.len() as u16,
                };
                entries.resize(entries.len() + (1 << bits), Entry::Invalid);
            }
        }

        for (symbol, (&len, &code)) in lengths.iter().zip(&codes).enumerate() {
            if len == 0 {
                continue;
            }
            let entry = Entry::Symbol {
                len,
                value: symbol as u16,
            };
            if len as u32 <= root_bits {
                let mut index = code as usize;
                while index < root_size {
                    entries[index] = entry;
                    index += 1 << len;
                }
            } else if let Entry::Link { sub_bits, offset } = entries[(code & root_mask) as usize] {
                let step = 1usize << (len as u32 - root_bits);
                let mut index = (code >> root_bits) as usize;
                while index < 1 << sub_bits {
                    entries[offset as usize + index] = entry;
                    index += step;
                }
            }
        }

        Ok(Self {
            entries: Cow::Owned(entries),
            root_bits,
        })
    }

    /// Root table index width.
    pub fn root_bits(&self) -> u32 {
        self.root_bits
    }

    /// All entries, root table first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Decode one symbol, pulling input bytes as needed.
    ///
    /// Bits are consumed only when a complete code was recognised, so a
    /// `NeedInput` result can be retried after more input arrives.
    #[inline]
    pub fn decode(
        &self,
        acc: &mut BitAccumulator,
        input: &[u8],
        pos: &mut usize,
    ) -> Result<Decoded> {
        loop {
            let needed = match self.entries[acc.peek(self.root_bits) as usize] {
                Entry::Symbol { len, value } => {
                    if len as u32 <= acc.bits() {
                        acc.consume(len as u32);
                        return Ok(Decoded::Symbol(value));
                    }
                    len as u32
                }
                Entry::Link { sub_bits, offset } => {
                    let total = self.root_bits + sub_bits as u32;
                    if acc.bits() >= self.root_bits {
                        let index = offset as usize + (acc.peek(total) >> self.root_bits) as usize;
                        match self.entries[index] {
                            Entry::Symbol { len, value } if len as u32 <= acc.bits() => {
                                acc.consume(len as u32);
                                return Ok(Decoded::Symbol(value));
                            }
                            Entry::Symbol { len, .. } => len as u32,
                            _ if acc.bits() >= total => {
                                return Err(OxiflateError::invalid_huffman(acc.bit_position()));
                            }
                            _ => total,
                        }
                    } else {
                        self.root_bits
                    }
                }
                Entry::Invalid => {
                    if acc.bits() >= self.root_bits {
                        return Err(OxiflateError::invalid_huffman(acc.bit_position()));
                    }
                    self.root_bits
                }
            };
            if !acc.need(needed, input, pos) {
                return Ok(Decoded::NeedInput);
            }
        }
    }

    /// Decode with enough bits already buffered for any code.
    ///
    /// The caller guarantees at least 15 buffered bits.
    #[inline(always)]
    pub fn decode_fast(&self, acc: &mut BitAccumulator) -> Result<u16> {
        let mut entry = self.entries[acc.peek(self.root_bits) as usize];
        if let Entry::Link { sub_bits, offset } = entry {
            let total = self.root_bits + sub_bits as u32;
            entry = self.entries[offset as usize + (acc.peek(total) >> self.root_bits) as usize];
        }
        match entry {
            Entry::Symbol { len, value } => {
                acc.consume(len as u32);
                Ok(value)
            }
            _ => Err(OxiflateError::invalid_huffman(acc.bit_position())),
        }
    }
}

/// Build a single-level table at compile time.
///
/// `SIZE` must be `1 << max_length`; every length must fit in that root.
pub const fn build_static_table<const N: usize, const SIZE: usize>(
    lengths: &[u8; N],
) -> [Entry; SIZE] {
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

    let mut table = [Entry::Invalid; SIZE];
    let mut symbol = 0;
    while symbol < N {
        let len = lengths[symbol];
        if len > 0 {
            let rev = reverse_bits(next_code[len as usize], len);
            next_code[len as usize] += 1;
            let mut index = rev as usize;
            while index < SIZE {
                table[index] = Entry::Symbol {
                    len,
                    value: symbol as u16,
                };
                index += 1 << len;
            }
        }
        symbol += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(table: &DecodeTable, data: &[u8], count: usize) -> Vec<u16> {
        let mut acc = BitAccumulator::new();
        let mut pos = 0;
        (0..count)
            .map(|_| match table.decode(&mut acc, data, &mut pos).unwrap() {
                Decoded::Symbol(s) => s,
                Decoded::NeedInput => panic!("ran out of input"),
            })
            .collect()
    }

    #[test]
    fn test_decode_simple() {
        // A=0, B=10, C=11; LSB-first: A=0, B=01, C=11
        let lengths = [1u8, 2, 2];
        let table = DecodeTable::from_code_lengths(&lengths, 9, TableKind::Symbols).unwrap();

        // 0 01 11 0 packed LSB-first = 0b00011010
        assert_eq!(decode_all(&table, &[0b00011010], 4), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_decode_with_subtables() {
        // Lengths 1..=10 plus a second 10: complete, and deeper than a 4-bit root.
        let mut lengths: Vec<u8> = (1..=10).collect();
        lengths.push(10);
        let table = DecodeTable::from_code_lengths(&lengths, 4, TableKind::Symbols).unwrap();
        assert!(table.entries().len() > 16);

        let codes = canonical_codes(&lengths);
        let mut writer = oxiflate_core::BitWriter::new(Vec::new());
        let order = [10usize, 0, 9, 4, 5, 1];
        for &s in &order {
            writer.write_bits(codes[s] as u32, lengths[s] as u32).unwrap();
        }
        let data = writer.into_inner().unwrap();

        let decoded = decode_all(&table, &data, order.len());
        assert_eq!(decoded, order.iter().map(|&s| s as u16).collect::<Vec<_>>());

        // Fast path agrees
        let mut acc = BitAccumulator::new();
        let mut pos = 0;
        acc.refill(&data, &mut pos);
        for &s in &order {
            assert_eq!(table.decode_fast(&mut acc).unwrap(), s as u16);
        }
    }

    #[test]
    fn test_decode_resumes() {
        let lengths = [2u8, 2, 2, 3, 3];
        let table = DecodeTable::from_code_lengths(&lengths, 2, TableKind::Symbols).unwrap();
        let codes = canonical_codes(&lengths);

        let mut writer = oxiflate_core::BitWriter::new(Vec::new());
        for s in [4usize, 3, 4] {
            writer.write_bits(codes[s] as u32, lengths[s] as u32).unwrap();
        }
        let data = writer.into_inner().unwrap();
        assert_eq!(data.len(), 2);

        let mut acc = BitAccumulator::new();
        let mut pos = 0;
        let first = &data[..1];
        assert_eq!(table.decode(&mut acc, first, &mut pos).unwrap(), Decoded::Symbol(4));
        assert_eq!(table.decode(&mut acc, first, &mut pos).unwrap(), Decoded::Symbol(3));
        assert_eq!(table.decode(&mut acc, first, &mut pos).unwrap(), Decoded::NeedInput);

        let mut pos = 0;
        assert_eq!(
            table.decode(&mut acc, &data[1..], &mut pos).unwrap(),
            Decoded::Symbol(4)
        );
    }

    #[test]
    fn test_oversubscribed_rejected() {
        let lengths = [1u8, 1, 1];
        assert!(DecodeTable::from_code_lengths(&lengths, 9, TableKind::Symbols).is_err());
    }

    #[test]
    fn test_incomplete_rules() {
        // A lone one-bit code is fine for symbols, not for code lengths.
        let single = [0u8, 1, 0];
        assert!(DecodeTable::from_code_lengths(&single, 9, TableKind::Symbols).is_ok());
        assert!(DecodeTable::from_code_lengths(&single, 7, TableKind::CodeLengths).is_err());

        let gappy = [2u8, 2, 2, 0];
        assert!(DecodeTable::from_code_lengths(&gappy, 9, TableKind::Symbols).is_err());
    }

    #[test]
    fn test_single_code_invalid_prefix() {
        let table = DecodeTable::from_code_lengths(&[0, 1], 9, TableKind::Symbols).unwrap();
        let mut acc = BitAccumulator::new();
        let mut pos = 0;
        assert_eq!(
            table.decode(&mut acc, &[0x00], &mut pos).unwrap(),
            Decoded::Symbol(1)
        );

        let mut fresh = BitAccumulator::new();
        assert!(table.decode(&mut fresh, &[0xFF], &mut 0).is_err());
    }

    #[test]
    fn test_empty_table() {
        let table = DecodeTable::from_code_lengths(&[0, 0, 0], 9, TableKind::Symbols).unwrap();
        let mut acc = BitAccumulator::new();
        assert!(table.decode(&mut acc, &[0], &mut 0).is_err());
    }

    #[test]
    fn test_huffman_builder() {
        let mut builder = HuffmanBuilder::new(4, 15);
        builder.add_count(0, 100); // High frequency
        builder.add_count(1, 50);
        builder.add_count(2, 25);
        builder.add_count(3, 25);

        let lengths = builder.build_lengths();
        assert_eq!(lengths, vec![1, 2, 3, 3]);
    }

    #[test]
    fn test_builder_forces_two_codes() {
        let mut builder = HuffmanBuilder::new(30, 15);
        builder.add_count(7, 10);
        let lengths = builder.build_lengths();
        // An unused partner gets a code so the tree is complete.
        assert_eq!(lengths.iter().filter(|&&l| l > 0).count(), 2);
        assert_eq!(lengths[7], 1);
        assert_eq!(lengths[0], 1);

        let builder = HuffmanBuilder::new(30, 15);
        let lengths = builder.build_lengths();
        assert_eq!(&lengths[..3], &[1, 1, 0]);
    }

    #[test]
    fn test_builder_length_limit() {
        // Fibonacci frequencies produce a maximally skewed tree.
        let mut fib = vec![1u32, 1];
        while fib.len() < 25 {
            let n = fib[fib.len() - 1] + fib[fib.len() - 2];
            fib.push(n);
        }
        let builder = HuffmanBuilder::from_frequencies(&fib, 7);
        let lengths = builder.build_lengths();

        assert!(lengths.iter().all(|&l| (1..=7).contains(&l)));
        let kraft: u32 = lengths.iter().map(|&l| 1u32 << (7 - l)).sum();
        assert!(kraft <= 1 << 7);
    }

    #[test]
    fn test_builder_deterministic_ties() {
        let builder = HuffmanBuilder::from_frequencies(&[5, 5, 5, 5, 5, 5], 15);
        let a = builder.build_lengths();
        let b = builder.build_lengths();
        assert_eq!(a, b);
        let kraft: u32 = a.iter().map(|&l| 1u32 << (15 - l)).sum();
        assert_eq!(kraft, 1 << 15);
    }

    #[test]
    fn test_canonical_codes() {
        // RFC 1951 section 3.2.2 example: ABCDEFGH with lengths 3,3,3,3,3,2,4,4
        let lengths = [3u8, 3, 3, 3, 3, 2, 4, 4];
        let codes = canonical_codes(&lengths);
        let expected = [0b010u16, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111];
        for (i, (&code, &len)) in codes.iter().zip(&lengths).enumerate() {
            assert_eq!(reverse_bits(code, len), expected[i], "symbol {}", i);
        }
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(0b101, 3), 0b101);
        assert_eq!(reverse_bits(0b1100, 4), 0b0011);
        assert_eq!(reverse_bits(0b10101010, 8), 0b01010101);
        assert_eq!(reverse_bits(0, 0), 0);
    }
}
