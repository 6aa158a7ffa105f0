//! DEFLATE decompression (inflate).
//!
//! [`Inflater`] decodes RFC 1951 streams incrementally. Its position in the
//! stream is an explicit [`Mode`], so a call can stop at any byte boundary of
//! the input and pick up again with the next slice:
//!
//! ```text
//! Type ─┬─> Lens ──> Stored ───────────────┐
//!       ├─> Codes (fixed tables) ──────────┤
//!       └─> Table ─> BitTree ─> DistTree ─> Codes
//!                                          │
//!   non-final block: back to Type <────────┤
//!   final block:     Dry ─> Done <─────────┘
//! ```
//!
//! Any malformed input moves to `Bad`, which is terminal.
//!
//! Decoded bytes go to an [`InflateWindow`] first and are drained into the
//! caller's output. When a call stops for any reason other than running out
//! of input, whole bytes the decoder pulled but did not use are handed back,
//! so once the stream is done the consumed count points exactly at whatever
//! follows it (a zlib or gzip trailer).

use crate::huffman::{DecodeTable, Decoded, TableKind};
use crate::tables::{
    CODE_LENGTH_ORDER, CODELEN_CODES, DISTANCE_BASE, DISTANCE_CODES, DISTANCE_EXTRA_BITS,
    END_OF_BLOCK, FIXED_DISTANCE_TABLE, FIXED_LITLEN_TABLE, LENGTH_BASE, LENGTH_EXTRA_BITS,
    LITLEN_CODES, MAX_MATCH, REP_3_6, REPZ_3_10, REPZ_11_138,
};
use oxiflate_core::BitAccumulator;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::ringbuffer::InflateWindow;
use oxiflate_core::traits::{DecompressStatus, Decompressor};
use tracing::{debug, trace};

/// Input bytes the fast loop wants available before it runs.
const FAST_MIN_INPUT: usize = 10;

/// Root index bits of dynamic literal/length tables.
const LITLEN_ROOT_BITS: u32 = 9;
/// Root index bits of dynamic distance tables.
const DISTANCE_ROOT_BITS: u32 = 6;

/// Decompression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateOptions {
    /// Window size exponent (8-15). Must be at least the encoder's.
    pub window_bits: u8,
}

impl Default for InflateOptions {
    fn default() -> Self {
        Self { window_bits: 15 }
    }
}

impl InflateOptions {
    /// Set the window size exponent.
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if !(8..=15).contains(&self.window_bits) {
            return Err(OxiflateError::invalid_config(format!(
                "window bits must be 8-15, got {}",
                self.window_bits
            )));
        }
        Ok(())
    }
}

/// Where the decoder is in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Expecting a 3-bit block header.
    Type,
    /// Expecting the LEN/NLEN pair of a stored block.
    Lens,
    /// Copying a stored block; bytes left.
    Stored(usize),
    /// Expecting HLIT, HDIST and HCLEN.
    Table,
    /// Reading the code-length code lengths.
    BitTree,
    /// Decoding the literal/length and distance code lengths.
    DistTree,
    /// Decoding compressed symbols.
    Codes,
    /// Final block decoded; draining the window.
    Dry,
    /// Stream complete.
    Done,
    /// Malformed input seen; terminal.
    Bad,
}

/// Resume point inside a compressed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeState {
    /// Next literal/length symbol.
    Symbol,
    /// Extra bits of a length.
    LengthExtra { base: u16, bits: u8 },
    /// Distance symbol of a match.
    Distance { length: usize },
    /// Extra bits of a distance.
    DistanceExtra { length: usize, base: u16, bits: u8 },
    /// Copying a match.
    Copy { length: usize, distance: usize },
}

/// Code length section of a dynamic block header.
#[derive(Debug, Clone)]
struct DynamicHeader {
    hlit: usize,
    hdist: usize,
    hclen: usize,
    index: usize,
    lengths: [u8; LITLEN_CODES + DISTANCE_CODES],
    codelen_lengths: [u8; CODELEN_CODES],
    codelen_table: DecodeTable,
    /// Repeat symbol whose extra bits have not arrived yet.
    repeat: Option<u16>,
}

impl Default for DynamicHeader {
    fn default() -> Self {
        Self {
            hlit: 0,
            hdist: 0,
            hclen: 0,
            index: 0,
            lengths: [0; LITLEN_CODES + DISTANCE_CODES],
            codelen_lengths: [0; CODELEN_CODES],
            codelen_table: DecodeTable::empty(),
            repeat: None,
        }
    }
}

/// Why a decoding run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// The input slice is exhausted.
    NeedInput,
    /// The window has no room until it is drained.
    WindowFull,
    /// The final block ended.
    StreamEnd,
}

/// Streaming DEFLATE decompressor.
#[derive(Debug, Clone)]
pub struct Inflater {
    options: InflateOptions,
    mode: Mode,
    last_block: bool,
    acc: BitAccumulator,
    window: InflateWindow,
    code_state: CodeState,
    header: DynamicHeader,
    litlen: DecodeTable,
    distance: DecodeTable,
    dynamic: bool,
    failure: Option<String>,
    total_in: u64,
    total_out: u64,
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Inflater {
    /// Create a decompressor with a 32 KiB window.
    pub fn new() -> Self {
        Self::build(InflateOptions::default())
    }

    /// Create a decompressor from validated options.
    pub fn with_options(options: InflateOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: InflateOptions) -> Self {
        Self {
            options,
            mode: Mode::Type,
            last_block: false,
            acc: BitAccumulator::new(),
            window: InflateWindow::new(1 << options.window_bits),
            code_state: CodeState::Symbol,
            header: DynamicHeader::default(),
            litlen: DecodeTable::empty(),
            distance: DecodeTable::empty(),
            dynamic: false,
            failure: None,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Create a decompressor with a preset dictionary.
    pub fn with_dictionary(dictionary: &[u8]) -> Self {
        let mut inflater = Self::new();
        inflater.window.preload_dictionary(dictionary);
        inflater
    }

    /// Seed the history with a preset dictionary.
    ///
    /// Only valid before any output has been produced.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.total_out > 0 || self.window.pending() > 0 || self.mode != Mode::Type {
            return Err(OxiflateError::invalid_state(
                "dictionary must be set before decompression starts",
            ));
        }
        self.window.preload_dictionary(dictionary);
        Ok(())
    }

    /// Options in effect.
    pub fn options(&self) -> &InflateOptions {
        &self.options
    }

    /// Current decoder mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Whether the stream is complete and fully drained.
    pub fn is_finished(&self) -> bool {
        self.mode == Mode::Done
    }

    /// Forget all state and start a new stream.
    pub fn reset(&mut self) {
        self.mode = Mode::Type;
        self.last_block = false;
        self.acc.reset();
        self.window.clear();
        self.code_state = CodeState::Symbol;
        self.header = DynamicHeader::default();
        self.litlen = DecodeTable::empty();
        self.distance = DecodeTable::empty();
        self.dynamic = false;
        self.failure = None;
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Decompress from `input` into `output`.
    ///
    /// Returns (bytes consumed, bytes produced, status).
    pub fn inflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        if let Some(reason) = &self.failure {
            return Err(OxiflateError::corrupted(
                self.total_in,
                format!("stream already failed: {}", reason),
            ));
        }

        let mut pos = 0;
        let mut out_pos = 0;

        let result = self.run(input, &mut pos, output, &mut out_pos);

        match result {
            Ok(()) => {
                let status = match self.mode {
                    Mode::Done => DecompressStatus::Done,
                    _ if self.window.pending() > 0 => DecompressStatus::NeedsOutput,
                    _ => DecompressStatus::NeedsInput,
                };
                // On NeedsInput every buffered bit belongs to the next symbol.
                if status != DecompressStatus::NeedsInput {
                    self.acc.give_back(&mut pos);
                }
                self.total_in += pos as u64;
                self.total_out += out_pos as u64;
                Ok((pos, out_pos, status))
            }
            Err(err) => {
                debug!(error = %err, "inflate failed");
                self.mode = Mode::Bad;
                self.failure = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        input: &[u8],
        pos: &mut usize,
        output: &mut [u8],
        out_pos: &mut usize,
    ) -> Result<()> {
        loop {
            *out_pos += self.window.drain_into(&mut output[*out_pos..]);

            match self.mode {
                Mode::Done => return Ok(()),
                Mode::Dry => {
                    if self.window.pending() == 0 {
                        self.mode = Mode::Done;
                        trace!(total_in = self.total_in, "inflate stream complete");
                    }
                    return Ok(());
                }
                _ => {}
            }
            if self.window.free() == 0 {
                return Ok(());
            }

            match self.decode(input, pos)? {
                Stop::NeedInput => {
                    *out_pos += self.window.drain_into(&mut output[*out_pos..]);
                    return Ok(());
                }
                Stop::WindowFull | Stop::StreamEnd => {}
            }
        }
    }

    fn end_of_block(&mut self) {
        self.mode = if self.last_block { Mode::Dry } else { Mode::Type };
    }

    /// Run the state machine until input or window space runs out.
    fn decode(&mut self, input: &[u8], pos: &mut usize) -> Result<Stop> {
        loop {
            match self.mode {
                Mode::Type => {
                    if !self.acc.need(3, input, pos) {
                        return Ok(Stop::NeedInput);
                    }
                    let header_position = self.acc.bit_position();
                    self.last_block = self.acc.take(1) == 1;
                    let block_type = self.acc.take(2);
                    trace!(block_type, last = self.last_block, "block header");
                    match block_type {
                        0 => {
                            self.acc.align();
                            self.mode = Mode::Lens;
                        }
                        1 => {
                            self.dynamic = false;
                            self.code_state = CodeState::Symbol;
                            self.mode = Mode::Codes;
                        }
                        2 => self.mode = Mode::Table,
                        _ => {
                            return Err(OxiflateError::invalid_block_type(
                                block_type as u8,
                                header_position,
                            ));
                        }
                    }
                }

                Mode::Lens => {
                    if !self.acc.need(32, input, pos) {
                        return Ok(Stop::NeedInput);
                    }
                    let len = self.acc.take(16) as u16;
                    let nlen = self.acc.take(16) as u16;
                    if len != !nlen {
                        return Err(OxiflateError::corrupted(
                            self.acc.bit_position() / 8,
                            format!("stored block length {:#06x} does not match {:#06x}", len, nlen),
                        ));
                    }
                    trace!(len, "stored block");
                    self.mode = Mode::Stored(len as usize);
                }

                Mode::Stored(remaining) => {
                    if remaining == 0 {
                        self.end_of_block();
                        continue;
                    }
                    if self.window.free() == 0 {
                        return Ok(Stop::WindowFull);
                    }
                    if let Some(byte) = self.acc.take_byte() {
                        self.window.push(byte);
                        self.mode = Mode::Stored(remaining - 1);
                        continue;
                    }
                    let available = input.len() - *pos;
                    if available == 0 {
                        return Ok(Stop::NeedInput);
                    }
                    let n = remaining.min(self.window.free()).min(available);
                    self.window.push_slice(&input[*pos..*pos + n]);
                    *pos += n;
                    self.mode = Mode::Stored(remaining - n);
                }

                Mode::Table => {
                    if !self.acc.need(14, input, pos) {
                        return Ok(Stop::NeedInput);
                    }
                    let hlit = self.acc.take(5) as usize + 257;
                    let hdist = self.acc.take(5) as usize + 1;
                    let hclen = self.acc.take(4) as usize + 4;
                    trace!(hlit, hdist, hclen, "dynamic block header");
                    if hlit > LITLEN_CODES || hdist > DISTANCE_CODES {
                        return Err(OxiflateError::invalid_code_lengths(
                            "too many length or distance symbols",
                        ));
                    }
                    self.header = DynamicHeader {
                        hlit,
                        hdist,
                        hclen,
                        ..DynamicHeader::default()
                    };
                    self.mode = Mode::BitTree;
                }

                Mode::BitTree => {
                    let header = &mut self.header;
                    while header.index < header.hclen {
                        if !self.acc.need(3, input, pos) {
                            return Ok(Stop::NeedInput);
                        }
                        header.codelen_lengths[CODE_LENGTH_ORDER[header.index]] =
                            self.acc.take(3) as u8;
                        header.index += 1;
                    }
                    header.codelen_table = DecodeTable::from_code_lengths(
                        &header.codelen_lengths,
                        7,
                        TableKind::CodeLengths,
                    )?;
                    header.index = 0;
                    self.mode = Mode::DistTree;
                }

                Mode::DistTree => {
                    if !self.decode_code_lengths(input, pos)? {
                        return Ok(Stop::NeedInput);
                    }
                    let header = &self.header;
                    if header.lengths[END_OF_BLOCK as usize] == 0 {
                        return Err(OxiflateError::invalid_code_lengths(
                            "missing end-of-block code",
                        ));
                    }
                    self.litlen = DecodeTable::from_code_lengths(
                        &header.lengths[..header.hlit],
                        LITLEN_ROOT_BITS,
                        TableKind::Symbols,
                    )?;
                    self.distance = DecodeTable::from_code_lengths(
                        &header.lengths[header.hlit..header.hlit + header.hdist],
                        DISTANCE_ROOT_BITS,
                        TableKind::Symbols,
                    )?;
                    self.dynamic = true;
                    self.code_state = CodeState::Symbol;
                    self.mode = Mode::Codes;
                }

                Mode::Codes => match self.decode_codes(input, pos)? {
                    Some(stop) => return Ok(stop),
                    None => self.end_of_block(),
                },

                Mode::Dry | Mode::Done => return Ok(Stop::StreamEnd),

                Mode::Bad => {
                    return Err(OxiflateError::invalid_state("decoder is in a failed state"));
                }
            }
        }
    }

    /// Decode the run-length coded code lengths. Returns `false` when the
    /// input ran out.
    fn decode_code_lengths(&mut self, input: &[u8], pos: &mut usize) -> Result<bool> {
        let header = &mut self.header;
        let total = header.hlit + header.hdist;

        while header.index < total {
            let symbol = match header.repeat.take() {
                Some(symbol) => symbol,
                None => match header.codelen_table.decode(&mut self.acc, input, pos)? {
                    Decoded::Symbol(symbol) => symbol,
                    Decoded::NeedInput => return Ok(false),
                },
            };

            if symbol < 16 {
                header.lengths[header.index] = symbol as u8;
                header.index += 1;
                continue;
            }

            let (extra_bits, base) = match symbol as usize {
                REP_3_6 => (2, 3),
                REPZ_3_10 => (3, 3),
                REPZ_11_138 => (7, 11),
                _ => return Err(OxiflateError::invalid_code_lengths("invalid code length symbol")),
            };
            if !self.acc.need(extra_bits, input, pos) {
                header.repeat = Some(symbol);
                return Ok(false);
            }
            let count = base + self.acc.take(extra_bits) as usize;

            let value = if symbol as usize == REP_3_6 {
                if header.index == 0 {
                    return Err(OxiflateError::invalid_code_lengths(
                        "repeat with no previous length",
                    ));
                }
                header.lengths[header.index - 1]
            } else {
                0
            };
            if header.index + count > total {
                return Err(OxiflateError::invalid_code_lengths(
                    "repeat runs past the declared lengths",
                ));
            }
            header.lengths[header.index..header.index + count].fill(value);
            header.index += count;
        }
        Ok(true)
    }

    /// Decode symbols of the current block. Returns `None` at end of block.
    fn decode_codes(&mut self, input: &[u8], pos: &mut usize) -> Result<Option<Stop>> {
        loop {
            match self.code_state {
                CodeState::Symbol => {
                    if self.window.free() == 0 {
                        return Ok(Some(Stop::WindowFull));
                    }
                    if self.window.free() >= MAX_MATCH && input.len() - *pos >= FAST_MIN_INPUT {
                        if self.decode_fast(input, pos)? {
                            return Ok(None);
                        }
                        continue;
                    }

                    let litlen = if self.dynamic {
                        &self.litlen
                    } else {
                        &FIXED_LITLEN_TABLE
                    };
                    let symbol = match litlen.decode(&mut self.acc, input, pos)? {
                        Decoded::Symbol(symbol) => symbol,
                        Decoded::NeedInput => return Ok(Some(Stop::NeedInput)),
                    };
                    match symbol {
                        0..=255 => self.window.push(symbol as u8),
                        END_OF_BLOCK => return Ok(None),
                        257..=285 => {
                            let index = (symbol - 257) as usize;
                            self.code_state = CodeState::LengthExtra {
                                base: LENGTH_BASE[index],
                                bits: LENGTH_EXTRA_BITS[index],
                            };
                        }
                        _ => {
                            return Err(OxiflateError::corrupted(
                                self.acc.bit_position() / 8,
                                format!("invalid literal/length code {}", symbol),
                            ));
                        }
                    }
                }

                CodeState::LengthExtra { base, bits } => {
                    if !self.acc.need(bits as u32, input, pos) {
                        return Ok(Some(Stop::NeedInput));
                    }
                    let length = base as usize + self.acc.take(bits as u32) as usize;
                    self.code_state = CodeState::Distance { length };
                }

                CodeState::Distance { length } => {
                    let distance = if self.dynamic {
                        &self.distance
                    } else {
                        &FIXED_DISTANCE_TABLE
                    };
                    let symbol = match distance.decode(&mut self.acc, input, pos)? {
                        Decoded::Symbol(symbol) => symbol as usize,
                        Decoded::NeedInput => return Ok(Some(Stop::NeedInput)),
                    };
                    if symbol >= DISTANCE_CODES {
                        return Err(OxiflateError::corrupted(
                            self.acc.bit_position() / 8,
                            format!("invalid distance code {}", symbol),
                        ));
                    }
                    self.code_state = CodeState::DistanceExtra {
                        length,
                        base: DISTANCE_BASE[symbol],
                        bits: DISTANCE_EXTRA_BITS[symbol],
                    };
                }

                CodeState::DistanceExtra { length, base, bits } => {
                    if !self.acc.need(bits as u32, input, pos) {
                        return Ok(Some(Stop::NeedInput));
                    }
                    let distance = base as usize + self.acc.take(bits as u32) as usize;
                    if distance > self.window.len() {
                        return Err(OxiflateError::invalid_distance(distance, self.window.len()));
                    }
                    self.code_state = CodeState::Copy { length, distance };
                }

                CodeState::Copy { length, distance } => {
                    let n = length.min(self.window.free());
                    if n == 0 {
                        return Ok(Some(Stop::WindowFull));
                    }
                    self.window.copy_match(distance, n)?;
                    self.code_state = if n == length {
                        CodeState::Symbol
                    } else {
                        CodeState::Copy {
                            length: length - n,
                            distance,
                        }
                    };
                }
            }
        }
    }

    /// Decode whole symbols while the window has room for a maximal match
    /// and the input holds enough bytes for any symbol with its extra bits.
    /// Returns `true` at end of block.
    fn decode_fast(&mut self, input: &[u8], pos: &mut usize) -> Result<bool> {
        let (litlen, distance) = if self.dynamic {
            (&self.litlen, &self.distance)
        } else {
            (&FIXED_LITLEN_TABLE, &FIXED_DISTANCE_TABLE)
        };
        let acc = &mut self.acc;
        let window = &mut self.window;

        while window.free() >= MAX_MATCH && input.len() - *pos >= FAST_MIN_INPUT {
            acc.refill(input, pos);

            let symbol = litlen.decode_fast(acc)?;
            if symbol < 256 {
                window.push(symbol as u8);
                continue;
            }
            if symbol == END_OF_BLOCK {
                return Ok(true);
            }
            if symbol > 285 {
                return Err(OxiflateError::corrupted(
                    acc.bit_position() / 8,
                    format!("invalid literal/length code {}", symbol),
                ));
            }
            let index = (symbol - 257) as usize;
            let length =
                LENGTH_BASE[index] as usize + acc.take(LENGTH_EXTRA_BITS[index] as u32) as usize;

            let symbol = distance.decode_fast(acc)? as usize;
            if symbol >= DISTANCE_CODES {
                return Err(OxiflateError::corrupted(
                    acc.bit_position() / 8,
                    format!("invalid distance code {}", symbol),
                ));
            }
            let dist = DISTANCE_BASE[symbol] as usize
                + acc.take(DISTANCE_EXTRA_BITS[symbol] as u32) as usize;
            if dist > window.len() {
                return Err(OxiflateError::invalid_distance(dist, window.len()));
            }
            window.copy_match(dist, length)?;
        }
        Ok(false)
    }

    /// Decompress a complete in-memory stream.
    pub fn inflate_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        Decompressor::decompress_all(self, data)
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        self.inflate(input, output)
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        Inflater::is_finished(self)
    }
}

/// Decompress a raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().inflate_to_vec(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::{Deflater, deflate};
    use crate::tables::{STATIC_DISTANCE_CODES, STATIC_LITLEN_CODES};
    use oxiflate_core::{BitWriter, ErrorKind};

    fn text(len: usize) -> Vec<u8> {
        b"Whether 'tis nobler in the mind to suffer the slings and arrows. "
            .iter()
            .copied()
            .cycle()
            .take(len)
            .collect()
    }

    #[test]
    fn test_inflate_stored() {
        let compressed = vec![
            0x01, // BFINAL=1, BTYPE=00, padding
            0x05, 0x00, // LEN=5
            0xFA, 0xFF, // NLEN
            b'H', b'e', b'l', b'l', b'o',
        ];
        assert_eq!(inflate(&compressed).unwrap(), b"Hello");
    }

    #[test]
    fn test_inflate_empty() {
        let compressed = vec![0x01, 0x00, 0x00, 0xFF, 0xFF];
        assert!(inflate(&compressed).unwrap().is_empty());
        assert!(inflate(&[0x03, 0x00]).unwrap().is_empty());
    }

    #[test]
    fn test_inflate_fixed_literal() {
        assert_eq!(inflate(&[0x4B, 0x04, 0x00]).unwrap(), b"a");
    }

    #[test]
    fn test_reserved_block_type() {
        let err = inflate(&[0x07, 0x00]).unwrap_err();
        assert!(matches!(err, OxiflateError::InvalidBlockType { block_type: 3, .. }));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_stored_length_check() {
        let err = inflate(&[0x01, 0x05, 0x00, 0x00, 0x00, b'x']).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_distance_before_start() {
        // Fixed block: match of length 3 at distance 1 with no history.
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b011, 3).unwrap();
        let length = STATIC_LITLEN_CODES[257];
        writer.write_bits(length.code as u32, length.len as u32).unwrap();
        let dist = STATIC_DISTANCE_CODES[0];
        writer.write_bits(dist.code as u32, dist.len as u32).unwrap();
        let eob = STATIC_LITLEN_CODES[256];
        writer.write_bits(eob.code as u32, eob.len as u32).unwrap();
        let data = writer.into_inner().unwrap();

        let err = inflate(&data).unwrap_err();
        assert!(matches!(err, OxiflateError::InvalidDistance { distance: 1, history_size: 0 }));
    }

    #[test]
    fn test_too_many_length_codes() {
        // Dynamic block with HLIT = 30 (287 codes).
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(30, 5).unwrap();
        writer.write_bits(0, 5).unwrap();
        writer.write_bits(0, 4).unwrap();
        let data = writer.into_inner().unwrap();
        let err = inflate(&data).unwrap_err();
        assert!(matches!(err, OxiflateError::InvalidCodeLengths { .. }));
    }

    #[test]
    fn test_bad_mode_is_terminal() {
        let mut inflater = Inflater::new();
        let mut out = [0u8; 16];
        assert!(inflater.inflate(&[0x07], &mut out).is_err());
        assert_eq!(inflater.mode(), Mode::Bad);
        let err = inflater.inflate(&[0x03, 0x00], &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_byte_at_a_time() {
        let input = text(40_000);
        let compressed = deflate(&input, 6).unwrap();

        let mut inflater = Inflater::new();
        let mut output = Vec::new();
        let mut out = [0u8; 300];
        for byte in &compressed {
            let mut chunk: &[u8] = std::slice::from_ref(byte);
            loop {
                let (consumed, produced, status) = inflater.inflate(chunk, &mut out).unwrap();
                chunk = &chunk[consumed..];
                output.extend_from_slice(&out[..produced]);
                if status != DecompressStatus::NeedsOutput && chunk.is_empty() {
                    break;
                }
            }
        }
        while !inflater.is_finished() {
            let (_, produced, _) = inflater.inflate(&[], &mut out).unwrap();
            output.extend_from_slice(&out[..produced]);
        }
        assert_eq!(output, input);
        assert_eq!(inflater.total_in(), compressed.len() as u64);
    }

    #[test]
    fn test_tiny_output_buffer() {
        let input = text(10_000);
        let compressed = deflate(&input, 9).unwrap();

        let mut inflater = Inflater::new();
        let mut output = Vec::new();
        let mut out = [0u8; 1];
        let mut pos = 0;
        loop {
            let (consumed, produced, status) =
                inflater.inflate(&compressed[pos..], &mut out).unwrap();
            pos += consumed;
            output.extend_from_slice(&out[..produced]);
            if status == DecompressStatus::Done {
                break;
            }
        }
        assert_eq!(output, input);
    }

    #[test]
    fn test_trailing_bytes_left_unconsumed() {
        let mut data = deflate(b"framed payload, framed payload", 6).unwrap();
        let stream_len = data.len();
        data.extend_from_slice(b"TRAILER!");

        let mut inflater = Inflater::new();
        let mut out = vec![0u8; 256];
        let (consumed, produced, status) = inflater.inflate(&data, &mut out).unwrap();
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(consumed, stream_len);
        assert_eq!(&out[..produced], b"framed payload, framed payload");
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = deflate(&text(5000), 6).unwrap();
        let err = inflate(&compressed[..compressed.len() / 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn test_small_window() {
        let input = text(3000);
        let mut deflater = Deflater::with_options(
            crate::deflate::DeflateOptions::new(6).with_window_bits(9),
        )
        .unwrap();
        let compressed = deflater.compress_to_vec(&input).unwrap();

        let mut inflater =
            Inflater::with_options(InflateOptions::default().with_window_bits(9)).unwrap();
        assert_eq!(inflater.inflate_to_vec(&compressed).unwrap(), input);
    }

    #[test]
    fn test_preset_dictionary() {
        let dictionary = b"alpha beta gamma delta epsilon";
        let message = b"gamma delta alpha beta epsilon gamma";

        let mut deflater = Deflater::new(6);
        deflater.set_dictionary(dictionary).unwrap();
        let compressed = deflater.compress_to_vec(message).unwrap();

        let mut inflater = Inflater::with_dictionary(dictionary);
        assert_eq!(inflater.inflate_to_vec(&compressed).unwrap(), message);
        assert!(inflate(&compressed).is_err());
    }
}
