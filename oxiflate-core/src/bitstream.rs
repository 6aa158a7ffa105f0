//! Bit-level I/O for DEFLATE.
//!
//! DEFLATE packs data LSB-first: the first bit of a field lands in the least
//! significant free bit of the current byte. Huffman codes are therefore
//! stored bit-reversed so that they, too, come out first-bit-first.
//!
//! Two halves live here:
//!
//! - [`BitWriter`] packs bits into any `Write` sink. The compressor points it
//!   at a `Vec<u8>` staging area and drains that into caller buffers.
//! - [`BitAccumulator`] unpacks bits from caller-supplied input slices. It
//!   owns no input; every call names the slice and cursor to pull from, so a
//!   decoder can stop on an empty slice and resume on the next one.
//!
//! # Example
//!
//! ```
//! use oxiflate_core::bitstream::{BitAccumulator, BitWriter};
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.write_bits(0b101, 3).unwrap();
//! writer.write_bits(0b1100, 4).unwrap();
//! writer.align_to_byte().unwrap();
//! let bytes = writer.into_inner().unwrap();
//!
//! let mut acc = BitAccumulator::new();
//! let mut pos = 0;
//! assert!(acc.need(7, &bytes, &mut pos));
//! assert_eq!(acc.take(3), 0b101);
//! assert_eq!(acc.take(4), 0b1100);
//! ```

use crate::error::Result;
use std::io::Write;

/// A bit-level writer that wraps any `Write` implementation.
///
/// Complete bytes are forwarded to the writer once 32 bits have built up
/// or on [`flush_bytes`](Self::flush_bytes); a trailing partial byte stays
/// buffered until [`align_to_byte`](Self::align_to_byte) pads it out.
#[derive(Debug, Clone)]
pub struct BitWriter<W: Write> {
    /// Underlying writer.
    writer: W,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of bits in buffer.
    bits_in_buffer: u32,
    /// Total bits written.
    total_bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new `BitWriter` wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_written: 0,
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Pad to a byte boundary and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.align_to_byte()?;
        Ok(self.writer)
    }

    /// Total number of bits written so far.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Bits buffered but not yet forming a complete byte.
    pub fn pending_bits(&self) -> u32 {
        self.bits_in_buffer
    }

    /// Forward complete bytes from the buffer to the writer.
    #[inline]
    pub fn flush_bytes(&mut self) -> Result<()> {
        if self.bits_in_buffer >= 32 {
            let bytes = (self.buffer as u32).to_le_bytes();
            self.writer.write_all(&bytes)?;
            self.buffer >>= 32;
            self.bits_in_buffer -= 32;
        }

        while self.bits_in_buffer >= 8 {
            self.writer.write_all(&[self.buffer as u8])?;
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
        Ok(())
    }

    /// Write up to 32 bits, first bit in the LSB of `value`.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u32) -> Result<()> {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");

        if count == 0 {
            return Ok(());
        }

        let value = (value as u64) & ((1u64 << count) - 1);
        self.buffer |= value << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits_written += count as u64;

        if self.bits_in_buffer >= 32 {
            self.flush_bytes()?;
        }
        Ok(())
    }

    /// Write a single bit.
    #[inline(always)]
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u32, 1)
    }

    /// Pad to a byte boundary with zeros and forward every complete byte.
    pub fn align_to_byte(&mut self) -> Result<()> {
        let partial = self.bits_in_buffer % 8;
        if partial != 0 {
            self.write_bits(0, 8 - partial)?;
        }
        self.flush_bytes()
    }

    /// Write whole bytes.
    ///
    /// Fast when the writer is byte-aligned; otherwise the bytes are shifted
    /// in through the bit buffer.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.flush_bytes()?;

        if self.bits_in_buffer > 0 {
            for &byte in buf {
                self.write_bits(byte as u32, 8)?;
            }
        } else {
            self.writer.write_all(buf)?;
            self.total_bits_written += buf.len() as u64 * 8;
        }

        Ok(())
    }
}

/// Resumable LSB-first bit unpacker over caller-owned input.
///
/// Holds at most 64 bits. Bytes are pulled from the caller's slice only when
/// a request cannot be met from the hold, so a decoder can suspend on an
/// exhausted slice without losing its place.
#[derive(Debug, Clone, Default)]
pub struct BitAccumulator {
    hold: u64,
    bits: u32,
    /// Bytes pulled in, net of bytes given back.
    pulled: u64,
}

impl BitAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every buffered bit.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of buffered bits.
    #[inline(always)]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Position of the next unconsumed bit, counted from the first byte ever
    /// pulled.
    pub fn bit_position(&self) -> u64 {
        self.pulled * 8 - self.bits as u64
    }

    #[inline(always)]
    fn pull(&mut self, input: &[u8], pos: &mut usize) -> bool {
        match input.get(*pos) {
            Some(&byte) => {
                self.hold |= (byte as u64) << self.bits;
                self.bits += 8;
                self.pulled += 1;
                *pos += 1;
                true
            }
            None => false,
        }
    }

    /// Make sure at least `n` bits (at most 56) are buffered.
    ///
    /// Returns `false` when the input ran out first; whatever was pulled stays
    /// buffered.
    #[inline]
    pub fn need(&mut self, n: u32, input: &[u8], pos: &mut usize) -> bool {
        debug_assert!(n <= 56);
        while self.bits < n {
            if !self.pull(input, pos) {
                return false;
            }
        }
        true
    }

    /// Top the hold up to at least 56 bits or until the input is exhausted.
    #[inline]
    pub fn refill(&mut self, input: &[u8], pos: &mut usize) {
        while self.bits <= 56 && self.pull(input, pos) {}
    }

    /// Look at the next `n` bits without consuming them.
    #[inline(always)]
    pub fn peek(&self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        (self.hold & ((1u64 << n) - 1)) as u32
    }

    /// Discard `n` buffered bits.
    #[inline(always)]
    pub fn consume(&mut self, n: u32) {
        debug_assert!(n <= self.bits);
        self.hold >>= n;
        self.bits -= n;
    }

    /// Consume and return the next `n` buffered bits.
    #[inline(always)]
    pub fn take(&mut self, n: u32) -> u32 {
        let value = self.peek(n);
        self.consume(n);
        value
    }

    /// Drop bits up to the next byte boundary.
    pub fn align(&mut self) {
        let partial = self.bits % 8;
        self.consume(partial);
    }

    /// Pop a whole buffered byte. Only meaningful when aligned.
    pub fn take_byte(&mut self) -> Option<u8> {
        if self.bits >= 8 {
            Some(self.take(8) as u8)
        } else {
            None
        }
    }

    /// Return whole buffered bytes to the caller's slice.
    ///
    /// At most `*pos` bytes go back, since only bytes of the current slice
    /// can be un-read. Afterwards the hold keeps fewer than eight bits unless
    /// older bytes were still buffered.
    pub fn give_back(&mut self, pos: &mut usize) {
        let bytes = ((self.bits / 8) as usize).min(*pos);
        if bytes == 0 {
            return;
        }
        self.bits -= bytes as u32 * 8;
        self.hold &= (1u64 << self.bits) - 1;
        self.pulled -= bytes as u64;
        *pos -= bytes;
    }
}
