//! zlib framing (RFC 1950).
//!
//! A zlib stream wraps raw DEFLATE data with a two-byte header and an
//! Adler-32 of the uncompressed payload.
//!
//! # Format
//!
//! ```text
//! +---+---+[---+---+---+---+]============+---+---+---+---+
//! |CMF|FLG|[     DICTID    ]| compressed |    ADLER32    |
//! +---+---+[---+---+---+---+]============+---+---+---+---+
//! ```
//!
//! - CMF: Compression Method and Flags
//!   - Bits 0-3: CM (Compression Method) - must be 8 for DEFLATE
//!   - Bits 4-7: CINFO (Compression Info) - log2(window size) - 8
//! - FLG: Flags
//!   - Bits 0-4: FCHECK - check bits so (CMF*256 + FLG) mod 31 == 0
//!   - Bit 5: FDICT - preset dictionary present
//!   - Bits 6-7: FLEVEL - compression level (0-3)
//! - DICTID: Adler-32 of the preset dictionary (big-endian), only with FDICT
//! - ADLER32: Adler-32 of the uncompressed data (big-endian)

use crate::codec::{Codec, Format};
use crate::deflate::DeflateOptions;
use crate::inflate::InflateOptions;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::Strategy;

/// Compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// FDICT bit in the FLG byte.
pub const FDICT: u8 = 0x20;

/// Largest useful preset dictionary (one full window).
pub const MAX_DICTIONARY_SIZE: usize = 32768;

/// Zlib compression level indicator in header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl ZlibLevel {
    /// Map a compression level and strategy onto the header hint.
    pub fn from_options(level: u8, strategy: Strategy) -> Self {
        if strategy == Strategy::HuffmanOnly {
            return Self::Fastest;
        }
        match level {
            0..=1 => Self::Fastest,
            2..=5 => Self::Fast,
            6 => Self::Default,
            _ => Self::Maximum,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// Parsed or to-be-written zlib header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// log2 of the window size (8-15).
    pub window_bits: u8,
    /// Level hint from FLEVEL.
    pub level: ZlibLevel,
    /// Adler-32 of the preset dictionary, when FDICT is set.
    pub dictionary_id: Option<u32>,
}

impl ZlibHeader {
    /// Header for a compressor configured with `options`.
    pub fn for_options(options: &DeflateOptions, dictionary_id: Option<u32>) -> Self {
        Self {
            window_bits: options.effective_window_bits(),
            level: ZlibLevel::from_options(options.level.level(), options.strategy),
            dictionary_id,
        }
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        1 << self.window_bits
    }

    /// Encoded length of this header.
    pub fn encoded_len(&self) -> usize {
        if self.dictionary_id.is_some() { 6 } else { 2 }
    }

    /// Serialize to CMF, FLG and the optional DICTID.
    pub fn to_bytes(&self) -> Vec<u8> {
        let cmf = ((self.window_bits.saturating_sub(8)) << 4) | CM_DEFLATE;
        let mut flg = (self.level as u8) << 6;
        if self.dictionary_id.is_some() {
            flg |= FDICT;
        }
        let check = ((cmf as u16) << 8) | flg as u16;
        flg |= (31 - check % 31) as u8;

        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(cmf);
        bytes.push(flg);
        if let Some(id) = self.dictionary_id {
            bytes.extend_from_slice(&id.to_be_bytes());
        }
        bytes
    }

    /// Parse a header from the front of `bytes`.
    ///
    /// Returns `Ok(None)` when more bytes are needed, otherwise the header
    /// and the number of bytes it occupies.
    pub fn parse(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        if bytes.len() < 2 {
            return Ok(None);
        }
        let cmf = bytes[0];
        let flg = bytes[1];

        if (((cmf as u16) << 8) | flg as u16) % 31 != 0 {
            return Err(OxiflateError::invalid_header("zlib header check failed"));
        }
        let cm = cmf & 0x0F;
        if cm != CM_DEFLATE {
            return Err(OxiflateError::unsupported_method(cm));
        }
        let cinfo = cmf >> 4;
        if cinfo > 7 {
            return Err(OxiflateError::invalid_header(format!(
                "zlib window size 2^{} too large",
                cinfo as u32 + 8
            )));
        }

        let mut header = Self {
            window_bits: cinfo + 8,
            level: ZlibLevel::from_bits(flg >> 6),
            dictionary_id: None,
        };
        if flg & FDICT == 0 {
            return Ok(Some((header, 2)));
        }
        if bytes.len() < 6 {
            return Ok(None);
        }
        header.dictionary_id = Some(u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]));
        Ok(Some((header, 6)))
    }
}

/// Compress data to zlib format.
///
/// # Example
///
/// ```rust
/// use oxiflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// assert_eq!(&compressed[..2], &[0x78, 0x9C]);
/// assert_eq!(zlib_decompress(&compressed).unwrap(), data);
/// ```
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    zlib_compress_with_options(input, DeflateOptions::new(level))
}

/// Compress data to zlib format with explicit options.
pub fn zlib_compress_with_options(input: &[u8], options: DeflateOptions) -> Result<Vec<u8>> {
    let mut codec = Codec::new(Format::Zlib);
    codec.init_deflate(options)?;
    codec.compress_to_vec(input)
}

/// Compress data to zlib format with a preset dictionary.
///
/// The header carries FDICT and the dictionary's Adler-32; the same
/// dictionary must be supplied to decompress.
///
/// # Example
///
/// ```rust
/// use oxiflate::zlib::{zlib_compress_with_dict, zlib_decompress_with_dict, zlib_requires_dictionary};
/// use oxiflate_core::Adler32;
///
/// let dict = b"common words and phrases";
/// let data = b"these common words and phrases repeat";
/// let compressed = zlib_compress_with_dict(data, 6, dict).unwrap();
/// assert_eq!(zlib_requires_dictionary(&compressed), Some(Adler32::checksum(dict)));
/// assert_eq!(zlib_decompress_with_dict(&compressed, dict).unwrap(), data);
/// ```
pub fn zlib_compress_with_dict(input: &[u8], level: u8, dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut codec = Codec::new(Format::Zlib);
    codec.init_deflate(DeflateOptions::new(level))?;
    codec.set_dictionary(dictionary)?;
    codec.compress_to_vec(input)
}

/// Decompress zlib format data.
///
/// A stream whose header requests a preset dictionary fails with
/// [`OxiflateError::DictionaryRequired`].
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut codec = Codec::new(Format::Zlib);
    codec.init_inflate(InflateOptions::default())?;
    codec.decompress_to_vec(input)
}

/// Decompress zlib format data with a preset dictionary.
///
/// A dictionary whose Adler-32 differs from the header's DICTID is an
/// integrity error.
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut codec = Codec::new(Format::Zlib);
    codec.init_inflate(InflateOptions::default())?;
    codec.set_dictionary(dictionary)?;
    codec.decompress_to_vec(input)
}

/// Adler-32 of the dictionary a zlib stream needs, if it needs one.
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    match ZlibHeader::parse(input) {
        Ok(Some((header, _))) => header.dictionary_id,
        _ => None,
    }
}
