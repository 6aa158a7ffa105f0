//! gzip framing (RFC 1952).
//!
//! ```text
//! +---+---+---+---+---+---+---+---+---+---+
//! |ID1|ID2|CM |FLG|     MTIME     |XFL|OS |
//! +---+---+---+---+---+---+---+---+---+---+
//! [XLEN + extra] [name\0] [comment\0] [CRC16]
//! +=======================+
//! |   compressed blocks   |
//! +=======================+
//! +---+---+---+---+---+---+---+---+
//! |     CRC32     |     ISIZE     |
//! +---+---+---+---+---+---+---+---+
//! ```
//!
//! Text fields are zero-terminated ISO-8859-1: each byte is one code point
//! in U+0000-U+00FF. A single member is decoded per stream.

use crate::codec::{Codec, Format};
use crate::deflate::DeflateOptions;
use crate::inflate::InflateOptions;
use encoding_rs::mem;
use oxiflate_core::crc::Crc32;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{CompressionLevel, Strategy};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// Operating system byte for "unknown".
pub const OS_UNKNOWN: u8 = 255;

/// Length of the fixed part of the header.
pub const FIXED_HEADER_LEN: usize = 10;

/// Length of the CRC32 + ISIZE trailer.
pub const TRAILER_LEN: usize = 8;

/// Longest accepted header: room for a full extra field plus long name
/// and comment fields.
pub const MAX_HEADER_LEN: usize = 1 << 17;

/// GZIP header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
    /// Bits that must be zero.
    pub const RESERVED: u8 = 0xE0;
}

/// XFL values.
pub mod extra_flags {
    /// Slowest, best compression.
    pub const BEST: u8 = 2;
    /// Fastest compression.
    pub const FASTEST: u8 = 4;
}

/// GZIP member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// Payload is probably text (FTEXT).
    pub text: bool,
    /// Modification time (Unix timestamp, 0 if unknown).
    pub mtime: u32,
    /// Extra flags as read; derived from the level when writing.
    pub extra_flags: u8,
    /// Operating system.
    pub os: u8,
    /// Raw extra field (FEXTRA).
    pub extra: Option<Vec<u8>>,
    /// Original filename (FNAME).
    pub filename: Option<String>,
    /// Comment (FCOMMENT).
    pub comment: Option<String>,
    /// Whether a header CRC16 is present (FHCRC).
    pub header_crc: bool,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            text: false,
            mtime: 0,
            extra_flags: 0,
            os: OS_UNKNOWN,
            extra: None,
            filename: None,
            comment: None,
            header_crc: false,
        }
    }
}

impl GzipHeader {
    /// Create a new GZIP header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the original filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the raw extra field.
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Set the modification time (Unix seconds).
    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set the modification time from a `SystemTime`.
    ///
    /// Times before the epoch or past 2106 are stored as 0 (unknown).
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.mtime = modified
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u32::try_from(d.as_secs()).ok())
            .unwrap_or(0);
        self
    }

    /// Set the modification time to now.
    pub fn with_mtime_now(self) -> Self {
        self.with_modified(SystemTime::now())
    }

    /// Set the operating system byte.
    pub fn with_os(mut self, os: u8) -> Self {
        self.os = os;
        self
    }

    /// Mark the payload as text.
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    /// Request a header CRC16.
    pub fn with_header_crc(mut self, header_crc: bool) -> Self {
        self.header_crc = header_crc;
        self
    }

    /// Modification time, or `None` when unknown.
    pub fn modified(&self) -> Option<SystemTime> {
        if self.mtime == 0 {
            return None;
        }
        UNIX_EPOCH.checked_add(Duration::from_secs(self.mtime as u64))
    }

    /// FLG byte this header encodes to.
    pub fn flags(&self) -> u8 {
        let mut flg = 0;
        if self.text {
            flg |= flags::FTEXT;
        }
        if self.header_crc {
            flg |= flags::FHCRC;
        }
        if self.extra.is_some() {
            flg |= flags::FEXTRA;
        }
        if self.filename.is_some() {
            flg |= flags::FNAME;
        }
        if self.comment.is_some() {
            flg |= flags::FCOMMENT;
        }
        flg
    }

    /// Human-readable operating system name.
    pub fn os_name(&self) -> &'static str {
        match self.os {
            0 => "FAT",
            1 => "Amiga",
            2 => "VMS",
            3 => "Unix",
            4 => "VM/CMS",
            5 => "Atari TOS",
            6 => "HPFS",
            7 => "Macintosh",
            8 => "Z-System",
            9 => "CP/M",
            10 => "TOPS-20",
            11 => "NTFS",
            12 => "QDOS",
            13 => "Acorn RISCOS",
            _ => "unknown",
        }
    }

    /// Serialize the header for a stream compressed with `level` and
    /// `strategy`.
    pub fn encode(&self, level: CompressionLevel, strategy: Strategy) -> Result<Vec<u8>> {
        let xfl = match level.level() {
            9 => extra_flags::BEST,
            0..=1 => extra_flags::FASTEST,
            _ if strategy == Strategy::HuffmanOnly => extra_flags::FASTEST,
            _ => 0,
        };

        let mut out = Vec::with_capacity(FIXED_HEADER_LEN + 32);
        out.extend_from_slice(&GZIP_MAGIC);
        out.push(CM_DEFLATE);
        out.push(self.flags());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(xfl);
        out.push(self.os);

        if let Some(extra) = &self.extra {
            let xlen = u16::try_from(extra.len()).map_err(|_| {
                OxiflateError::invalid_config(format!(
                    "gzip extra field is {} bytes, limit is 65535",
                    extra.len()
                ))
            })?;
            out.extend_from_slice(&xlen.to_le_bytes());
            out.extend_from_slice(extra);
        }
        if let Some(filename) = &self.filename {
            out.extend_from_slice(&encode_latin1(filename, "filename")?);
            out.push(0);
        }
        if let Some(comment) = &self.comment {
            out.extend_from_slice(&encode_latin1(comment, "comment")?);
            out.push(0);
        }
        if self.header_crc {
            let crc16 = Crc32::compute(&out) as u16;
            out.extend_from_slice(&crc16.to_le_bytes());
        }
        Ok(out)
    }

    /// Parse a header from the front of `bytes`.
    ///
    /// Returns `Ok(None)` when the header continues past the end of
    /// `bytes`, otherwise the header and the number of bytes it occupies.
    pub fn parse(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        let mut reader = GzipHeaderReader::new();
        let (used, header) = reader.feed(bytes)?;
        Ok(header.map(|header| (header, used)))
    }
}

/// Header fields in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Field {
    Fixed,
    ExtraLen,
    Extra,
    Name,
    Comment,
    HeaderCrc,
    Done,
}

const FIELD_ORDER: [Field; 7] = [
    Field::Fixed,
    Field::ExtraLen,
    Field::Extra,
    Field::Name,
    Field::Comment,
    Field::HeaderCrc,
    Field::Done,
];

/// Incremental gzip header reader.
///
/// Input may be split anywhere; every byte is examined once, and a header
/// longer than [`MAX_HEADER_LEN`] is rejected.
#[derive(Debug, Clone)]
pub struct GzipHeaderReader {
    bytes: Vec<u8>,
    field: Field,
    field_start: usize,
    flg: u8,
    xlen: usize,
    header: GzipHeader,
}

impl Default for GzipHeaderReader {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipHeaderReader {
    /// Reader expecting the first header byte.
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(FIXED_HEADER_LEN),
            field: Field::Fixed,
            field_start: 0,
            flg: 0,
            xlen: 0,
            header: GzipHeader::default(),
        }
    }

    /// Header bytes taken so far.
    pub fn bytes_read(&self) -> usize {
        self.bytes.len()
    }

    /// Feed the next input bytes.
    ///
    /// Returns how many of them belong to the header and, once its last
    /// byte has arrived, the header. Bytes past the header are left.
    pub fn feed(&mut self, input: &[u8]) -> Result<(usize, Option<GzipHeader>)> {
        let mut pos = 0;
        loop {
            match self.field {
                Field::Fixed => {
                    let take = (FIXED_HEADER_LEN - self.bytes.len()).min(input.len() - pos);
                    self.push(&input[pos..pos + take])?;
                    pos += take;
                    if self.bytes.len() >= 2 && self.bytes[..2] != GZIP_MAGIC {
                        return Err(OxiflateError::invalid_magic(GZIP_MAGIC, &self.bytes[..2]));
                    }
                    if self.bytes.len() < FIXED_HEADER_LEN {
                        return Ok((pos, None));
                    }
                    self.read_fixed()?;
                }
                Field::ExtraLen | Field::Extra | Field::HeaderCrc => {
                    let want = match self.field {
                        Field::Extra => self.xlen,
                        _ => 2,
                    };
                    let have = self.bytes.len() - self.field_start;
                    let take = (want - have).min(input.len() - pos);
                    self.push(&input[pos..pos + take])?;
                    pos += take;
                    if have + take < want {
                        return Ok((pos, None));
                    }
                    self.read_sized()?;
                }
                Field::Name | Field::Comment => {
                    let rest = &input[pos..];
                    let Some(end) = rest.iter().position(|&b| b == 0) else {
                        self.push(rest)?;
                        return Ok((input.len(), None));
                    };
                    self.push(&rest[..=end])?;
                    pos += end + 1;
                    let text = decode_latin1(&self.bytes[self.field_start..self.bytes.len() - 1]);
                    if self.field == Field::Name {
                        self.header.filename = Some(text);
                    } else {
                        self.header.comment = Some(text);
                    }
                }
                Field::Done => return Ok((pos, Some(self.header.clone()))),
            }
            self.advance();
        }
    }

    fn push(&mut self, data: &[u8]) -> Result<()> {
        if self.bytes.len() + data.len() > MAX_HEADER_LEN {
            return Err(OxiflateError::invalid_header(format!(
                "gzip header is longer than {} bytes",
                MAX_HEADER_LEN
            )));
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    fn present(&self, field: Field) -> bool {
        match field {
            Field::Fixed | Field::Done => true,
            Field::ExtraLen | Field::Extra => self.flg & flags::FEXTRA != 0,
            Field::Name => self.flg & flags::FNAME != 0,
            Field::Comment => self.flg & flags::FCOMMENT != 0,
            Field::HeaderCrc => self.flg & flags::FHCRC != 0,
        }
    }

    fn advance(&mut self) {
        let current = self.field;
        self.field = FIELD_ORDER
            .iter()
            .copied()
            .find(|&field| field > current && self.present(field))
            .unwrap_or(Field::Done);
        self.field_start = self.bytes.len();
    }

    fn read_fixed(&mut self) -> Result<()> {
        let b = &self.bytes;
        if b[2] != CM_DEFLATE {
            return Err(OxiflateError::unsupported_method(b[2]));
        }
        let flg = b[3];
        if flg & flags::RESERVED != 0 {
            return Err(OxiflateError::invalid_header(format!(
                "reserved gzip flag bits set: {:#04x}",
                flg
            )));
        }
        self.header = GzipHeader {
            text: flg & flags::FTEXT != 0,
            mtime: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            extra_flags: b[8],
            os: b[9],
            extra: None,
            filename: None,
            comment: None,
            header_crc: flg & flags::FHCRC != 0,
        };
        self.flg = flg;
        Ok(())
    }

    fn read_sized(&mut self) -> Result<()> {
        let data = &self.bytes[self.field_start..];
        match self.field {
            Field::ExtraLen => self.xlen = u16::from_le_bytes([data[0], data[1]]) as usize,
            Field::Extra => self.header.extra = Some(data.to_vec()),
            Field::HeaderCrc => {
                let stored = u16::from_le_bytes([data[0], data[1]]);
                let computed = Crc32::compute(&self.bytes[..self.field_start]) as u16;
                if stored != computed {
                    return Err(OxiflateError::invalid_header(format!(
                        "gzip header CRC16 mismatch: stored {:#06x}, computed {:#06x}",
                        stored, computed
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// CRC32 + ISIZE trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed payload.
    pub crc32: u32,
    /// Payload length modulo 2^32.
    pub size: u32,
}

impl GzipTrailer {
    /// Read a trailer from its 8 bytes.
    pub fn from_bytes(bytes: [u8; TRAILER_LEN]) -> Self {
        Self {
            crc32: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Read the trailer from the last 8 bytes of a complete member.
    pub fn from_member(member: &[u8]) -> Result<Self> {
        let start = member
            .len()
            .checked_sub(TRAILER_LEN)
            .ok_or_else(|| OxiflateError::unexpected_eof("gzip trailer"))?;
        let mut bytes = [0u8; TRAILER_LEN];
        bytes.copy_from_slice(&member[start..]);
        Ok(Self::from_bytes(bytes))
    }

    /// Serialize to 8 little-endian bytes.
    pub fn to_bytes(&self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[..4].copy_from_slice(&self.crc32.to_le_bytes());
        out[4..].copy_from_slice(&self.size.to_le_bytes());
        out
    }
}

fn encode_latin1(text: &str, field: &str) -> Result<Vec<u8>> {
    if text.contains('\0') {
        return Err(OxiflateError::encoding_error(format!(
            "gzip {} contains a NUL character",
            field
        )));
    }
    if !mem::is_str_latin1(text) {
        return Err(OxiflateError::encoding_error(format!(
            "gzip {} is not representable as ISO-8859-1",
            field
        )));
    }
    Ok(mem::encode_latin1_lossy(text).into_owned())
}

fn decode_latin1(bytes: &[u8]) -> String {
    mem::decode_latin1(bytes).into_owned()
}

/// Compress data to a gzip member with a default header.
///
/// # Example
///
/// ```rust
/// use oxiflate::gzip::{gzip_compress, gzip_decompress};
///
/// let compressed = gzip_compress(b"aaaaaaaaaaaaaaaaaaaa", 9).unwrap();
/// assert_eq!(&compressed[..2], &[0x1F, 0x8B]);
/// assert_eq!(&compressed[compressed.len() - 4..], &20u32.to_le_bytes());
/// assert_eq!(gzip_decompress(&compressed).unwrap(), b"aaaaaaaaaaaaaaaaaaaa");
/// ```
pub fn gzip_compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    gzip_compress_with_header(data, GzipHeader::new(), DeflateOptions::new(level))
}

/// Compress data to a gzip member with the given header and options.
pub fn gzip_compress_with_header(
    data: &[u8],
    header: GzipHeader,
    options: DeflateOptions,
) -> Result<Vec<u8>> {
    let mut codec = Codec::new(Format::Gzip);
    codec.init_deflate(options)?;
    codec.set_gzip_header(header)?;
    codec.compress_to_vec(data)
}

/// Decompress a single gzip member.
pub fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>> {
    gzip_decompress_with_header(data).map(|(_, payload)| payload)
}

/// Decompress a single gzip member and return its header as well.
pub fn gzip_decompress_with_header(data: &[u8]) -> Result<(GzipHeader, Vec<u8>)> {
    let mut codec = Codec::new(Format::Gzip);
    codec.init_inflate(InflateOptions::default())?;
    let payload = codec.decompress_to_vec(data)?;
    let header = codec.gzip_header().cloned().unwrap_or_default();
    Ok((header, payload))
}

/// Parse just the header of a gzip member.
pub fn read_header(data: &[u8]) -> Result<GzipHeader> {
    match GzipHeader::parse(data)? {
        Some((header, _)) => Ok(header),
        None => Err(OxiflateError::unexpected_eof("gzip header")),
    }
}
