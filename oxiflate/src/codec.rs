//! The codec bridge: one engine plus its container framing.
//!
//! A [`Codec`] is created for a [`Format`] and then initialized for exactly
//! one direction. Compression writes the header on the first step, runs the
//! deflate engine, and appends the trailer once the engine reports the
//! final block drained. Decompression parses the header from the first
//! input bytes, runs the inflate engine while checksumming its output, and
//! validates the trailer only after every payload byte has been handed to
//! the caller.
//!
//! Header and trailer bytes may arrive split across any number of calls;
//! the codec collects them internally and reports `NeedsInput` until they
//! are complete.

use crate::deflate::{DeflateOptions, Deflater};
use crate::gzip::{GzipHeader, GzipHeaderReader, GzipTrailer, TRAILER_LEN};
use crate::inflate::{InflateOptions, Inflater};
use crate::zlib::ZlibHeader;
use oxiflate_core::adler::Adler32;
use oxiflate_core::crc::Crc32;
use oxiflate_core::error::{ErrorKind, OxiflateError, Result};
use oxiflate_core::traits::{
    CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
};
use tracing::{debug, warn};

/// Longest zlib header: CMF, FLG and DICTID.
const ZLIB_HEADER_MAX: usize = 6;

/// Container around the DEFLATE data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Bare DEFLATE blocks.
    Raw,
    /// RFC 1950.
    #[default]
    Zlib,
    /// RFC 1952, single member.
    Gzip,
}

impl Format {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
        }
    }

    fn trailer_len(self) -> usize {
        match self {
            Self::Raw => 0,
            Self::Zlib => 4,
            Self::Gzip => TRAILER_LEN,
        }
    }

    fn initial_phase(self) -> Phase {
        match self {
            Self::Raw => Phase::Body,
            Self::Zlib | Self::Gzip => Phase::Header,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which way a codec runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plain bytes in, compressed bytes out.
    Compress,
    /// Compressed bytes in, plain bytes out.
    Decompress,
}

#[derive(Debug, Clone)]
enum Engine {
    Unset,
    Deflate(Box<Deflater>),
    Inflate(Box<Inflater>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
    Trailer,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
enum Checksum {
    None,
    Adler(Adler32),
    Crc(Crc32),
}

impl Checksum {
    fn for_format(format: Format) -> Self {
        match format {
            Format::Raw => Self::None,
            Format::Zlib => Self::Adler(Adler32::new()),
            Format::Gzip => Self::Crc(Crc32::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::None => {}
            Self::Adler(adler) => adler.update(data),
            Self::Crc(crc) => crc.update(data),
        }
    }

    fn value(&self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::Adler(adler) => Some(adler.finish()),
            Self::Crc(crc) => Some(crc.value()),
        }
    }
}

/// Framed streaming codec.
///
/// # Example
///
/// ```rust
/// use oxiflate::codec::{Codec, Format};
/// use oxiflate::deflate::DeflateOptions;
/// use oxiflate::inflate::InflateOptions;
///
/// let mut enc = Codec::new(Format::Gzip);
/// enc.init_deflate(DeflateOptions::new(6)).unwrap();
/// let packed = enc.compress_to_vec(b"stream me").unwrap();
///
/// let mut dec = Codec::new(Format::Gzip);
/// dec.init_inflate(InflateOptions::default()).unwrap();
/// assert_eq!(dec.decompress_to_vec(&packed).unwrap(), b"stream me");
/// ```
#[derive(Debug, Clone)]
pub struct Codec {
    format: Format,
    engine: Engine,
    phase: Phase,
    checksum: Checksum,
    /// Header or trailer bytes being emitted or collected.
    frame: Vec<u8>,
    frame_pos: usize,
    gzip_reader: GzipHeaderReader,
    gzip_header: Option<GzipHeader>,
    zlib_header: Option<ZlibHeader>,
    dictionary: Option<Vec<u8>>,
    payload_len: u64,
    total_in: u64,
    total_out: u64,
}

impl Codec {
    /// Create an uninitialized codec for `format`.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            engine: Engine::Unset,
            phase: format.initial_phase(),
            checksum: Checksum::for_format(format),
            frame: Vec::new(),
            frame_pos: 0,
            gzip_reader: GzipHeaderReader::new(),
            gzip_header: None,
            zlib_header: None,
            dictionary: None,
            payload_len: 0,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Container format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Direction chosen at initialization, if any.
    pub fn direction(&self) -> Option<Direction> {
        match self.engine {
            Engine::Unset => None,
            Engine::Deflate(_) => Some(Direction::Compress),
            Engine::Inflate(_) => Some(Direction::Decompress),
        }
    }

    /// Set up the compressor. A codec is initialized once.
    pub fn init_deflate(&mut self, options: DeflateOptions) -> Result<()> {
        self.ensure_unset()?;
        let deflater = Deflater::with_options(options)?;
        debug!(format = %self.format, "codec initialized for compression");
        self.engine = Engine::Deflate(Box::new(deflater));
        Ok(())
    }

    /// Set up the decompressor. A codec is initialized once.
    pub fn init_inflate(&mut self, options: InflateOptions) -> Result<()> {
        self.ensure_unset()?;
        let inflater = Inflater::with_options(options)?;
        debug!(format = %self.format, "codec initialized for decompression");
        self.engine = Engine::Inflate(Box::new(inflater));
        Ok(())
    }

    fn ensure_unset(&self) -> Result<()> {
        match self.direction() {
            None => Ok(()),
            Some(Direction::Compress) => Err(OxiflateError::invalid_state(
                "codec is already initialized for compression",
            )),
            Some(Direction::Decompress) => Err(OxiflateError::invalid_state(
                "codec is already initialized for decompression",
            )),
        }
    }

    /// Header to write on a gzip compression stream.
    ///
    /// Fixed once the first byte of output has been produced.
    pub fn set_gzip_header(&mut self, header: GzipHeader) -> Result<()> {
        if self.format != Format::Gzip {
            return Err(OxiflateError::invalid_config(format!(
                "gzip header supplied to a {} codec",
                self.format
            )));
        }
        if self.direction() == Some(Direction::Decompress) {
            return Err(OxiflateError::invalid_state(
                "the gzip header is read from the stream when decompressing",
            ));
        }
        if self.phase != Phase::Header || !self.frame.is_empty() {
            return Err(OxiflateError::invalid_state(
                "the gzip header is fixed once framing has begun",
            ));
        }
        self.gzip_header = Some(header);
        Ok(())
    }

    /// The gzip header: as supplied when compressing, as parsed when
    /// decompressing.
    pub fn gzip_header(&self) -> Option<&GzipHeader> {
        self.gzip_header.as_ref()
    }

    /// The parsed zlib header.
    pub fn zlib_header(&self) -> Option<&ZlibHeader> {
        self.zlib_header.as_ref()
    }

    /// Supply a preset dictionary.
    ///
    /// When compressing it primes the window and, for zlib, sets FDICT.
    /// When decompressing zlib it is checked against the header's DICTID.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.format == Format::Gzip {
            return Err(OxiflateError::invalid_config(
                "gzip streams cannot carry a preset dictionary",
            ));
        }
        match &mut self.engine {
            Engine::Unset => Err(OxiflateError::invalid_state(
                "initialize the codec before setting a dictionary",
            )),
            Engine::Deflate(deflater) => {
                if self.total_out > 0 || !self.frame.is_empty() {
                    return Err(OxiflateError::invalid_state(
                        "dictionary must be set before compression starts",
                    ));
                }
                deflater.set_dictionary(dictionary).map(|_| ())
            }
            Engine::Inflate(inflater) => {
                if self.phase != self.format.initial_phase() || self.total_out > 0 {
                    return Err(OxiflateError::invalid_state(
                        "dictionary must be set before decompression starts",
                    ));
                }
                if self.format == Format::Raw {
                    inflater.set_dictionary(dictionary)?;
                }
                self.dictionary = Some(dictionary.to_vec());
                Ok(())
            }
        }
    }

    /// Bytes consumed by all steps, framing included.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Bytes produced by all steps, framing included.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Uncompressed bytes that have passed through.
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Running checksum of the uncompressed payload (Adler-32 for zlib,
    /// CRC-32 for gzip, none for raw).
    pub fn checksum(&self) -> Option<u32> {
        self.checksum.value()
    }

    /// Whether the stream, trailer included, is complete.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// What the codec is waiting for, for end-of-input reporting.
    pub fn expecting(&self) -> &'static str {
        match (self.phase, self.format) {
            (Phase::Header, Format::Zlib) => "zlib header",
            (Phase::Header, Format::Gzip) => "gzip header",
            (Phase::Trailer, Format::Zlib) => "zlib trailer",
            (Phase::Trailer, Format::Gzip) => "gzip trailer",
            (Phase::Done, _) => "end of stream",
            _ => "compressed data",
        }
    }

    /// Start a new stream with the same format, direction and options.
    ///
    /// A supplied gzip header is kept for compression; parsed headers are
    /// dropped.
    pub fn reset(&mut self) {
        match &mut self.engine {
            Engine::Unset => {}
            Engine::Deflate(deflater) => deflater.reset(),
            Engine::Inflate(inflater) => {
                inflater.reset();
                self.gzip_header = None;
            }
        }
        self.phase = self.format.initial_phase();
        self.checksum = Checksum::for_format(self.format);
        self.frame.clear();
        self.frame_pos = 0;
        self.gzip_reader = GzipHeaderReader::new();
        self.zlib_header = None;
        self.dictionary = None;
        self.payload_len = 0;
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Compression step.
    ///
    /// Returns (bytes consumed, bytes produced, status). Input supplied
    /// after the stream finished is a state error.
    pub fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        self.check_usable()?;
        let result = self.compress_step(input, output, flush);
        self.account(result)
    }

    /// Decompression step.
    ///
    /// Returns (bytes consumed, bytes produced, status). Bytes after the
    /// end of the stream are left unconsumed.
    pub fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        self.check_usable()?;
        let result = self.decompress_step(input, output);
        self.account(result)
    }

    fn check_usable(&self) -> Result<()> {
        if self.phase == Phase::Failed {
            return Err(OxiflateError::invalid_state(
                "the stream failed earlier and cannot continue",
            ));
        }
        Ok(())
    }

    fn account<S>(&mut self, result: Result<(usize, usize, S)>) -> Result<(usize, usize, S)> {
        match result {
            Ok((consumed, produced, status)) => {
                self.total_in += consumed as u64;
                self.total_out += produced as u64;
                Ok((consumed, produced, status))
            }
            Err(err) => {
                let terminal = matches!(
                    err.kind(),
                    ErrorKind::Format | ErrorKind::Integrity | ErrorKind::Truncated
                ) && !matches!(err, OxiflateError::DictionaryRequired { .. });
                if terminal {
                    self.phase = Phase::Failed;
                }
                Err(err)
            }
        }
    }

    fn compress_step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        let deflater = match &mut self.engine {
            Engine::Deflate(deflater) => deflater,
            Engine::Unset => return Err(OxiflateError::invalid_state("codec is not initialized")),
            Engine::Inflate(_) => {
                return Err(OxiflateError::invalid_state(
                    "codec is initialized for decompression",
                ));
            }
        };

        let mut in_pos = 0;
        let mut out_pos = 0;
        loop {
            match self.phase {
                Phase::Header => {
                    if self.frame.is_empty() {
                        self.frame = encode_header(
                            self.format,
                            deflater,
                            self.gzip_header.as_ref(),
                        )?;
                        self.frame_pos = 0;
                        debug!(format = %self.format, len = self.frame.len(), "header written");
                    }
                    out_pos += drain(&self.frame, &mut self.frame_pos, &mut output[out_pos..]);
                    if self.frame_pos < self.frame.len() {
                        return Ok((in_pos, out_pos, CompressStatus::NeedsOutput));
                    }
                    self.phase = Phase::Body;
                }
                Phase::Body => {
                    let (consumed, produced, status) =
                        deflater.deflate(&input[in_pos..], &mut output[out_pos..], flush)?;
                    self.checksum.update(&input[in_pos..in_pos + consumed]);
                    self.payload_len += consumed as u64;
                    in_pos += consumed;
                    out_pos += produced;
                    if status != CompressStatus::Done {
                        return Ok((in_pos, out_pos, status));
                    }
                    self.frame = encode_trailer(self.format, &self.checksum, self.payload_len);
                    self.frame_pos = 0;
                    self.phase = Phase::Trailer;
                }
                Phase::Trailer => {
                    out_pos += drain(&self.frame, &mut self.frame_pos, &mut output[out_pos..]);
                    if self.frame_pos < self.frame.len() {
                        return Ok((in_pos, out_pos, CompressStatus::NeedsOutput));
                    }
                    debug!(
                        format = %self.format,
                        payload = self.payload_len,
                        checksum = ?self.checksum.value(),
                        "stream finished"
                    );
                    self.phase = Phase::Done;
                }
                Phase::Done => {
                    if in_pos < input.len() {
                        return Err(OxiflateError::invalid_state(
                            "input supplied after the stream was finished",
                        ));
                    }
                    return Ok((in_pos, out_pos, CompressStatus::Done));
                }
                Phase::Failed => {
                    return Err(OxiflateError::invalid_state("the stream failed earlier"));
                }
            }
        }
    }

    fn decompress_step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        let inflater = match &mut self.engine {
            Engine::Inflate(inflater) => inflater,
            Engine::Unset => return Err(OxiflateError::invalid_state("codec is not initialized")),
            Engine::Deflate(_) => {
                return Err(OxiflateError::invalid_state(
                    "codec is initialized for compression",
                ));
            }
        };

        let mut in_pos = 0;
        let mut out_pos = 0;
        loop {
            match self.phase {
                Phase::Header if self.format == Format::Gzip => {
                    let (used, header) = self.gzip_reader.feed(&input[in_pos..])?;
                    in_pos += used;
                    let Some(header) = header else {
                        return Ok((in_pos, out_pos, DecompressStatus::NeedsInput));
                    };
                    debug!(
                        filename = ?header.filename,
                        mtime = header.mtime,
                        os = header.os,
                        len = self.gzip_reader.bytes_read(),
                        "gzip header parsed"
                    );
                    self.gzip_header = Some(header);
                    self.phase = Phase::Body;
                }
                Phase::Header => {
                    let before = self.frame.len();
                    let take = (ZLIB_HEADER_MAX - before).min(input.len() - in_pos);
                    self.frame.extend_from_slice(&input[in_pos..in_pos + take]);

                    let parsed = match ZlibHeader::parse(&self.frame) {
                        Ok(Some((header, used))) => {
                            accept_header(&header, inflater, self.dictionary.as_deref())
                                .map(|()| Some((header, used)))
                        }
                        other => other,
                    };
                    let (header, used) = match parsed {
                        Ok(Some(parsed)) => parsed,
                        Ok(None) => {
                            in_pos += take;
                            return Ok((in_pos, out_pos, DecompressStatus::NeedsInput));
                        }
                        Err(err) => {
                            // Leave the bytes unconsumed so a dictionary can be supplied.
                            self.frame.truncate(before);
                            return Err(err);
                        }
                    };
                    debug!(format = %self.format, len = used, "header parsed");
                    self.zlib_header = Some(header);
                    in_pos += used - before;
                    self.frame.clear();
                    self.phase = Phase::Body;
                }
                Phase::Body => {
                    let (consumed, produced, status) =
                        inflater.inflate(&input[in_pos..], &mut output[out_pos..])?;
                    self.checksum.update(&output[out_pos..out_pos + produced]);
                    self.payload_len += produced as u64;
                    in_pos += consumed;
                    out_pos += produced;
                    if status != DecompressStatus::Done {
                        return Ok((in_pos, out_pos, status));
                    }
                    self.phase = match self.format {
                        Format::Raw => Phase::Done,
                        Format::Gzip if self.payload_len == 0 => {
                            debug!("empty gzip payload, trailer not checked");
                            Phase::Done
                        }
                        _ => Phase::Trailer,
                    };
                }
                Phase::Trailer => {
                    let need = self.format.trailer_len() - self.frame.len();
                    let take = need.min(input.len() - in_pos);
                    self.frame.extend_from_slice(&input[in_pos..in_pos + take]);
                    in_pos += take;
                    if self.frame.len() < self.format.trailer_len() {
                        return Ok((in_pos, out_pos, DecompressStatus::NeedsInput));
                    }
                    if let Err(err) =
                        verify_trailer(self.format, &self.frame, &self.checksum, self.payload_len)
                    {
                        // Hand over this call's output first; the next call
                        // checks the held trailer again and fails.
                        if out_pos > 0 {
                            return Ok((in_pos, out_pos, DecompressStatus::NeedsOutput));
                        }
                        return Err(err);
                    }
                    debug!(format = %self.format, payload = self.payload_len, "trailer verified");
                    self.frame.clear();
                    self.phase = Phase::Done;
                }
                Phase::Done => return Ok((in_pos, out_pos, DecompressStatus::Done)),
                Phase::Failed => {
                    return Err(OxiflateError::invalid_state("the stream failed earlier"));
                }
            }
        }
    }

    /// Compress a whole buffer, finishing the stream.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() / 2 + 64);
        let mut chunk = vec![0u8; 32 * 1024];
        let mut pos = 0;
        loop {
            let (consumed, produced, status) =
                self.compress(&data[pos..], &mut chunk, FlushMode::Finish)?;
            pos += consumed;
            output.extend_from_slice(&chunk[..produced]);
            if status == CompressStatus::Done {
                return Ok(output);
            }
        }
    }

    /// Decompress a complete stream held in memory.
    ///
    /// Input that ends before the trailer does is a truncation error.
    pub fn decompress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut chunk = vec![0u8; 32 * 1024];
        let mut pos = 0;
        loop {
            let (consumed, produced, status) = self.decompress(&data[pos..], &mut chunk)?;
            pos += consumed;
            output.extend_from_slice(&chunk[..produced]);
            match status {
                DecompressStatus::Done => return Ok(output),
                DecompressStatus::NeedsInput if pos >= data.len() && produced == 0 => {
                    return Err(OxiflateError::unexpected_eof(self.expecting()));
                }
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => {}
            }
        }
    }
}

impl Compressor for Codec {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        Codec::compress(self, input, output, flush)
    }

    fn reset(&mut self) {
        Codec::reset(self);
    }

    fn is_finished(&self) -> bool {
        Codec::is_finished(self)
    }
}

impl Decompressor for Codec {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        Codec::decompress(self, input, output)
    }

    fn reset(&mut self) {
        Codec::reset(self);
    }

    fn is_finished(&self) -> bool {
        Codec::is_finished(self)
    }
}

fn drain(frame: &[u8], pos: &mut usize, output: &mut [u8]) -> usize {
    let n = (frame.len() - *pos).min(output.len());
    output[..n].copy_from_slice(&frame[*pos..*pos + n]);
    *pos += n;
    n
}

fn encode_header(
    format: Format,
    deflater: &Deflater,
    gzip_header: Option<&GzipHeader>,
) -> Result<Vec<u8>> {
    let options = deflater.options();
    match format {
        Format::Raw => Ok(Vec::new()),
        Format::Zlib => Ok(ZlibHeader::for_options(options, deflater.dictionary_id()).to_bytes()),
        Format::Gzip => gzip_header
            .cloned()
            .unwrap_or_default()
            .encode(options.level, options.strategy),
    }
}

fn encode_trailer(format: Format, checksum: &Checksum, payload_len: u64) -> Vec<u8> {
    let value = checksum.value().unwrap_or(0);
    match format {
        Format::Raw => Vec::new(),
        Format::Zlib => value.to_be_bytes().to_vec(),
        Format::Gzip => GzipTrailer {
            crc32: value,
            size: payload_len as u32,
        }
        .to_bytes()
        .to_vec(),
    }
}

fn accept_header(
    header: &ZlibHeader,
    inflater: &mut Inflater,
    dictionary: Option<&[u8]>,
) -> Result<()> {
    let decoder_bits = inflater.options().window_bits;
    if header.window_bits > decoder_bits {
        return Err(OxiflateError::invalid_header(format!(
            "zlib window 2^{} exceeds decoder window 2^{}",
            header.window_bits, decoder_bits
        )));
    }
    let Some(expected) = header.dictionary_id else {
        return Ok(());
    };
    let Some(dictionary) = dictionary else {
        return Err(OxiflateError::DictionaryRequired { checksum: expected });
    };
    let computed = Adler32::checksum(dictionary);
    if computed != expected {
        return Err(OxiflateError::checksum_mismatch(
            "dictionary Adler-32",
            expected,
            computed,
        ));
    }
    inflater.set_dictionary(dictionary)
}

fn verify_trailer(format: Format, frame: &[u8], checksum: &Checksum, payload_len: u64) -> Result<()> {
    let computed = checksum.value().unwrap_or(0);
    match format {
        Format::Raw => Ok(()),
        Format::Zlib => {
            let expected = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
            if expected != computed {
                warn!(expected, computed, "zlib trailer checksum mismatch");
                return Err(OxiflateError::checksum_mismatch("Adler-32", expected, computed));
            }
            Ok(())
        }
        Format::Gzip => {
            let mut bytes = [0u8; TRAILER_LEN];
            bytes.copy_from_slice(&frame[..TRAILER_LEN]);
            let trailer = GzipTrailer::from_bytes(bytes);
            if trailer.crc32 != computed {
                warn!(expected = trailer.crc32, computed, "gzip trailer CRC mismatch");
                return Err(OxiflateError::checksum_mismatch("CRC-32", trailer.crc32, computed));
            }
            let actual = payload_len as u32;
            if trailer.size != actual {
                warn!(expected = trailer.size, actual, "gzip trailer size mismatch");
                return Err(OxiflateError::length_mismatch(trailer.size, actual));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gzip::gzip_compress;
    use crate::zlib::{zlib_compress, zlib_compress_with_dict};

    fn encoder(format: Format, level: u8) -> Codec {
        let mut codec = Codec::new(format);
        codec.init_deflate(DeflateOptions::new(level)).unwrap();
        codec
    }

    fn decoder(format: Format) -> Codec {
        let mut codec = Codec::new(format);
        codec.init_inflate(InflateOptions::default()).unwrap();
        codec
    }

    fn sample() -> Vec<u8> {
        b"Codec state bridges the engines and the caller's buffers. "
            .repeat(40)
    }

    #[test]
    fn test_roundtrip_every_format() {
        let data = sample();
        for format in [Format::Raw, Format::Zlib, Format::Gzip] {
            let packed = encoder(format, 6).compress_to_vec(&data).unwrap();
            let unpacked = decoder(format).decompress_to_vec(&packed).unwrap();
            assert_eq!(unpacked, data, "{}", format);
        }
    }

    #[test]
    fn test_double_init_is_state_error() {
        let mut codec = encoder(Format::Zlib, 6);
        let err = codec.init_inflate(InflateOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        let err = codec.init_deflate(DeflateOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_wrong_direction() {
        let mut codec = encoder(Format::Raw, 6);
        let mut out = [0u8; 16];
        let err = codec.decompress(&[0x03, 0x00], &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        let mut codec = Codec::new(Format::Raw);
        let err = codec.compress(b"x", &mut out, FlushMode::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_totals_include_framing() {
        let data = sample();
        let mut codec = encoder(Format::Gzip, 6);
        let packed = codec.compress_to_vec(&data).unwrap();
        assert_eq!(codec.total_in(), data.len() as u64);
        assert_eq!(codec.total_out(), packed.len() as u64);
        assert_eq!(codec.payload_len(), data.len() as u64);
        assert_eq!(codec.checksum(), Some(Crc32::compute(&data)));

        let mut codec = decoder(Format::Gzip);
        codec.decompress_to_vec(&packed).unwrap();
        assert_eq!(codec.total_in(), packed.len() as u64);
        assert_eq!(codec.total_out(), data.len() as u64);
    }

    #[test]
    fn test_write_after_finish() {
        let mut codec = encoder(Format::Gzip, 6);
        codec.compress_to_vec(b"done").unwrap();
        assert!(codec.is_finished());
        let mut out = [0u8; 64];
        let err = codec.compress(b"more", &mut out, FlushMode::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        // An empty finishing call is still fine.
        let (_, produced, status) = codec.compress(&[], &mut out, FlushMode::Finish).unwrap();
        assert_eq!((produced, status), (0, CompressStatus::Done));
    }

    #[test]
    fn test_tiny_output_buffers() {
        let data = sample();
        for format in [Format::Zlib, Format::Gzip] {
            let expected = encoder(format, 6).compress_to_vec(&data).unwrap();

            let mut codec = encoder(format, 6);
            let mut packed = Vec::new();
            let mut out = [0u8; 3];
            let mut pos = 0;
            loop {
                let (consumed, produced, status) =
                    codec.compress(&data[pos..], &mut out, FlushMode::Finish).unwrap();
                pos += consumed;
                packed.extend_from_slice(&out[..produced]);
                if status == CompressStatus::Done {
                    break;
                }
            }
            assert_eq!(packed, expected);
        }
    }

    #[test]
    fn test_split_header_and_trailer() {
        let data = sample();
        let header = GzipHeader::new().with_filename("split.txt").with_comment("one byte at a time");
        let mut enc = encoder(Format::Gzip, 6);
        enc.set_gzip_header(header.clone()).unwrap();
        let packed = enc.compress_to_vec(&data).unwrap();

        let mut codec = decoder(Format::Gzip);
        let mut unpacked = Vec::new();
        let mut out = [0u8; 7];
        for byte in &packed {
            let mut fed = 0;
            loop {
                let (consumed, produced, status) =
                    codec.decompress(&std::slice::from_ref(byte)[fed..], &mut out).unwrap();
                fed += consumed;
                unpacked.extend_from_slice(&out[..produced]);
                if status != DecompressStatus::NeedsOutput {
                    break;
                }
            }
        }
        while !codec.is_finished() {
            let (_, produced, _) = codec.decompress(&[], &mut out).unwrap();
            unpacked.extend_from_slice(&out[..produced]);
        }
        assert_eq!(unpacked, data);
        assert_eq!(codec.gzip_header(), Some(&header));
        assert_eq!(codec.total_in(), packed.len() as u64);
    }

    #[test]
    fn test_trailer_mismatch_after_payload_is_delivered() {
        let data = b"thirty-four bytes of gzip payload!";
        for format in [Format::Zlib, Format::Gzip] {
            let mut packed = encoder(format, 6).compress_to_vec(data).unwrap();
            let crc_at = packed.len() - format.trailer_len();
            packed[crc_at] ^= 0x01;

            let mut codec = decoder(format);
            let mut out = [0u8; 4096];
            let (consumed, produced, status) = codec.decompress(&packed, &mut out).unwrap();
            assert_eq!(consumed, packed.len(), "{}", format);
            assert_eq!(&out[..produced], data, "{}", format);
            assert_eq!(status, DecompressStatus::NeedsOutput);
            assert!(!codec.is_finished());

            let err = codec.decompress(&[], &mut out).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Integrity, "{}", format);
            let err = codec.decompress(&[], &mut out).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::State);

            let err = decoder(format).decompress_to_vec(&packed).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Integrity);
        }
    }

    #[test]
    fn test_endless_gzip_name_is_rejected() {
        let mut codec = decoder(Format::Gzip);
        let mut out = [0u8; 64];
        let fixed = [0x1F, 0x8B, 8, crate::gzip::flags::FNAME, 0, 0, 0, 0, 0, 255];
        let (consumed, _, status) = codec.decompress(&fixed, &mut out).unwrap();
        assert_eq!((consumed, status), (fixed.len(), DecompressStatus::NeedsInput));

        let chunk = [b'a'; 1024];
        let mut fed = 0usize;
        let err = loop {
            match codec.decompress(&chunk, &mut out) {
                Ok((consumed, produced, _)) => {
                    assert_eq!((consumed, produced), (chunk.len(), 0));
                    fed += consumed;
                }
                Err(err) => break err,
            }
            assert!(fed < crate::gzip::MAX_HEADER_LEN, "header grew without bound");
        };
        assert_eq!(err.kind(), ErrorKind::Format);
        let err = codec.decompress(&chunk, &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_trailing_bytes_untouched() {
        let mut packed = zlib_compress(b"payload", 6).unwrap();
        let len = packed.len();
        packed.extend_from_slice(b"GARBAGE");
        let mut codec = decoder(Format::Zlib);
        let mut out = [0u8; 64];
        let (consumed, produced, status) = codec.decompress(&packed, &mut out).unwrap();
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(consumed, len);
        assert_eq!(&out[..produced], b"payload");
    }

    #[test]
    fn test_empty_gzip_skips_trailer() {
        let mut packed = gzip_compress(b"", 6).unwrap();
        let trailer_start = packed.len() - TRAILER_LEN;
        // A damaged trailer goes unnoticed when nothing was produced.
        packed[trailer_start] ^= 0xFF;
        let out = decoder(Format::Gzip).decompress_to_vec(&packed).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_dictionary_retry() {
        let dict = b"shared vocabulary for both ends";
        let packed = zlib_compress_with_dict(b"vocabulary shared", 6, dict).unwrap();

        let mut codec = decoder(Format::Zlib);
        let mut out = [0u8; 64];
        let err = codec.decompress(&packed, &mut out).unwrap_err();
        assert!(matches!(err, OxiflateError::DictionaryRequired { .. }));

        codec.set_dictionary(dict).unwrap();
        let (consumed, produced, status) = codec.decompress(&packed, &mut out).unwrap();
        assert_eq!(status, DecompressStatus::Done);
        assert_eq!(consumed, packed.len());
        assert_eq!(&out[..produced], b"vocabulary shared");
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut packed = zlib_compress(&sample(), 6).unwrap();
        let last = packed.len() - 1;
        packed[last] ^= 0x10;
        let mut codec = decoder(Format::Zlib);
        let err = codec.decompress_to_vec(&packed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        let mut out = [0u8; 8];
        let err = codec.decompress(&[], &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_gzip_rejects_dictionary() {
        let mut codec = encoder(Format::Gzip, 6);
        let err = codec.set_dictionary(b"dict").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_header_fixed_after_start() {
        let mut codec = encoder(Format::Gzip, 6);
        let mut out = [0u8; 4];
        codec.compress(b"abc", &mut out, FlushMode::None).unwrap();
        let err = codec.set_gzip_header(GzipHeader::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_decoder_window_too_small() {
        let packed = zlib_compress(&sample(), 6).unwrap();
        let mut codec = Codec::new(Format::Zlib);
        codec
            .init_inflate(InflateOptions::default().with_window_bits(10))
            .unwrap();
        let err = codec.decompress_to_vec(&packed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_reset_reuses_codec() {
        let data = sample();
        let mut codec = encoder(Format::Zlib, 9);
        let first = codec.compress_to_vec(&data).unwrap();
        codec.reset();
        let second = codec.compress_to_vec(&data).unwrap();
        assert_eq!(first, second);
    }
}
