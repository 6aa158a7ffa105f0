//! Byte-stream facade over a [`Codec`].
//!
//! A [`CodecStream`] wraps a captive source or sink and is created in one
//! [`Mode`]. The I/O direction is fixed by the first `read` or `write`:
//!
//! | mode         | `write(plain)`              | `read()`                         |
//! |--------------|-----------------------------|----------------------------------|
//! | `Compress`   | compresses into the sink    | returns compressed source bytes  |
//! | `Decompress` | decompresses into the sink  | returns decompressed source bytes|
//!
//! Using the other direction afterwards, or any I/O after [`close`], is a
//! state error. Settings (level, strategy, buffer size, gzip header) are
//! fixed once the first byte has moved.
//!
//! [`close`]: CodecStream::close

use crate::codec::{Codec, Direction, Format};
use crate::deflate::DeflateOptions;
use crate::gzip::GzipHeader;
use crate::inflate::InflateOptions;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{
    CompressStatus, CompressionLevel, DecompressStatus, FlushMode, Strategy,
};
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// Smallest accepted working buffer.
pub const MIN_BUFFER_SIZE: usize = 128;

/// Working buffer size unless configured otherwise.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// What the stream does to the bytes passing through it.
pub type Mode = Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Reader,
    Writer,
}

/// A one-directional compressing or decompressing stream.
///
/// # Example
///
/// ```rust
/// use oxiflate::codec::Format;
/// use oxiflate::stream::{CodecStream, Mode};
/// use std::io::{Read, Write};
///
/// let mut writer = CodecStream::new(Vec::new(), Mode::Compress, Format::Gzip);
/// writer.write_all(b"streamed through gzip").unwrap();
/// let packed = writer.into_inner().unwrap();
///
/// let mut reader = CodecStream::new(&packed[..], Mode::Decompress, Format::Gzip);
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "streamed through gzip");
/// ```
#[derive(Debug)]
pub struct CodecStream<S> {
    inner: Option<S>,
    mode: Mode,
    format: Format,
    options: DeflateOptions,
    inflate_options: InflateOptions,
    gzip_header: Option<GzipHeader>,
    flush_mode: FlushMode,
    buffer_size: usize,
    leave_open: bool,
    codec: Option<Codec>,
    access: Option<Access>,
    /// Working buffer; allocated on first I/O.
    buffer: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
    source_eof: bool,
    closed: bool,
}

impl<S> CodecStream<S> {
    /// Wrap `inner` with default settings.
    pub fn new(inner: S, mode: Mode, format: Format) -> Self {
        Self {
            inner: Some(inner),
            mode,
            format,
            options: DeflateOptions::default(),
            inflate_options: InflateOptions::default(),
            gzip_header: None,
            flush_mode: FlushMode::None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            leave_open: false,
            codec: None,
            access: None,
            buffer: Vec::new(),
            buf_pos: 0,
            buf_len: 0,
            source_eof: false,
            closed: false,
        }
    }

    /// Raw DEFLATE stream.
    pub fn deflate(inner: S, mode: Mode) -> Self {
        Self::new(inner, mode, Format::Raw)
    }

    /// zlib stream.
    pub fn zlib(inner: S, mode: Mode) -> Self {
        Self::new(inner, mode, Format::Zlib)
    }

    /// gzip stream.
    pub fn gzip(inner: S, mode: Mode) -> Self {
        Self::new(inner, mode, Format::Gzip)
    }

    /// Builder form of [`set_level`](Self::set_level).
    pub fn with_level(mut self, level: impl Into<CompressionLevel>) -> Result<Self> {
        self.set_level(level)?;
        Ok(self)
    }

    /// Builder form of [`set_leave_open`](Self::set_leave_open).
    pub fn with_leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }

    fn ensure_configurable(&self, what: &str) -> Result<()> {
        if self.codec.is_some() || self.closed {
            return Err(OxiflateError::invalid_state(format!(
                "{} cannot change after the stream has been used",
                what
            )));
        }
        Ok(())
    }

    /// Set the compression level.
    pub fn set_level(&mut self, level: impl Into<CompressionLevel>) -> Result<()> {
        self.ensure_configurable("compression level")?;
        self.options.level = level.into();
        Ok(())
    }

    /// Set the match strategy.
    pub fn set_strategy(&mut self, strategy: Strategy) -> Result<()> {
        self.ensure_configurable("strategy")?;
        self.options.strategy = strategy;
        Ok(())
    }

    /// Set the window size exponent used by either direction.
    pub fn set_window_bits(&mut self, window_bits: u8) -> Result<()> {
        self.ensure_configurable("window size")?;
        self.options.window_bits = window_bits;
        self.inflate_options = self.inflate_options.with_window_bits(window_bits);
        Ok(())
    }

    /// Set the working-buffer size (at least [`MIN_BUFFER_SIZE`]).
    pub fn set_buffer_size(&mut self, size: usize) -> Result<()> {
        self.ensure_configurable("buffer size")?;
        if size < MIN_BUFFER_SIZE {
            return Err(OxiflateError::invalid_config(format!(
                "buffer size {} is below the minimum of {}",
                size, MIN_BUFFER_SIZE
            )));
        }
        self.buffer_size = size;
        Ok(())
    }

    /// Flush mode applied after every `write` when compressing.
    ///
    /// `Finish` is not accepted here; use [`close`](Self::close).
    pub fn set_flush_mode(&mut self, flush: FlushMode) -> Result<()> {
        if flush == FlushMode::Finish {
            return Err(OxiflateError::invalid_config(
                "Finish is issued by close, not per write",
            ));
        }
        self.flush_mode = flush;
        Ok(())
    }

    /// Keep the captive stream alive after [`close`](Self::close).
    pub fn set_leave_open(&mut self, leave_open: bool) {
        self.leave_open = leave_open;
    }

    /// Header for a gzip compression stream.
    pub fn set_gzip_header(&mut self, header: GzipHeader) -> Result<()> {
        self.ensure_configurable("gzip header")?;
        if self.format != Format::Gzip {
            return Err(OxiflateError::invalid_config(format!(
                "gzip header supplied to a {} stream",
                self.format
            )));
        }
        self.gzip_header = Some(header);
        Ok(())
    }

    /// Gzip header: as supplied, or as parsed once decompression has read it.
    pub fn gzip_header(&self) -> Option<&GzipHeader> {
        match &self.codec {
            Some(codec) => codec.gzip_header(),
            None => self.gzip_header.as_ref(),
        }
    }

    /// Stream mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Container format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Working-buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Bytes fed into the codec so far.
    pub fn total_in(&self) -> u64 {
        self.codec.as_ref().map_or(0, Codec::total_in)
    }

    /// Bytes produced by the codec so far.
    pub fn total_out(&self) -> u64 {
        self.codec.as_ref().map_or(0, Codec::total_out)
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The captive stream, unless it was released by `close`.
    pub fn get_ref(&self) -> Option<&S> {
        self.inner.as_ref()
    }

    /// Mutable access to the captive stream.
    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.inner.as_mut()
    }

    fn begin(&mut self, access: Access) -> Result<()> {
        if self.closed {
            return Err(OxiflateError::invalid_state("stream is closed"));
        }
        match self.access {
            Some(current) if current != access => {
                return Err(OxiflateError::invalid_state(match current {
                    Access::Reader => "stream is in read mode; it cannot be written",
                    Access::Writer => "stream is in write mode; it cannot be read",
                }));
            }
            Some(_) => return Ok(()),
            None => {}
        }

        let mut codec = Codec::new(self.format);
        match self.mode {
            Direction::Compress => {
                codec.init_deflate(self.options)?;
                if let Some(header) = self.gzip_header.take() {
                    codec.set_gzip_header(header)?;
                }
            }
            Direction::Decompress => codec.init_inflate(self.inflate_options)?,
        }
        debug!(
            mode = ?self.mode,
            access = ?access,
            format = %self.format,
            buffer = self.buffer_size,
            "stream opened"
        );
        self.codec = Some(codec);
        self.buffer = vec![0u8; self.buffer_size];
        self.access = Some(access);
        Ok(())
    }

    fn codec_mut(&mut self) -> Result<&mut Codec> {
        self.codec
            .as_mut()
            .ok_or_else(|| OxiflateError::invalid_state("stream has not been used"))
    }
}

impl<S: Write> CodecStream<S> {
    fn pump_compress(&mut self, input: &[u8], flush: FlushMode) -> Result<()> {
        let (Some(codec), Some(sink)) = (self.codec.as_mut(), self.inner.as_mut()) else {
            return Err(OxiflateError::invalid_state("stream is closed"));
        };
        let mut pos = 0;
        loop {
            let (consumed, produced, status) =
                codec.compress(&input[pos..], &mut self.buffer, flush)?;
            sink.write_all(&self.buffer[..produced])?;
            pos += consumed;
            match status {
                CompressStatus::Done => return Ok(()),
                CompressStatus::NeedsOutput => {}
                CompressStatus::NeedsInput if pos == input.len() => return Ok(()),
                CompressStatus::NeedsInput => {}
            }
        }
    }

    /// Returns how much of `input` belonged to the compressed stream.
    fn pump_decompress(&mut self, input: &[u8]) -> Result<usize> {
        let (Some(codec), Some(sink)) = (self.codec.as_mut(), self.inner.as_mut()) else {
            return Err(OxiflateError::invalid_state("stream is closed"));
        };
        if codec.is_finished() {
            return Err(OxiflateError::invalid_state(
                "data written after the end of the compressed stream",
            ));
        }
        let mut pos = 0;
        loop {
            let (consumed, produced, status) = codec.decompress(&input[pos..], &mut self.buffer)?;
            sink.write_all(&self.buffer[..produced])?;
            pos += consumed;
            match status {
                DecompressStatus::Done => return Ok(pos),
                DecompressStatus::NeedsInput if pos == input.len() => return Ok(pos),
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => {}
            }
        }
    }

    fn finish_writing(&mut self) -> Result<()> {
        // An unused compressing stream still produces a valid empty stream.
        if self.access.is_none() && self.mode == Direction::Compress {
            self.begin(Access::Writer)?;
        }
        if self.access != Some(Access::Writer) {
            return Ok(());
        }
        match self.mode {
            Direction::Compress => self.pump_compress(&[], FlushMode::Finish)?,
            Direction::Decompress => {
                let codec = self.codec_mut()?;
                if !codec.is_finished() {
                    return Err(OxiflateError::unexpected_eof(codec.expecting()));
                }
            }
        }
        if let Some(sink) = self.inner.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Finish the stream and release the captive stream.
    ///
    /// When writing compressed output this emits the final block and
    /// trailer. The captive stream is dropped unless `leave_open` is set,
    /// in which case it stays reachable through [`get_mut`](Self::get_mut).
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.finish_writing();
        self.closed = true;
        debug!(
            total_in = self.total_in(),
            total_out = self.total_out(),
            leave_open = self.leave_open,
            "stream closed"
        );
        if !self.leave_open {
            self.inner = None;
        }
        result
    }

    /// Finish the stream and return the captive stream.
    pub fn into_inner(mut self) -> Result<S> {
        if !self.closed {
            self.finish_writing()?;
            self.closed = true;
        }
        self.inner
            .take()
            .ok_or_else(|| OxiflateError::invalid_state("captive stream was already released"))
    }
}

impl<S: Write> Write for CodecStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.begin(Access::Writer)?;
        if buf.is_empty() {
            return Ok(0);
        }
        match self.mode {
            Direction::Compress => {
                self.pump_compress(buf, self.flush_mode)?;
                Ok(buf.len())
            }
            Direction::Decompress => Ok(self.pump_decompress(buf)?),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(OxiflateError::invalid_state("stream is closed").into());
        }
        if self.access == Some(Access::Writer) && self.mode == Direction::Compress {
            self.pump_compress(&[], FlushMode::Sync)?;
        }
        if let Some(sink) = self.inner.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

impl<S: Read> Read for CodecStream<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.begin(Access::Reader)?;
        if out.is_empty() {
            return Ok(0);
        }
        let (Some(codec), Some(source)) = (self.codec.as_mut(), self.inner.as_mut()) else {
            return Err(OxiflateError::invalid_state("stream is closed").into());
        };

        loop {
            if codec.is_finished() {
                return Ok(0);
            }
            if self.buf_pos == self.buf_len && !self.source_eof {
                let n = source.read(&mut self.buffer)?;
                self.buf_pos = 0;
                self.buf_len = n;
                self.source_eof = n == 0;
            }
            let input = &self.buffer[self.buf_pos..self.buf_len];

            match self.mode {
                Direction::Decompress => {
                    let (consumed, produced, status) = codec.decompress(input, out)?;
                    self.buf_pos += consumed;
                    if produced > 0 {
                        return Ok(produced);
                    }
                    match status {
                        DecompressStatus::Done => return Ok(0),
                        DecompressStatus::NeedsInput
                            if self.source_eof && self.buf_pos == self.buf_len =>
                        {
                            return Err(OxiflateError::unexpected_eof(codec.expecting()).into());
                        }
                        DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => {}
                    }
                }
                Direction::Compress => {
                    let flush = if self.source_eof {
                        FlushMode::Finish
                    } else {
                        self.flush_mode
                    };
                    let (consumed, produced, status) = codec.compress(input, out, flush)?;
                    self.buf_pos += consumed;
                    if produced > 0 {
                        return Ok(produced);
                    }
                    if status == CompressStatus::Done {
                        return Ok(0);
                    }
                }
            }
        }
    }
}

impl<S> Drop for CodecStream<S> {
    fn drop(&mut self) {
        if !self.closed && self.access == Some(Access::Writer) {
            warn!(mode = ?self.mode, "stream dropped before close; output is incomplete");
        }
    }
}

/// Compress a buffer into `format` at `level`.
///
/// # Example
///
/// ```rust
/// use oxiflate::codec::Format;
/// use oxiflate::stream::{compress_buffer, uncompress_buffer};
///
/// let packed = compress_buffer(b"one shot", Format::Zlib, 6).unwrap();
/// assert_eq!(uncompress_buffer(&packed, Format::Zlib).unwrap(), b"one shot");
/// ```
pub fn compress_buffer(data: &[u8], format: Format, level: u8) -> Result<Vec<u8>> {
    let mut stream = CodecStream::new(Vec::new(), Mode::Compress, format);
    stream.set_level(CompressionLevel::try_new(level)?)?;
    stream.write_all(data).map_err(OxiflateError::from_io)?;
    stream.into_inner()
}

/// Compress the UTF-8 bytes of a string.
pub fn compress_string(text: &str, format: Format, level: u8) -> Result<Vec<u8>> {
    compress_buffer(text.as_bytes(), format, level)
}

/// Decompress a complete buffer.
pub fn uncompress_buffer(data: &[u8], format: Format) -> Result<Vec<u8>> {
    let mut stream = CodecStream::new(data, Mode::Decompress, format);
    let mut out = Vec::new();
    stream.read_to_end(&mut out).map_err(OxiflateError::from_io)?;
    Ok(out)
}

/// Decompress a complete buffer holding UTF-8 text.
pub fn uncompress_string(data: &[u8], format: Format) -> Result<String> {
    let bytes = uncompress_buffer(data, format)?;
    String::from_utf8(bytes)
        .map_err(|e| OxiflateError::encoding_error(format!("payload is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::ErrorKind;
    use std::io::Cursor;

    fn text() -> Vec<u8> {
        b"Streams move bytes one buffer at a time. ".repeat(300)
    }

    #[test]
    fn test_write_compress_read_decompress() {
        for format in [Format::Raw, Format::Zlib, Format::Gzip] {
            let mut writer = CodecStream::new(Vec::new(), Mode::Compress, format);
            for chunk in text().chunks(97) {
                writer.write_all(chunk).unwrap();
            }
            let packed = writer.into_inner().unwrap();
            assert!(packed.len() < text().len() / 4);

            let mut reader = CodecStream::new(&packed[..], Mode::Decompress, format);
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            assert_eq!(out, text(), "{}", format);
        }
    }

    #[test]
    fn test_read_compress_write_decompress() {
        let data = text();
        let mut reader = CodecStream::new(&data[..], Mode::Compress, Format::Zlib);
        reader.set_buffer_size(MIN_BUFFER_SIZE).unwrap();
        let mut packed = Vec::new();
        reader.read_to_end(&mut packed).unwrap();

        let mut writer = CodecStream::new(Vec::new(), Mode::Decompress, Format::Zlib);
        writer.write_all(&packed).unwrap();
        assert_eq!(writer.into_inner().unwrap(), data);
    }

    #[test]
    fn test_direction_fixed_on_first_use() {
        let mut stream = CodecStream::new(Cursor::new(Vec::new()), Mode::Compress, Format::Gzip);
        stream.write_all(b"first").unwrap();
        let mut buf = [0u8; 8];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(OxiflateError::from_io(err).kind(), ErrorKind::State);
    }

    #[test]
    fn test_settings_locked_after_use() {
        let mut stream = CodecStream::new(Vec::new(), Mode::Compress, Format::Zlib);
        stream.write_all(b"x").unwrap();
        assert_eq!(stream.set_buffer_size(4096).unwrap_err().kind(), ErrorKind::State);
        assert_eq!(stream.set_level(1).unwrap_err().kind(), ErrorKind::State);
    }

    #[test]
    fn test_buffer_floor() {
        let mut stream = CodecStream::new(Vec::<u8>::new(), Mode::Compress, Format::Zlib);
        let err = stream.set_buffer_size(MIN_BUFFER_SIZE - 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        stream.set_buffer_size(MIN_BUFFER_SIZE).unwrap();
        assert_eq!(stream.buffer_size(), MIN_BUFFER_SIZE);
    }

    #[test]
    fn test_write_after_close() {
        let mut stream = CodecStream::new(Vec::new(), Mode::Compress, Format::Gzip)
            .with_leave_open(true);
        stream.write_all(b"payload").unwrap();
        stream.close().unwrap();
        let err = stream.write(b"more").unwrap_err();
        assert_eq!(OxiflateError::from_io(err).kind(), ErrorKind::State);

        // leave_open keeps the sink reachable.
        let packed = stream.get_ref().unwrap().clone();
        assert_eq!(uncompress_buffer(&packed, Format::Gzip).unwrap(), b"payload");
    }

    #[test]
    fn test_close_releases_sink() {
        let mut stream = CodecStream::new(Vec::new(), Mode::Compress, Format::Raw);
        stream.write_all(b"bye").unwrap();
        stream.close().unwrap();
        assert!(stream.get_ref().is_none());
        assert!(stream.close().is_ok());
    }

    #[test]
    fn test_sync_flush_makes_prefix_decodable() {
        let mut stream = CodecStream::new(Vec::new(), Mode::Compress, Format::Raw);
        stream.write_all(b"visible before close").unwrap();
        stream.flush().unwrap();
        let prefix = stream.get_ref().unwrap().clone();
        assert_eq!(&prefix[prefix.len() - 4..], &[0x00, 0x00, 0xFF, 0xFF]);

        let mut inflater = crate::inflate::Inflater::new();
        let mut out = [0u8; 64];
        let (_, produced, _) = inflater.inflate(&prefix, &mut out).unwrap();
        assert_eq!(&out[..produced], b"visible before close");
    }

    #[test]
    fn test_truncated_source() {
        let packed = compress_buffer(&text(), Format::Gzip, 6).unwrap();
        let cut = &packed[..packed.len() - 5];
        let err = uncompress_buffer(cut, Format::Gzip).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn test_empty_source_is_truncated() {
        for format in [Format::Raw, Format::Zlib, Format::Gzip] {
            let empty: &[u8] = &[];
            let mut reader = CodecStream::new(empty, Mode::Decompress, format);
            let mut out = Vec::new();
            let err = reader.read_to_end(&mut out).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof, "{}", format);
            assert!(out.is_empty());
        }
        let err = uncompress_buffer(b"", Format::Gzip).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn test_write_past_end_of_stream() {
        let packed = compress_buffer(b"exactly this much", Format::Zlib, 6).unwrap();
        let mut input = packed.clone();
        input.extend_from_slice(b"junk");

        let mut writer = CodecStream::new(Vec::new(), Mode::Decompress, Format::Zlib);
        assert_eq!(writer.write(&input).unwrap(), packed.len());
        let err = writer.write(b"junk").unwrap_err();
        let err = OxiflateError::from_io(err);
        assert_eq!(err.kind(), ErrorKind::State);

        let mut writer = CodecStream::new(Vec::new(), Mode::Decompress, Format::Zlib);
        assert!(writer.write_all(&input).is_err());
        let mut writer = CodecStream::new(Vec::new(), Mode::Decompress, Format::Zlib);
        writer.write_all(&packed).unwrap();
        assert_eq!(writer.into_inner().unwrap(), b"exactly this much");
    }

    #[test]
    fn test_gzip_header_through_stream() {
        let mut writer = CodecStream::gzip(Vec::new(), Mode::Compress);
        writer
            .set_gzip_header(GzipHeader::new().with_filename("notes.txt").with_mtime(7))
            .unwrap();
        writer.write_all(b"named").unwrap();
        let packed = writer.into_inner().unwrap();

        let mut reader = CodecStream::gzip(&packed[..], Mode::Decompress);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        let header = reader.gzip_header().unwrap();
        assert_eq!(header.filename.as_deref(), Some("notes.txt"));
        assert_eq!(header.mtime, 7);
    }

    #[test]
    fn test_one_shot_strings() {
        for format in [Format::Raw, Format::Zlib, Format::Gzip] {
            let packed = compress_string("héllo wörld", format, 9).unwrap();
            assert_eq!(uncompress_string(&packed, format).unwrap(), "héllo wörld");
        }
        assert_eq!(
            compress_buffer(b"x", Format::Zlib, 12).unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_unused_writer_emits_empty_stream() {
        let stream = CodecStream::new(Vec::new(), Mode::Compress, Format::Zlib);
        let packed = stream.into_inner().unwrap();
        assert_eq!(packed, vec![0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert!(uncompress_buffer(&packed, Format::Zlib).unwrap().is_empty());
    }

    #[test]
    fn test_twenty_as_gzip_level_nine() {
        let packed = compress_buffer(b"aaaaaaaaaaaaaaaaaaaa", Format::Gzip, 9).unwrap();
        assert_eq!(&packed[packed.len() - 4..], &20u32.to_le_bytes());
        assert_eq!(uncompress_buffer(&packed, Format::Gzip).unwrap(), vec![b'a'; 20]);
    }
}
