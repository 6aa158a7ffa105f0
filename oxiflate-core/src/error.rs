//! Error types for OxiFlate operations.
//!
//! Every failure the codec can report is a variant of [`OxiflateError`].
//! Variants are grouped into a small number of classes ([`ErrorKind`]) so
//! callers can tell corrupt input apart from input that simply ended early,
//! and both apart from checksum failures or API misuse.

use std::io;
use thiserror::Error;

/// Coarse classification of an [`OxiflateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed compressed data or container header.
    Format,
    /// The input ended before a block, header or trailer was complete.
    Truncated,
    /// A trailer checksum or declared length did not match the payload.
    Integrity,
    /// The codec or stream was driven in an invalid order.
    State,
    /// An option value was out of range.
    Config,
    /// The captive source or sink failed.
    Io,
}

/// The main error type for OxiFlate operations.
#[derive(Debug, Error)]
pub enum OxiflateError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic number in a container header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// Unsupported compression method byte.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: u8,
    },

    /// Invalid container header.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Invalid block type (the reserved type 3).
    #[error("Invalid block type {block_type} at bit position {bit_position}")]
    InvalidBlockType {
        /// Block type bits as read.
        block_type: u8,
        /// Bit position of the block header.
        bit_position: u64,
    },

    /// Invalid Huffman code encountered during decompression.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: u64,
    },

    /// Invalid or inconsistent code length table.
    #[error("Invalid code lengths: {message}")]
    InvalidCodeLengths {
        /// Description of the problem.
        message: String,
    },

    /// Corrupted compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Input byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Back-reference reaching before the start of the history.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value.
        distance: usize,
        /// Number of history bytes available.
        history_size: usize,
    },

    /// Input ended early.
    #[error("Unexpected end of input while reading {context}")]
    UnexpectedEof {
        /// What was being read.
        context: &'static str,
    },

    /// Trailer or dictionary checksum mismatch.
    #[error("{what} mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Which checksum failed.
        what: &'static str,
        /// Value stored in the stream.
        expected: u32,
        /// Value computed from the data.
        computed: u32,
    },

    /// Declared uncompressed length (mod 2^32) mismatch.
    #[error("Length mismatch: trailer declares {expected} bytes, produced {actual}")]
    LengthMismatch {
        /// Value stored in the trailer.
        expected: u32,
        /// Produced length modulo 2^32.
        actual: u32,
    },

    /// The zlib stream needs a preset dictionary that was not supplied.
    #[error("Preset dictionary required (Adler-32 {checksum:#010x})")]
    DictionaryRequired {
        /// Adler-32 of the expected dictionary.
        checksum: u32,
    },

    /// Operation invalid in the current state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the misuse.
        message: String,
    },

    /// Option value out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the rejected option.
        message: String,
    },

    /// Encoding error in a gzip text field.
    #[error("Encoding error: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiflateError>;

impl OxiflateError {
    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: u8) -> Self {
        Self::UnsupportedMethod { method }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an invalid block type error.
    pub fn invalid_block_type(block_type: u8, bit_position: u64) -> Self {
        Self::InvalidBlockType {
            block_type,
            bit_position,
        }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: u64) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create an invalid code lengths error.
    pub fn invalid_code_lengths(message: impl Into<String>) -> Self {
        Self::InvalidCodeLengths {
            message: message.into(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create an unexpected end-of-input error.
    pub fn unexpected_eof(context: &'static str) -> Self {
        Self::UnexpectedEof { context }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(what: &'static str, expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch {
            what,
            expected,
            computed,
        }
    }

    /// Create a length mismatch error.
    pub fn length_mismatch(expected: u32, actual: u32) -> Self {
        Self::LengthMismatch { expected, actual }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an encoding error.
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidMagic { .. }
            | Self::UnsupportedMethod { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidBlockType { .. }
            | Self::InvalidHuffmanCode { .. }
            | Self::InvalidCodeLengths { .. }
            | Self::CorruptedData { .. }
            | Self::InvalidDistance { .. }
            | Self::DictionaryRequired { .. }
            | Self::EncodingError { .. } => ErrorKind::Format,
            Self::UnexpectedEof { .. } => ErrorKind::Truncated,
            Self::ChecksumMismatch { .. } | Self::LengthMismatch { .. } => ErrorKind::Integrity,
            Self::InvalidState { .. } => ErrorKind::State,
            Self::InvalidConfig { .. } => ErrorKind::Config,
        }
    }

    /// Recover an `OxiflateError` that was tunnelled through `io::Error`.
    ///
    /// Plain I/O errors come back as [`OxiflateError::Io`].
    pub fn from_io(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<OxiflateError>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(own) = inner.downcast::<OxiflateError>() {
                    return *own;
                }
            }
            return Self::invalid_state("lost tunnelled error");
        }
        Self::Io(err)
    }
}

impl From<OxiflateError> for io::Error {
    fn from(err: OxiflateError) -> Self {
        if let OxiflateError::Io(inner) = err {
            return inner;
        }
        let kind = match err.kind() {
            ErrorKind::Io => io::ErrorKind::Other,
            ErrorKind::Format | ErrorKind::Integrity => io::ErrorKind::InvalidData,
            ErrorKind::Truncated => io::ErrorKind::UnexpectedEof,
            ErrorKind::State => io::ErrorKind::Other,
            ErrorKind::Config => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxiflateError::invalid_magic(vec![0x1F, 0x8B], vec![0x50, 0x4B]);
        assert!(err.to_string().contains("Invalid magic"));

        let err = OxiflateError::checksum_mismatch("CRC-32", 0x12345678, 0xDEADBEEF);
        assert!(err.to_string().contains("CRC-32 mismatch"));

        let err = OxiflateError::unsupported_method(9);
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            OxiflateError::invalid_block_type(3, 0).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            OxiflateError::unexpected_eof("trailer").kind(),
            ErrorKind::Truncated
        );
        assert_eq!(
            OxiflateError::length_mismatch(1, 2).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            OxiflateError::invalid_state("closed").kind(),
            ErrorKind::State
        );
        assert_eq!(
            OxiflateError::invalid_config("level").kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: OxiflateError = io_err.into();
        assert!(matches!(err, OxiflateError::Io(_)));
    }

    #[test]
    fn test_io_tunnel_roundtrip() {
        let io_err: io::Error = OxiflateError::length_mismatch(20, 19).into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);

        let back = OxiflateError::from_io(io_err);
        assert!(matches!(
            back,
            OxiflateError::LengthMismatch {
                expected: 20,
                actual: 19
            }
        ));
    }

    #[test]
    fn test_plain_io_passes_through() {
        let io_err: io::Error = OxiflateError::Io(io::Error::other("disk")).into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
        assert!(matches!(OxiflateError::from_io(io_err), OxiflateError::Io(_)));
    }
}
