//! # OxiFlate Core
//!
//! Core components for the OxiFlate codec.
//!
//! - [`bitstream`]: LSB-first bit packing and resumable bit unpacking
//! - [`ringbuffer`]: Output window for DEFLATE decompression
//! - [`crc`]: Parameterized CRC-32
//! - [`adler`]: Adler-32
//! - [`traits`]: Streaming codec traits and option types
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: Stream facade, CLI                                  │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Framing                                             │
//! │     raw / zlib / gzip headers and trailers              │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Deflate (LZ77+Huffman), Inflate                     │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: BitStream (this crate)                              │
//! │     BitWriter/BitAccumulator, InflateWindow, checksums  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::adler::Adler32;
//! use oxiflate_core::crc::Crc32;
//!
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E60398);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler;
pub mod bitstream;
pub mod crc;
pub mod error;
pub mod ringbuffer;
pub mod traits;

// Re-exports for convenience
pub use adler::Adler32;
pub use bitstream::{BitAccumulator, BitWriter};
pub use crc::Crc32;
pub use error::{ErrorKind, OxiflateError, Result};
pub use ringbuffer::InflateWindow;
pub use traits::{
    CompressStatus, CompressionLevel, Compressor, DecompressStatus, Decompressor, FlushMode,
    Strategy,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler::Adler32;
    pub use crate::crc::Crc32;
    pub use crate::error::{ErrorKind, OxiflateError, Result};
    pub use crate::traits::{
        CompressionLevel, Compressor, Decompressor, FlushMode, Strategy,
    };
}
