//! # OxiFlate
//!
//! Pure Rust implementation of DEFLATE (RFC 1951) with zlib (RFC 1950)
//! and gzip (RFC 1952) framing.
//!
//! ## Features
//!
//! - **Compression**: LZ77 + Huffman encoding
//!   - Levels 0-9 (store, greedy, lazy matching)
//!   - Strategies: default, filtered, Huffman-only, fixed
//!   - Stored, fixed and dynamic blocks chosen by cost
//!   - Partial, sync, full and finish flushes
//! - **Decompression**: all block types, resumable at any byte
//! - **Framing**: raw, zlib (with preset dictionaries), gzip (with
//!   filename, comment, extra field and header CRC)
//! - **Streams**: `Read`/`Write` adapters over any captive stream
//!
//! ## Example
//!
//! ```rust
//! use oxiflate::{deflate, inflate};
//!
//! // Compress data
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original, 6).unwrap();
//!
//! // Decompress data
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: No compression (stored blocks)
//! - Level 1-3: Greedy matching
//! - Level 4-9: Lazy matching (default is 6)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod deflate;
pub mod gzip;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod stream;
pub mod tables;
pub mod trees;
pub mod zlib;

// Re-exports
pub use codec::{Codec, Direction, Format};
pub use deflate::{DeflateOptions, Deflater, deflate, deflate_with_options};
pub use gzip::{GzipHeader, gzip_compress, gzip_decompress};
pub use inflate::{InflateOptions, Inflater, inflate};
pub use oxiflate_core::{
    CompressStatus, CompressionLevel, DecompressStatus, ErrorKind, FlushMode, OxiflateError,
    Result, Strategy,
};
pub use stream::{
    CodecStream, Mode, compress_buffer, compress_string, uncompress_buffer, uncompress_string,
};
pub use zlib::{ZlibHeader, zlib_compress, zlib_decompress};
