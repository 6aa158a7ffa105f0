//! Info command implementation.

use super::FormatArg;
use crate::utils::{open_compressed, savings};
use oxiflate::{Codec, DecompressStatus, InflateOptions, OxiflateError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::Path;

/// JSON serializable gzip header fields.
#[derive(Debug, Serialize, Deserialize)]
struct GzipJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtime: Option<u32>,
    os: u8,
    os_name: String,
    extra_flags: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_len: Option<usize>,
    text: bool,
    header_crc: bool,
}

/// JSON serializable zlib header fields.
#[derive(Debug, Serialize, Deserialize)]
struct ZlibJson {
    window_bits: u8,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dictionary_id: Option<u32>,
}

/// JSON output for the info command.
#[derive(Debug, Serialize, Deserialize)]
struct InfoJson {
    file: String,
    format: String,
    compressed_size: u64,
    uncompressed_size: u64,
    ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<u32>,
    trailing_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    gzip: Option<GzipJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zlib: Option<ZlibJson>,
}

pub fn cmd_info(
    file: &Path,
    format: Option<FormatArg>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let info = inspect(file, format)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Stream Information");
    println!("==================");
    println!("File: {}", info.file);
    println!("Format: {}", info.format);
    println!("Compressed size: {} bytes", info.compressed_size);
    println!("Uncompressed size: {} bytes", info.uncompressed_size);
    println!(
        "Space savings: {}",
        savings(info.uncompressed_size, info.compressed_size)
    );
    if let Some(checksum) = info.checksum {
        println!("Checksum: {:#010x}", checksum);
    }
    if info.trailing_bytes > 0 {
        println!("Trailing bytes: {}", info.trailing_bytes);
    }

    if let Some(gzip) = &info.gzip {
        println!();
        println!("GZIP Header:");
        if let Some(name) = &gzip.filename {
            println!("  Original filename: {}", name);
        }
        if let Some(comment) = &gzip.comment {
            println!("  Comment: {}", comment);
        }
        if let Some(mtime) = gzip.mtime {
            println!("  Modification time: {} (Unix timestamp)", mtime);
        }
        println!("  Operating system: {} ({})", gzip.os_name, gzip.os);
        println!("  Extra flags: {}", gzip.extra_flags);
        if let Some(len) = gzip.extra_len {
            println!("  Extra field: {} bytes", len);
        }
        println!("  Text: {}", gzip.text);
        println!("  Header CRC: {}", gzip.header_crc);
    }
    if let Some(zlib) = &info.zlib {
        println!();
        println!("ZLIB Header:");
        println!("  Window: {} bits", zlib.window_bits);
        println!("  Level hint: {}", zlib.level);
        if let Some(id) = zlib.dictionary_id {
            println!("  Preset dictionary: {:#010x}", id);
        }
    }

    Ok(())
}

/// Decode the whole stream, keeping only its framing and totals.
fn inspect(file: &Path, format: Option<FormatArg>) -> Result<InfoJson, OxiflateError> {
    let file_len = fs::metadata(file)?.len();
    let (mut reader, format) = open_compressed(file, format)?;

    let mut codec = Codec::new(format);
    codec.init_inflate(InflateOptions::default())?;
    let mut input = vec![0u8; 64 * 1024];
    let mut scratch = vec![0u8; 64 * 1024];

    'read: loop {
        let n = reader.read(&mut input)?;
        if n == 0 {
            return Err(OxiflateError::unexpected_eof(codec.expecting()));
        }
        let mut pos = 0;
        loop {
            let (consumed, _, status) = codec.decompress(&input[pos..n], &mut scratch)?;
            pos += consumed;
            match status {
                DecompressStatus::Done => break 'read,
                DecompressStatus::NeedsInput if pos == n => break,
                DecompressStatus::NeedsInput | DecompressStatus::NeedsOutput => {}
            }
        }
    }

    let compressed = codec.total_in();
    let uncompressed = codec.payload_len();
    let ratio = if uncompressed > 0 {
        (1.0 - compressed as f64 / uncompressed as f64) * 100.0
    } else {
        0.0
    };

    Ok(InfoJson {
        file: file.display().to_string(),
        format: format.to_string(),
        compressed_size: compressed,
        uncompressed_size: uncompressed,
        ratio,
        checksum: codec.checksum(),
        trailing_bytes: file_len.saturating_sub(compressed),
        gzip: codec.gzip_header().map(|h| GzipJson {
            filename: h.filename.clone(),
            comment: h.comment.clone(),
            mtime: (h.mtime != 0).then_some(h.mtime),
            os: h.os,
            os_name: h.os_name().to_string(),
            extra_flags: h.extra_flags,
            extra_len: h.extra.as_ref().map(Vec::len),
            text: h.text,
            header_crc: h.header_crc,
        }),
        zlib: codec.zlib_header().map(|h| ZlibJson {
            window_bits: h.window_bits,
            level: format!("{:?}", h.level),
            dictionary_id: h.dictionary_id,
        }),
    })
}
