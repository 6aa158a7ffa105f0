//! Compress command implementation.

use super::{FormatArg, StrategyArg};
use crate::utils::{compressed_path, create_output, create_progress_bar, savings};
use oxiflate::{CodecStream, CompressionLevel, GzipHeader, Mode, OxiflateError};
use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options for the compress command.
pub struct CompressOptions {
    pub output: Option<PathBuf>,
    pub format: FormatArg,
    pub level: u8,
    pub strategy: StrategyArg,
    pub store_name: bool,
    pub force: bool,
    pub progress: bool,
}

pub fn cmd_compress(
    input: &Path,
    options: &CompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = fs::metadata(input)?;
    if metadata.is_dir() {
        return Err(format!("{} is a directory", input.display()).into());
    }
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| compressed_path(input, options.format));
    let file = create_output(&output, options.force)?;

    if let Err(e) = write_compressed(input, &metadata, file, options) {
        // Never leave a half-written stream behind.
        if let Err(cleanup) = fs::remove_file(&output) {
            warn!(path = %output.display(), error = %cleanup, "could not remove partial output");
        }
        return Err(e.into());
    }

    let compressed = fs::metadata(&output)?.len();
    println!(
        "{} -> {}: {} -> {} bytes ({} saved)",
        input.display(),
        output.display(),
        metadata.len(),
        compressed,
        savings(metadata.len(), compressed)
    );
    Ok(())
}

fn write_compressed(
    input: &Path,
    metadata: &Metadata,
    file: File,
    options: &CompressOptions,
) -> Result<(), OxiflateError> {
    let mut stream = CodecStream::new(BufWriter::new(file), Mode::Compress, options.format.into())
        .with_level(options.level)?;
    stream.set_strategy(options.strategy.into())?;
    if options.format == FormatArg::Gzip {
        stream.set_gzip_header(gzip_header(input, metadata, options)?)?;
    }

    let pb = create_progress_bar(metadata.len(), options.progress);
    let mut reader = pb.wrap_read(BufReader::new(File::open(input)?));
    let copied = io::copy(&mut reader, &mut stream).map_err(OxiflateError::from_io);
    pb.finish_and_clear();
    copied?;

    let mut sink = stream.into_inner()?;
    sink.flush()?;
    Ok(())
}

/// Gzip header carrying the input's file name and modification time.
fn gzip_header(
    input: &Path,
    metadata: &Metadata,
    options: &CompressOptions,
) -> Result<GzipHeader, OxiflateError> {
    let mut header = GzipHeader::new();
    if !options.store_name {
        return Ok(header);
    }
    if let Ok(modified) = metadata.modified() {
        header = header.with_modified(modified);
    }
    let Some(name) = input.file_name() else {
        return Ok(header);
    };

    let named = header.clone().with_filename(name.to_string_lossy());
    let level = CompressionLevel::try_new(options.level)?;
    match named.encode(level, options.strategy.into()) {
        Ok(_) => {
            debug!(filename = ?named.filename, mtime = named.mtime, "gzip header prepared");
            Ok(named)
        }
        Err(e) => {
            warn!(error = %e, "file name cannot be stored in the gzip header; omitting it");
            Ok(header)
        }
    }
}
