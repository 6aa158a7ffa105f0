//! Decompress command implementation.

use super::FormatArg;
use crate::utils::{create_output, create_progress_bar, decompressed_path, open_compressed, savings};
use filetime::FileTime;
use oxiflate::{CodecStream, GzipHeader, Mode, OxiflateError};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options for the decompress command.
pub struct DecompressOptions {
    pub output: Option<PathBuf>,
    pub format: Option<FormatArg>,
    pub force: bool,
    pub progress: bool,
}

pub fn cmd_decompress(
    input: &Path,
    options: &DecompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = match &options.output {
        Some(path) => path.clone(),
        None => decompressed_path(input)?,
    };
    let (reader, format) = open_compressed(input, options.format)?;
    let compressed = fs::metadata(input)?.len();

    let pb = create_progress_bar(compressed, options.progress);
    let mut stream = CodecStream::new(pb.wrap_read(reader), Mode::Decompress, format);
    let mut writer = BufWriter::new(create_output(&output, options.force)?);

    let copied = io::copy(&mut stream, &mut writer).and_then(|n| writer.flush().map(|_| n));
    pb.finish_and_clear();
    drop(writer);

    let written = match copied {
        Ok(n) => n,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&output) {
                warn!(path = %output.display(), error = %cleanup, "could not remove partial output");
            }
            return Err(OxiflateError::from_io(e).into());
        }
    };

    // The file is closed, so the restored time sticks.
    if let Some(modified) = stream.gzip_header().and_then(GzipHeader::modified) {
        filetime::set_file_mtime(&output, FileTime::from_system_time(modified))?;
        debug!(path = %output.display(), ?modified, "modification time restored");
    }

    println!(
        "{} -> {}: {} -> {} bytes ({} stream, {} saved)",
        input.display(),
        output.display(),
        compressed,
        written,
        format,
        savings(written, compressed)
    );
    Ok(())
}
