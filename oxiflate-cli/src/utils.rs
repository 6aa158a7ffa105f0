//! Utility functions for the CLI.

use crate::commands::FormatArg;
use indicatif::{ProgressBar, ProgressStyle};
use oxiflate::{Format, ZlibHeader};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Gzip member magic.
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Create a byte progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    match ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("█▓▒░ ")),
        Err(e) => tracing::debug!(error = %e, "falling back to the default progress style"),
    }
    pb
}

/// Guess the container from the first bytes of a stream.
///
/// Anything that is neither a gzip member nor a well-formed zlib header is
/// treated as raw DEFLATE.
pub fn detect_format(prefix: &[u8]) -> Format {
    if prefix.starts_with(&GZIP_MAGIC) {
        return Format::Gzip;
    }
    if prefix.len() >= 2 && ZlibHeader::parse(prefix).is_ok() {
        return Format::Zlib;
    }
    Format::Raw
}

/// Open `path` for reading and settle its format: the explicit choice if
/// given, otherwise by sniffing the leading bytes.
pub fn open_compressed(
    path: &Path,
    format: Option<FormatArg>,
) -> io::Result<(BufReader<File>, Format)> {
    let mut file = File::open(path)?;
    let format = match format {
        Some(format) => format.into(),
        None => {
            let mut prefix = [0u8; 6];
            let n = read_prefix(&mut file, &mut prefix)?;
            file.seek(SeekFrom::Start(0))?;
            detect_format(&prefix[..n])
        }
    };
    tracing::debug!(path = %path.display(), %format, "input opened");
    Ok((BufReader::new(file), format))
}

fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Output path for compression: the input name plus the format extension.
pub fn compressed_path(input: &Path, format: FormatArg) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Output path for decompression: the input name without its compression
/// extension.
pub fn decompressed_path(input: &Path) -> io::Result<PathBuf> {
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("gz" | "z" | "zz" | "zlib" | "deflate") => Ok(input.with_extension("")),
        Some("tgz") => Ok(input.with_extension("tar")),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{}: unknown suffix; use --output to name the result",
                input.display()
            ),
        )),
    }
}

/// Create the output file, refusing to clobber unless `force` is set.
pub fn create_output(path: &Path, force: bool) -> io::Result<File> {
    if force {
        return File::create(path);
    }
    File::options().write(true).create_new(true).open(path)
}

/// Human-readable space savings.
pub fn savings(original: u64, compressed: u64) -> String {
    if original == 0 {
        return "-".to_string();
    }
    format!(
        "{:.1}%",
        (1.0 - compressed as f64 / original as f64) * 100.0
    )
}
