//! OxiFlate CLI - gzip, zlib and raw DEFLATE from the command line
//!
//! A Pure Rust front end over the `oxiflate` stream facade.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::{
    CompressOptions, DecompressOptions, FormatArg, StrategyArg, cmd_compress, cmd_decompress,
    cmd_info, cmd_test,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oxiflate")]
#[command(author, version, about = "Pure Rust DEFLATE, zlib and gzip compressor")]
#[command(long_about = "
OxiFlate compresses and decompresses raw DEFLATE, zlib and gzip streams.

Examples:
  oxiflate compress notes.txt
  oxiflate compress -f zlib -l 9 data.bin
  oxiflate decompress notes.txt.gz
  oxiflate test notes.txt.gz data.bin.zz
  oxiflate info --json notes.txt.gz
")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Output file (defaults to the input name plus the format extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Container format
        #[arg(short, long, value_enum, default_value = "gzip")]
        format: FormatArg,

        /// Compression level (0 = store, 9 = best)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Match strategy
        #[arg(short, long, value_enum, default_value = "default")]
        strategy: StrategyArg,

        /// Do not store the file name and modification time in gzip headers
        #[arg(short = 'n', long)]
        no_name: bool,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        input: PathBuf,

        /// Output file (defaults to the input name without its extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Container format (detected from the leading bytes if omitted)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Check stream integrity without writing output
    #[command(alias = "t")]
    Test {
        /// Files to test
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Container format (detected from the leading bytes if omitted)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Show header fields and sizes of a compressed file
    #[command(alias = "i")]
    Info {
        /// File to inspect
        file: PathBuf,

        /// Container format (detected from the leading bytes if omitted)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            level,
            strategy,
            no_name,
            force,
            progress,
        } => cmd_compress(
            &input,
            &CompressOptions {
                output,
                format,
                level,
                strategy,
                store_name: !no_name,
                force,
                progress,
            },
        ),
        Commands::Decompress {
            input,
            output,
            format,
            force,
            progress,
        } => cmd_decompress(
            &input,
            &DecompressOptions {
                output,
                format,
                force,
                progress,
            },
        ),
        Commands::Test { files, format } => cmd_test(&files, format, cli.verbose > 0),
        Commands::Info { file, format, json } => cmd_info(&file, format, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
