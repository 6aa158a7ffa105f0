//! Command implementations for OxiFlate CLI.

pub mod compress;
pub mod decompress;
pub mod info;

pub use compress::{CompressOptions, cmd_compress};
pub use decompress::{DecompressOptions, cmd_decompress};
pub use info::cmd_info;
pub use test::cmd_test;

use clap::ValueEnum;
use oxiflate::{Format, Strategy};

/// Container format selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Raw DEFLATE stream (RFC 1951)
    Raw,
    /// zlib stream (RFC 1950)
    Zlib,
    /// gzip member (RFC 1952)
    Gzip,
}

impl FormatArg {
    /// File extension appended on compression.
    pub fn extension(self) -> &'static str {
        match self {
            FormatArg::Raw => "deflate",
            FormatArg::Zlib => "zz",
            FormatArg::Gzip => "gz",
        }
    }
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Raw => Format::Raw,
            FormatArg::Zlib => Format::Zlib,
            FormatArg::Gzip => Format::Gzip,
        }
    }
}

/// Match strategy selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum StrategyArg {
    /// Regular LZ77 + Huffman
    #[default]
    Default,
    /// Favor Huffman coding over short distant matches
    Filtered,
    /// Literals only
    HuffmanOnly,
    /// Fixed Huffman codes only
    Fixed,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => Strategy::Default,
            StrategyArg::Filtered => Strategy::Filtered,
            StrategyArg::HuffmanOnly => Strategy::HuffmanOnly,
            StrategyArg::Fixed => Strategy::Fixed,
        }
    }
}
