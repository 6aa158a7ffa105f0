//! DEFLATE compression.
//!
//! [`Deflater`] is a resumable RFC 1951 encoder. Each call consumes as much
//! input as the output space allows and stops when either side runs out.
//! The match loop is picked once, from the level table and the strategy:
//!
//! - level 0: stored blocks only
//! - levels 1-3: greedy matching
//! - levels 4-9: lazy matching
//! - [`Strategy::HuffmanOnly`]: literals only
//!
//! Encoded bits are staged in a pending buffer and copied to the caller's
//! output as space permits.

use crate::lz77::{MIN_LOOKAHEAD, MatchWindow, TOO_FAR};
use crate::tables::{Flavor, LEVEL_CONFIG, LevelConfig, MAX_STORED, MIN_MATCH};
use crate::trees::{BlockEncoder, write_empty_fixed_block, write_stored_block};
use oxiflate_core::BitWriter;
use oxiflate_core::adler::Adler32;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{CompressStatus, CompressionLevel, Compressor, FlushMode, Strategy};
use tracing::{debug, trace};

/// Smallest accepted window size exponent.
pub const MIN_WINDOW_BITS: u8 = 8;
/// Largest window size exponent (32 KiB).
pub const MAX_WINDOW_BITS: u8 = 15;

/// Compression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateOptions {
    /// Compression level.
    pub level: CompressionLevel,
    /// Match-engine strategy.
    pub strategy: Strategy,
    /// Window size exponent (8-15). 8 is treated as 9.
    pub window_bits: u8,
}

impl Default for DeflateOptions {
    fn default() -> Self {
        Self {
            level: CompressionLevel::DEFAULT,
            strategy: Strategy::Default,
            window_bits: MAX_WINDOW_BITS,
        }
    }
}

impl DeflateOptions {
    /// Options for a level with everything else at its default.
    pub fn new(level: impl Into<CompressionLevel>) -> Self {
        Self::default().with_level(level)
    }

    /// Set the compression level.
    pub fn with_level(mut self, level: impl Into<CompressionLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the window size exponent.
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits) {
            return Err(OxiflateError::invalid_config(format!(
                "window bits must be {}-{}, got {}",
                MIN_WINDOW_BITS, MAX_WINDOW_BITS, self.window_bits
            )));
        }
        CompressionLevel::try_new(self.level.level())?;
        Ok(())
    }

    /// Window exponent the encoder actually uses.
    pub fn effective_window_bits(&self) -> u8 {
        self.window_bits.max(9)
    }
}

/// Outcome of one run of a match loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Out of input or output; call again.
    NeedMore,
    /// A flush completed its block.
    BlockDone,
    /// The final block is written but not all of it reached the output.
    FinishStarted,
    /// The final block is written and drained.
    FinishDone,
}

/// Caller buffers for one call.
struct Buffers<'a> {
    input: &'a [u8],
    in_pos: usize,
    output: &'a mut [u8],
    out_pos: usize,
}

impl Buffers<'_> {
    fn output_full(&self) -> bool {
        self.out_pos == self.output.len()
    }

    fn remaining_input(&self) -> &[u8] {
        &self.input[self.in_pos..]
    }
}

/// Ordering used to suppress repeated identical flushes. `None` stands for
/// "flush interrupted by a full output buffer" and ranks below everything.
fn flush_rank(flush: Option<FlushMode>) -> i8 {
    match flush {
        None => -1,
        Some(FlushMode::None) => 0,
        Some(FlushMode::Partial) => 1,
        Some(FlushMode::Sync) => 2,
        Some(FlushMode::Full) => 3,
        Some(FlushMode::Finish) => 4,
    }
}

/// Streaming DEFLATE compressor.
#[derive(Debug, Clone)]
pub struct Deflater {
    options: DeflateOptions,
    config: LevelConfig,
    window: MatchWindow,
    blocks: BlockEncoder,
    /// Encoded bytes not yet handed to the caller.
    pending: BitWriter<Vec<u8>>,
    pending_start: usize,
    /// Input staged for the next stored block (level 0).
    stored: Vec<u8>,
    last_flush: Option<FlushMode>,
    started: bool,
    finishing: bool,
    dictionary_id: Option<u32>,
    total_in: u64,
    total_out: u64,
}

impl Deflater {
    /// Create a compressor with default options at the given level (0-9).
    pub fn new(level: u8) -> Self {
        let options = DeflateOptions::new(level);
        Self::build(options)
    }

    /// Create a compressor from validated options.
    pub fn with_options(options: DeflateOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: DeflateOptions) -> Self {
        let config = LEVEL_CONFIG[options.level.level() as usize];
        let window_bits = options.effective_window_bits();
        debug!(
            level = options.level.level(),
            flavor = ?config.flavor,
            strategy = ?options.strategy,
            window_bits,
            "deflate engine initialized"
        );
        Self {
            options,
            config,
            window: MatchWindow::new(window_bits as u32, config),
            blocks: BlockEncoder::new(options.strategy, config.flavor == Flavor::Store),
            pending: BitWriter::new(Vec::new()),
            pending_start: 0,
            stored: Vec::new(),
            last_flush: Some(FlushMode::None),
            started: false,
            finishing: false,
            dictionary_id: None,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Options in effect.
    pub fn options(&self) -> &DeflateOptions {
        &self.options
    }

    /// Total input bytes consumed.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output bytes produced.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Adler-32 of the preset dictionary, if one was set.
    pub fn dictionary_id(&self) -> Option<u32> {
        self.dictionary_id
    }

    /// Prime the window with a preset dictionary.
    ///
    /// Must be called before the first [`deflate`](Self::deflate) call.
    /// Returns the dictionary's Adler-32, which a zlib header carries.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<u32> {
        if self.started {
            return Err(OxiflateError::invalid_state(
                "dictionary must be set before compression starts",
            ));
        }
        let id = Adler32::checksum(dictionary);
        if self.config.flavor != Flavor::Store {
            self.window.load_dictionary(dictionary);
        }
        self.dictionary_id = Some(id);
        debug!(len = dictionary.len(), id, "preset dictionary loaded");
        Ok(id)
    }

    /// Forget all state and start a new stream with the same options.
    pub fn reset(&mut self) {
        self.window.reset();
        self.blocks.reset();
        self.pending = BitWriter::new(Vec::new());
        self.pending_start = 0;
        self.stored.clear();
        self.last_flush = Some(FlushMode::None);
        self.started = false;
        self.finishing = false;
        self.dictionary_id = None;
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Whether the final block has been written and fully drained.
    pub fn is_finished(&self) -> bool {
        self.finishing && !self.has_pending()
    }

    /// Compress from `input` into `output`.
    ///
    /// Returns (bytes consumed, bytes produced, status). Supplying input
    /// after a [`FlushMode::Finish`] call is a state error.
    pub fn deflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        if self.finishing && !input.is_empty() {
            return Err(OxiflateError::invalid_state(
                "input supplied after the stream was finished",
            ));
        }
        self.started = true;

        let mut io = Buffers {
            input,
            in_pos: 0,
            output,
            out_pos: 0,
        };
        let status = self.run(&mut io, flush)?;
        self.total_in += io.in_pos as u64;
        self.total_out += io.out_pos as u64;
        Ok((io.in_pos, io.out_pos, status))
    }

    fn run(&mut self, io: &mut Buffers<'_>, flush: FlushMode) -> Result<CompressStatus> {
        let old_flush = self.last_flush;
        self.last_flush = Some(flush);

        if self.has_pending() {
            self.flush_pending(io)?;
            if self.has_pending() {
                self.last_flush = old_flush;
                return Ok(CompressStatus::NeedsOutput);
            }
        }
        // A flush no stronger than the last one, with no new input, has
        // nothing left to emit once the queued bytes are out.
        if io.input.is_empty()
            && flush_rank(Some(flush)) <= flush_rank(old_flush)
            && flush != FlushMode::Finish
        {
            return Ok(self.status(io));
        }

        let has_work = !io.input.is_empty()
            || self.window.lookahead != 0
            || (flush != FlushMode::None && !self.finishing);

        if has_work {
            let state = match (self.config.flavor, self.options.strategy) {
                (Flavor::Store, _) => self.deflate_stored(io, flush)?,
                (_, Strategy::HuffmanOnly) => self.deflate_huffman(io, flush)?,
                (Flavor::Fast, _) => self.deflate_fast(io, flush)?,
                (Flavor::Slow, _) => self.deflate_slow(io, flush)?,
            };
            trace!(?state, consumed = io.in_pos, produced = io.out_pos, "match loop returned");

            match state {
                BlockState::FinishStarted | BlockState::FinishDone => {
                    self.finishing = true;
                    if state == BlockState::FinishStarted {
                        self.last_flush = None;
                    }
                }
                BlockState::NeedMore => {
                    if io.output_full() {
                        self.last_flush = None;
                    }
                }
                BlockState::BlockDone => {
                    match flush {
                        FlushMode::Partial => write_empty_fixed_block(&mut self.pending)?,
                        FlushMode::Sync | FlushMode::Full => {
                            write_stored_block(&mut self.pending, &[], false)?;
                            if flush == FlushMode::Full {
                                self.window.forget_history();
                            }
                        }
                        FlushMode::None | FlushMode::Finish => {}
                    }
                    debug!(?flush, "flush marker written");
                    self.flush_pending(io)?;
                }
            }
        }

        Ok(self.status(io))
    }

    fn status(&self, io: &Buffers<'_>) -> CompressStatus {
        if self.is_finished() {
            CompressStatus::Done
        } else if self.has_pending() || io.output_full() {
            CompressStatus::NeedsOutput
        } else {
            CompressStatus::NeedsInput
        }
    }

    fn has_pending(&self) -> bool {
        self.pending.get_ref().len() > self.pending_start
    }

    /// Copy as many pending bytes as fit into the output.
    fn flush_pending(&mut self, io: &mut Buffers<'_>) -> Result<()> {
        self.pending.flush_bytes()?;
        let pending = &self.pending.get_ref()[self.pending_start..];
        let n = pending.len().min(io.output.len() - io.out_pos);
        io.output[io.out_pos..io.out_pos + n].copy_from_slice(&pending[..n]);
        io.out_pos += n;
        self.pending_start += n;

        if self.pending_start == self.pending.get_ref().len() {
            self.pending.get_mut().clear();
            self.pending_start = 0;
        }
        Ok(())
    }

    fn fill_window(&mut self, io: &mut Buffers<'_>) {
        let taken = self.window.fill(io.remaining_input());
        io.in_pos += taken;
    }

    /// Close the current block and push it towards the output.
    fn flush_block(&mut self, io: &mut Buffers<'_>, last: bool) -> Result<()> {
        let stored = self.window.block_bytes();
        let kind = self.blocks.flush_block(&mut self.pending, stored, last)?;
        trace!(?kind, last, len = self.window.block_len(), "block emitted");
        self.window.mark_block_start();
        self.flush_pending(io)
    }

    /// Common tail of the window-based loops once input ran out.
    fn finish_loop(&mut self, io: &mut Buffers<'_>, flush: FlushMode) -> Result<BlockState> {
        if flush == FlushMode::Finish {
            self.flush_block(io, true)?;
            return Ok(if io.output_full() && self.has_pending() {
                BlockState::FinishStarted
            } else {
                BlockState::FinishDone
            });
        }
        if !self.blocks.is_empty() {
            self.flush_block(io, false)?;
            if io.output_full() {
                return Ok(BlockState::NeedMore);
            }
        }
        Ok(BlockState::BlockDone)
    }

    /// Level 0: copy input into stored blocks of at most 65535 bytes.
    fn deflate_stored(&mut self, io: &mut Buffers<'_>, flush: FlushMode) -> Result<BlockState> {
        loop {
            let take = (MAX_STORED - self.stored.len()).min(io.remaining_input().len());
            self.stored
                .extend_from_slice(&io.input[io.in_pos..io.in_pos + take]);
            io.in_pos += take;

            if self.stored.len() < MAX_STORED
                || (flush == FlushMode::Finish && io.remaining_input().is_empty())
            {
                break;
            }
            write_stored_block(&mut self.pending, &self.stored, false)?;
            self.stored.clear();
            self.flush_pending(io)?;
            if io.output_full() {
                return Ok(BlockState::NeedMore);
            }
        }

        match flush {
            FlushMode::None => Ok(BlockState::NeedMore),
            FlushMode::Finish => {
                write_stored_block(&mut self.pending, &self.stored, true)?;
                self.stored.clear();
                self.flush_pending(io)?;
                Ok(if self.has_pending() {
                    BlockState::FinishStarted
                } else {
                    BlockState::FinishDone
                })
            }
            FlushMode::Partial | FlushMode::Sync | FlushMode::Full => {
                if !self.stored.is_empty() {
                    write_stored_block(&mut self.pending, &self.stored, false)?;
                    self.stored.clear();
                    self.flush_pending(io)?;
                    if io.output_full() {
                        return Ok(BlockState::NeedMore);
                    }
                }
                Ok(BlockState::BlockDone)
            }
        }
    }

    /// Literals only; no hashing.
    fn deflate_huffman(&mut self, io: &mut Buffers<'_>, flush: FlushMode) -> Result<BlockState> {
        loop {
            if self.window.lookahead == 0 {
                self.fill_window(io);
                if self.window.lookahead == 0 {
                    if flush == FlushMode::None {
                        return Ok(BlockState::NeedMore);
                    }
                    break;
                }
            }

            let w = &mut self.window;
            w.match_length = 0;
            let full = self.blocks.tally_literal(w.byte_at(w.strstart));
            w.lookahead -= 1;
            w.strstart += 1;

            if full {
                self.flush_block(io, false)?;
                if io.output_full() {
                    return Ok(BlockState::NeedMore);
                }
            }
        }
        self.window.insert = 0;
        self.finish_loop(io, flush)
    }

    /// Greedy matching: take the first adequate match.
    fn deflate_fast(&mut self, io: &mut Buffers<'_>, flush: FlushMode) -> Result<BlockState> {
        loop {
            if self.window.lookahead < MIN_LOOKAHEAD {
                self.fill_window(io);
                if self.window.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return Ok(BlockState::NeedMore);
                }
                if self.window.lookahead == 0 {
                    break;
                }
            }

            let w = &mut self.window;
            let mut hash_head = 0;
            if w.lookahead >= MIN_MATCH {
                hash_head = w.insert_string(w.strstart);
            }
            if hash_head != 0 && w.strstart - hash_head <= w.max_dist() {
                w.match_length = w.longest_match(hash_head);
            }

            let full = if w.match_length >= MIN_MATCH {
                let full = self
                    .blocks
                    .tally_match(w.strstart - w.match_start, w.match_length);
                w.lookahead -= w.match_length;

                if w.match_length <= self.config.max_lazy as usize && w.lookahead >= MIN_MATCH {
                    // Hash every position the match covers.
                    w.match_length -= 1;
                    while w.match_length > 0 {
                        w.strstart += 1;
                        w.insert_string(w.strstart);
                        w.match_length -= 1;
                    }
                    w.strstart += 1;
                } else {
                    w.strstart += w.match_length;
                    w.match_length = 0;
                    w.reset_hash_at(w.strstart);
                }
                full
            } else {
                let full = self.blocks.tally_literal(w.byte_at(w.strstart));
                w.lookahead -= 1;
                w.strstart += 1;
                full
            };

            if full {
                self.flush_block(io, false)?;
                if io.output_full() {
                    return Ok(BlockState::NeedMore);
                }
            }
        }
        self.window.insert = self.window.strstart.min(MIN_MATCH - 1);
        self.finish_loop(io, flush)
    }

    /// Lazy matching: hold a match back one position in case the next one
    /// is longer.
    fn deflate_slow(&mut self, io: &mut Buffers<'_>, flush: FlushMode) -> Result<BlockState> {
        let filtered = self.options.strategy == Strategy::Filtered;

        loop {
            if self.window.lookahead < MIN_LOOKAHEAD {
                self.fill_window(io);
                if self.window.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                    return Ok(BlockState::NeedMore);
                }
                if self.window.lookahead == 0 {
                    break;
                }
            }

            let w = &mut self.window;
            let mut hash_head = 0;
            if w.lookahead >= MIN_MATCH {
                hash_head = w.insert_string(w.strstart);
            }

            w.prev_length = w.match_length;
            w.prev_match = w.match_start;
            w.match_length = MIN_MATCH - 1;

            if hash_head != 0
                && w.prev_length < self.config.max_lazy as usize
                && w.strstart - hash_head <= w.max_dist()
            {
                w.match_length = w.longest_match(hash_head);
                if w.match_length <= 5
                    && (filtered
                        || (w.match_length == MIN_MATCH && w.strstart - w.match_start > TOO_FAR))
                {
                    w.match_length = MIN_MATCH - 1;
                }
            }

            if w.prev_length >= MIN_MATCH && w.match_length <= w.prev_length {
                let max_insert = w.strstart + w.lookahead - MIN_MATCH;
                let full = self
                    .blocks
                    .tally_match(w.strstart - 1 - w.prev_match, w.prev_length);

                // The match started one position back; hash the rest of it.
                w.lookahead -= w.prev_length - 1;
                w.prev_length -= 2;
                loop {
                    w.strstart += 1;
                    if w.strstart <= max_insert {
                        w.insert_string(w.strstart);
                    }
                    w.prev_length -= 1;
                    if w.prev_length == 0 {
                        break;
                    }
                }
                w.match_available = false;
                w.match_length = MIN_MATCH - 1;
                w.strstart += 1;

                if full {
                    self.flush_block(io, false)?;
                    if io.output_full() {
                        return Ok(BlockState::NeedMore);
                    }
                }
            } else if w.match_available {
                let full = self.blocks.tally_literal(w.byte_at(w.strstart - 1));
                if full {
                    self.flush_block(io, false)?;
                }
                self.window.strstart += 1;
                self.window.lookahead -= 1;
                if io.output_full() {
                    return Ok(BlockState::NeedMore);
                }
            } else {
                w.match_available = true;
                w.strstart += 1;
                w.lookahead -= 1;
            }
        }

        let w = &mut self.window;
        if w.match_available {
            self.blocks.tally_literal(w.byte_at(w.strstart - 1));
            w.match_available = false;
        }
        w.insert = w.strstart.min(MIN_MATCH - 1);
        self.finish_loop(io, flush)
    }

    /// Compress a whole buffer into a new vector.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() / 2 + 64);
        let mut chunk = vec![0u8; 32 * 1024];
        let mut pos = 0;
        loop {
            let (consumed, produced, status) =
                self.deflate(&data[pos..], &mut chunk, FlushMode::Finish)?;
            pos += consumed;
            output.extend_from_slice(&chunk[..produced]);
            if status == CompressStatus::Done {
                return Ok(output);
            }
        }
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        self.deflate(input, output, flush)
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        Deflater::is_finished(self)
    }
}

/// Compress data into a raw DEFLATE stream.
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    Deflater::new(level).compress_to_vec(data)
}

/// Compress data into a raw DEFLATE stream with explicit options.
pub fn deflate_with_options(data: &[u8], options: DeflateOptions) -> Result<Vec<u8>> {
    Deflater::with_options(options)?.compress_to_vec(data)
}
