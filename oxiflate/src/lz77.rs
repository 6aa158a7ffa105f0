//! LZ77 match finding for DEFLATE compression.
//!
//! [`MatchWindow`] keeps the sliding window and the hash chains the
//! compressor searches for back-references.
//!
//! # Layout
//!
//! The window buffer is twice the nominal window size. Input is appended at
//! the top of the filled region; once the scan position gets close to the end
//! the upper half is copied down and every chain entry is rebased by one
//! window size. Entries that would fall below zero become 0, the "no entry"
//! sentinel, so position 0 of the buffer is never offered as a match.
//!
//! # Hashing
//!
//! Every position is hashed over its first three bytes with a rolling hash.
//! `head[h]` holds the latest position with hash `h`, and `prev[pos & mask]`
//! links each position to the previous one with the same hash.

use crate::tables::{LevelConfig, MAX_MATCH, MIN_MATCH};

/// Lookahead needed before a search is guaranteed enough bytes.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Matches of length 3 further away than this are not worth their bits.
pub const TOO_FAR: usize = 4096;

/// Hash chain sentinel.
const NIL: u16 = 0;

const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const HASH_MASK: usize = HASH_SIZE - 1;
const HASH_SHIFT: u32 = HASH_BITS.div_ceil(MIN_MATCH as u32);

/// A symbol produced by LZ77 matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

/// Sliding window plus hash chains.
#[derive(Debug, Clone)]
pub struct MatchWindow {
    w_size: usize,
    w_mask: usize,
    window: Vec<u8>,
    head: Vec<u16>,
    prev: Vec<u16>,
    ins_h: usize,

    /// Start of the string being matched.
    pub strstart: usize,
    /// Valid bytes at and after `strstart`.
    pub lookahead: usize,
    /// Window offset where the current block starts; negative once the
    /// block's first bytes have slid out of the window.
    pub block_start: isize,
    /// Trailing bytes not yet inserted into the hash table.
    pub insert: usize,
    /// Start of the last match found by [`longest_match`](Self::longest_match).
    pub match_start: usize,

    /// Length of the current match candidate.
    pub match_length: usize,
    /// Length of the match held back by lazy evaluation.
    pub prev_length: usize,
    /// Start of the match held back by lazy evaluation.
    pub prev_match: usize,
    /// Whether a literal at `strstart - 1` is pending under lazy evaluation.
    pub match_available: bool,

    config: LevelConfig,
}

impl MatchWindow {
    /// Create a window of `1 << window_bits` bytes (9-15).
    pub fn new(window_bits: u32, config: LevelConfig) -> Self {
        let w_size = 1usize << window_bits;
        Self {
            w_size,
            w_mask: w_size - 1,
            window: vec![0; 2 * w_size],
            head: vec![NIL; HASH_SIZE],
            prev: vec![NIL; w_size],
            ins_h: 0,
            strstart: 0,
            lookahead: 0,
            block_start: 0,
            insert: 0,
            match_start: 0,
            match_length: MIN_MATCH - 1,
            prev_length: MIN_MATCH - 1,
            prev_match: 0,
            match_available: false,
            config,
        }
    }

    /// Nominal window size.
    pub fn w_size(&self) -> usize {
        self.w_size
    }

    /// Farthest distance a match may reach.
    #[inline(always)]
    pub fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// Active match policy.
    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// The whole window buffer.
    #[inline(always)]
    pub fn bytes(&self) -> &[u8] {
        &self.window
    }

    /// Byte at a window offset.
    #[inline(always)]
    pub fn byte_at(&self, pos: usize) -> u8 {
        self.window[pos]
    }

    /// Bytes of the current block, if they are all still in the window.
    pub fn block_bytes(&self) -> Option<&[u8]> {
        if self.block_start < 0 {
            return None;
        }
        Some(&self.window[self.block_start as usize..self.strstart])
    }

    /// Length of the current block in bytes.
    pub fn block_len(&self) -> usize {
        (self.strstart as isize - self.block_start) as usize
    }

    /// Start a new block at the current position.
    pub fn mark_block_start(&mut self) {
        self.block_start = self.strstart as isize;
    }

    /// Forget all hash chains.
    pub fn clear_hash(&mut self) {
        self.head.fill(NIL);
    }

    /// Forget match history after a full flush. Positions restart at zero
    /// when nothing is waiting in the lookahead.
    pub fn forget_history(&mut self) {
        self.clear_hash();
        if self.lookahead == 0 {
            self.strstart = 0;
            self.block_start = 0;
            self.insert = 0;
        }
    }

    /// Forget everything and start over.
    pub fn reset(&mut self) {
        self.clear_hash();
        self.prev.fill(NIL);
        self.ins_h = 0;
        self.strstart = 0;
        self.lookahead = 0;
        self.block_start = 0;
        self.insert = 0;
        self.match_start = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.prev_match = 0;
        self.match_available = false;
    }

    #[inline(always)]
    fn update_hash(h: usize, byte: u8) -> usize {
        ((h << HASH_SHIFT) ^ byte as usize) & HASH_MASK
    }

    /// Insert the string at `pos` and return the previous head of its chain.
    #[inline(always)]
    pub fn insert_string(&mut self, pos: usize) -> usize {
        self.ins_h = Self::update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
        let head = self.head[self.ins_h];
        self.prev[pos & self.w_mask] = head;
        self.head[self.ins_h] = pos as u16;
        head as usize
    }

    /// Prime the rolling hash with the first two bytes at `pos`.
    #[inline]
    pub fn reset_hash_at(&mut self, pos: usize) {
        self.ins_h = self.window[pos] as usize;
        self.ins_h = Self::update_hash(self.ins_h, self.window[pos + 1]);
    }

    /// Shift the upper half down and rebase every chain entry.
    fn slide(&mut self) {
        let w_size = self.w_size;
        self.window.copy_within(w_size..2 * w_size, 0);
        self.match_start = self.match_start.saturating_sub(w_size);
        self.strstart -= w_size;
        self.block_start -= w_size as isize;
        if self.insert > self.strstart {
            self.insert = self.strstart;
        }

        let rebase = |entry: &mut u16| {
            let m = *entry as usize;
            *entry = if m >= w_size { (m - w_size) as u16 } else { NIL };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Pull input into the window until the lookahead is large enough or
    /// the input runs out. Returns the number of input bytes taken.
    pub fn fill(&mut self, input: &[u8]) -> usize {
        let mut taken = 0;
        loop {
            let mut more = self.window.len() - self.lookahead - self.strstart;

            if self.strstart >= self.w_size + self.max_dist() {
                self.slide();
                more += self.w_size;
            }
            if taken == input.len() {
                break;
            }

            let n = more.min(input.len() - taken);
            let at = self.strstart + self.lookahead;
            self.window[at..at + n].copy_from_slice(&input[taken..taken + n]);
            taken += n;
            self.lookahead += n;

            if self.lookahead + self.insert >= MIN_MATCH {
                let mut pos = self.strstart - self.insert;
                self.reset_hash_at(pos);
                while self.insert > 0 {
                    self.insert_string(pos);
                    pos += 1;
                    self.insert -= 1;
                    if self.lookahead + self.insert < MIN_MATCH {
                        break;
                    }
                }
            }

            if self.lookahead >= MIN_LOOKAHEAD || taken == input.len() {
                break;
            }
        }
        taken
    }

    /// Load a preset dictionary: its bytes become history and are hashed,
    /// but are never emitted.
    pub fn load_dictionary(&mut self, dictionary: &[u8]) {
        let dictionary = &dictionary[dictionary.len().saturating_sub(self.w_size)..];
        let mut rest = dictionary;
        loop {
            let taken = self.fill(rest);
            rest = &rest[taken..];
            if self.lookahead < MIN_MATCH {
                break;
            }
            let mut pos = self.strstart;
            for _ in 0..self.lookahead - (MIN_MATCH - 1) {
                self.insert_string(pos);
                pos += 1;
            }
            self.strstart = pos;
            self.lookahead = MIN_MATCH - 1;
            if rest.is_empty() {
                break;
            }
        }
        self.strstart += self.lookahead;
        self.block_start = self.strstart as isize;
        self.insert = self.lookahead;
        self.lookahead = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
    }

    /// Follow the chain from `cur_match` and return the best match length.
    ///
    /// The match position is left in `match_start`. Only matches longer than
    /// `prev_length` count, and the result never exceeds the lookahead.
    pub fn longest_match(&mut self, mut cur_match: usize) -> usize {
        let mut chain_length = self.config.max_chain as usize;
        let scan = self.strstart;
        let mut best_len = self.prev_length;
        let mut nice_match = self.config.nice_length as usize;
        let limit = self.strstart.saturating_sub(self.max_dist());
        let window = &self.window;

        if self.prev_length >= self.config.good_length as usize {
            chain_length >>= 2;
        }
        if nice_match > self.lookahead {
            nice_match = self.lookahead;
        }
        chain_length = chain_length.max(1);

        loop {
            let candidate = cur_match;
            if window[candidate + best_len] == window[scan + best_len]
                && window[candidate + best_len - 1] == window[scan + best_len - 1]
                && window[candidate] == window[scan]
                && window[candidate + 1] == window[scan + 1]
            {
                let len = window[scan..scan + MAX_MATCH]
                    .iter()
                    .zip(&window[candidate..candidate + MAX_MATCH])
                    .take_while(|(a, b)| a == b)
                    .count();

                if len > best_len {
                    self.match_start = candidate;
                    best_len = len;
                    if len >= nice_match {
                        break;
                    }
                }
            }

            cur_match = self.prev[candidate & self.w_mask] as usize;
            chain_length -= 1;
            if cur_match <= limit || chain_length == 0 {
                break;
            }
        }

        best_len.min(self.lookahead)
    }
}
