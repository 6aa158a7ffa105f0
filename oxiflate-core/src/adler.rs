//! Adler-32 checksum (RFC 1950).
//!
//! Adler-32 is the trailer checksum of zlib streams and the identifier of
//! preset dictionaries. It is two 16-bit running sums modulo 65521.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Number of bytes to process before reducing.
///
/// Largest n such that 255n(n+1)/2 + (n+1)(ADLER_MOD-1) fits in 32 bits.
const NMAX: usize = 5552;

/// Adler-32 checksum calculator.
///
/// # Example
///
/// ```
/// use oxiflate_core::adler::Adler32;
///
/// assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E60398);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Resume from a previously computed checksum.
    pub fn from_checksum(checksum: u32) -> Self {
        Self {
            a: checksum & 0xFFFF,
            b: checksum >> 16,
        }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                a += byte as u32;
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// Current checksum value.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Reset to the initial value.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Compute Adler-32 checksum of data in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.finish()
    }

    /// Combine `adler(A)` and `adler(B)` into `adler(A ++ B)`.
    pub fn combine(adler_a: u32, adler_b: u32, len_b: u64) -> u32 {
        let base = ADLER_MOD as u64;
        let rem = len_b % base;

        let a1 = (adler_a & 0xFFFF) as u64;
        let b1 = (adler_a >> 16) as u64;
        let a2 = (adler_b & 0xFFFF) as u64;
        let b2 = (adler_b >> 16) as u64;

        // a2 and b2 already include the initial 1 of B's sum.
        let a = (a1 + a2 + base - 1) % base;
        let b = (rem * a1 + b1 + b2 + base - rem) % base;

        ((b as u32) << 16) | a as u32
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}
