//! Parameterized CRC-32.
//!
//! The default instance is the ISO 3309 CRC-32 used by gzip (reflected,
//! polynomial 0xEDB88320). Other polynomials are supported in either bit
//! order:
//!
//! - **reflected** (LSB-first): the polynomial is given in reversed form and
//!   the register shifts right, as in gzip, zip and PNG.
//! - **MSB-first**: the polynomial is given in normal form and the register
//!   shifts left, as in bzip2.
//!
//! Both orders start from `0xFFFFFFFF` and invert the final register.
//!
//! ## Performance
//!
//! The standard polynomial uses slicing-by-8 for inputs of 16 bytes or more;
//! custom polynomials fall back to a single 256-entry table built at
//! construction time.
//!
//! ## Combining
//!
//! [`Crc32::combine`] computes `crc(A ++ B)` from `crc(A)`, `crc(B)` and
//! `len(B)` in `O(log len(B))` by repeatedly squaring the GF(2) operator that
//! feeds one zero bit through the register.

/// Reflected form of the ISO 3309 polynomial.
pub const CRC32_POLY_REFLECTED: u32 = 0xEDB88320;

/// Normal (MSB-first) form of the ISO 3309 polynomial.
pub const CRC32_POLY_NORMAL: u32 = 0x04C11DB7;

const fn reflected_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ poly;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn normal_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-32 lookup table (polynomial 0xEDB88320, reflected).
const CRC32_TABLE: [u32; 256] = reflected_table(CRC32_POLY_REFLECTED);

/// CRC-32 slicing-by-8 lookup tables for the standard polynomial.
const CRC32_TABLE_SLICE: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];
    tables[0] = CRC32_TABLE;

    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
};

#[derive(Debug, Clone)]
enum Table {
    /// ISO 3309, reflected; uses the slicing tables.
    Standard,
    /// Any other polynomial or bit order.
    Custom(Box<[u32; 256]>),
}

/// CRC-32 calculator.
///
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
///
/// # Example
///
/// ```
/// use oxiflate_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ");
/// crc.update(b"World!");
/// assert_eq!(crc.value(), 0xEC4AC3D0);
/// assert_eq!(crc.total_bytes_read(), 13);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    crc: u32,
    poly: u32,
    reflected: bool,
    table: Table,
    total: u64,
}

impl Crc32 {
    /// Create a standard (gzip) CRC-32 calculator.
    pub fn new() -> Self {
        Self {
            crc: 0xFFFFFFFF,
            poly: CRC32_POLY_REFLECTED,
            reflected: true,
            table: Table::Standard,
            total: 0,
        }
    }

    /// Create a calculator for an arbitrary polynomial.
    ///
    /// With `reflected` set the polynomial must be given in reversed bit
    /// order; otherwise in normal order.
    pub fn with_polynomial(poly: u32, reflected: bool) -> Self {
        let table = if reflected && poly == CRC32_POLY_REFLECTED {
            Table::Standard
        } else if reflected {
            Table::Custom(Box::new(reflected_table(poly)))
        } else {
            Table::Custom(Box::new(normal_table(poly)))
        };
        Self {
            crc: 0xFFFFFFFF,
            poly,
            reflected,
            table,
            total: 0,
        }
    }

    /// The bzip2 flavour: polynomial 0x04C11DB7, MSB-first.
    pub fn msb_first() -> Self {
        Self::with_polynomial(CRC32_POLY_NORMAL, false)
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
        self.total = 0;
    }

    /// Polynomial in the form given at construction.
    pub fn polynomial(&self) -> u32 {
        self.poly
    }

    /// Whether the register shifts LSB-first.
    pub fn is_reflected(&self) -> bool {
        self.reflected
    }

    /// Number of bytes fed so far.
    pub fn total_bytes_read(&self) -> u64 {
        self.total
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.total += data.len() as u64;
        match &self.table {
            Table::Standard if data.len() >= 16 => crc32_slice8(&mut self.crc, data),
            Table::Standard => crc32_sw(&mut self.crc, &CRC32_TABLE, data),
            Table::Custom(table) if self.reflected => crc32_sw(&mut self.crc, table, data),
            Table::Custom(table) => {
                let mut c = self.crc;
                for &byte in data {
                    c = (c << 8) ^ table[((c >> 24) ^ byte as u32) as usize & 0xFF];
                }
                self.crc = c;
            }
        }
    }

    /// Feed a single byte.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        self.update(std::slice::from_ref(&byte));
    }

    /// Feed `count` copies of `byte`.
    pub fn update_repeated(&mut self, byte: u8, count: usize) {
        let chunk = [byte; 64];
        let mut left = count;
        while left > 0 {
            let n = left.min(chunk.len());
            self.update(&chunk[..n]);
            left -= n;
        }
    }

    /// Get the current CRC value (without finalizing).
    #[inline(always)]
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Compute the standard CRC-32 of a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }

    /// Combine `crc_a = crc(A)` and `crc_b = crc(B)` into `crc(A ++ B)`.
    ///
    /// Uses this calculator's polynomial and bit order; its running state is
    /// not touched.
    pub fn combine(&self, crc_a: u32, crc_b: u32, len_b: u64) -> u32 {
        if len_b == 0 {
            return crc_a;
        }

        // Operator for one zero bit.
        let mut odd = [0u32; 32];
        if self.reflected {
            odd[0] = self.poly;
            let mut row = 1u32;
            for slot in odd.iter_mut().skip(1) {
                *slot = row;
                row <<= 1;
            }
        } else {
            for (i, slot) in odd.iter_mut().enumerate().take(31) {
                *slot = 1 << (i + 1);
            }
            odd[31] = self.poly;
        }

        let mut even = [0u32; 32];
        gf2_matrix_square(&mut even, &odd); // two zero bits
        gf2_matrix_square(&mut odd, &even); // four zero bits

        // The first squaring inside the loop yields the one-byte operator.
        let mut crc = crc_a;
        let mut len = len_b;
        loop {
            gf2_matrix_square(&mut even, &odd);
            if len & 1 != 0 {
                crc = gf2_matrix_times(&even, crc);
            }
            len >>= 1;
            if len == 0 {
                break;
            }

            gf2_matrix_square(&mut odd, &even);
            if len & 1 != 0 {
                crc = gf2_matrix_times(&odd, crc);
            }
            len >>= 1;
            if len == 0 {
                break;
            }
        }

        crc ^ crc_b
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

fn gf2_matrix_times(mat: &[u32; 32], mut vec: u32) -> u32 {
    let mut sum = 0;
    let mut i = 0;
    while vec != 0 {
        if vec & 1 != 0 {
            sum ^= mat[i];
        }
        vec >>= 1;
        i += 1;
    }
    sum
}

fn gf2_matrix_square(square: &mut [u32; 32], mat: &[u32; 32]) {
    for (n, slot) in square.iter_mut().enumerate() {
        *slot = gf2_matrix_times(mat, mat[n]);
    }
}

/// Single-table reflected update.
#[inline]
fn crc32_sw(crc: &mut u32, table: &[u32; 256], data: &[u8]) {
    let mut c = *crc;
    for &byte in data {
        c = table[((c ^ byte as u32) & 0xFF) as usize] ^ (c >> 8);
    }
    *crc = c;
}

/// Slicing-by-8 over the standard tables.
#[inline]
fn crc32_slice8(crc: &mut u32, data: &[u8]) {
    let mut c = *crc;
    let mut chunks = data.chunks_exact(8);

    for bytes in &mut chunks {
        let crc_xor = c ^ u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        c = CRC32_TABLE_SLICE[7][(crc_xor & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[6][((crc_xor >> 8) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[5][((crc_xor >> 16) & 0xFF) as usize]
            ^ CRC32_TABLE_SLICE[4][(crc_xor >> 24) as usize]
            ^ CRC32_TABLE_SLICE[3][bytes[4] as usize]
            ^ CRC32_TABLE_SLICE[2][bytes[5] as usize]
            ^ CRC32_TABLE_SLICE[1][bytes[6] as usize]
            ^ CRC32_TABLE_SLICE[0][bytes[7] as usize];
    }

    crc32_sw(&mut c, &CRC32_TABLE, chunks.remainder());
    *crc = c;
}
