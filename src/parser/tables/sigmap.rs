// src/parser/tables/sigmap.rs
// Presence bitmap: one bit per logical (row, col), 32 columns per word, MSB first.

use super::chunked::ChunkedMatrix;
use super::error::Result;

pub const BITS_PER_WORD: usize = 32;

#[derive(Debug, Clone)]
pub struct Sigmap {
    bits: ChunkedMatrix,
}

impl Sigmap {
    pub fn new(bits: ChunkedMatrix) -> Self {
        Self { bits }
    }

    #[inline]
    pub fn words_per_row(n_cols: usize) -> usize {
        n_cols.div_ceil(BITS_PER_WORD)
    }

    #[inline]
    pub fn mask(col: usize) -> u32 {
        0x8000_0000u32 >> (col % BITS_PER_WORD)
    }

    /// Does (row, col) hold a real entry?
    #[inline]
    pub fn is_present(&self, row: usize, col: usize) -> Result<bool> {
        let w = self.bits.word(row, col / BITS_PER_WORD)?;
        Ok(w & Self::mask(col) != 0)
    }

    pub fn matrix(&self) -> &ChunkedMatrix {
        &self.bits
    }

    /// Number of present cells among the first `n_cols` columns of every row.
    /// Padding bits past `n_cols`, and any extra words, are not counted.
    pub fn count_present(&self, n_cols: usize) -> usize {
        let width = Self::words_per_row(n_cols).min(self.bits.cols());
        let tail = match n_cols % BITS_PER_WORD {
            0 => u32::MAX,
            used => !0u32 << (BITS_PER_WORD - used),
        };
        let mut n = 0usize;
        for r in 0..self.bits.rows() {
            for c in 0..width {
                let mask = if c + 1 == Self::words_per_row(n_cols) { tail } else { u32::MAX };
                // in range by construction
                n += self.bits.word(r, c).map_or(0, |w| (w & mask).count_ones() as usize);
            }
        }
        n
    }

    /// Encoder side: pack one row of presence flags.
    pub fn pack_row(present: &[bool]) -> Vec<u32> {
        let mut words = vec![0u32; Self::words_per_row(present.len())];
        for (c, &p) in present.iter().enumerate() {
            if p {
                words[c / BITS_PER_WORD] |= Self::mask(c);
            }
        }
        words
    }
}
