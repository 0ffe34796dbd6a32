// src/parser/tables/packed.rs
use super::chunked::ChunkedMatrix;
use super::error::{Result, TableError};

/// Read one 16-bit half of a packed word.
///
/// `raw_col` is the columnmap value: `raw_col / 2` picked the word, its parity picks
/// the half. Even -> bits 31..16, odd -> bits 15..0. No sign extension.
#[inline]
pub fn unpack_half(word: u32, raw_col: u32) -> u16 {
    if raw_col & 1 == 0 {
        (word >> 16) as u16
    } else {
        (word & 0xFFFF) as u16
    }
}

/// Write `value` into the half of `word` selected by `raw_col`, keeping the other half.
#[inline]
pub fn pack_half(word: u32, raw_col: u32, value: u16) -> u32 {
    if raw_col & 1 == 0 {
        (word & 0x0000_FFFF) | ((value as u32) << 16)
    } else {
        (word & 0xFFFF_0000) | value as u32
    }
}

/// Deduplicated value matrix plus the maps from logical to compacted coordinates.
///
/// Neither map is assumed injective or monotonic; both are indexed directly.
#[derive(Debug, Clone)]
pub struct PackedValues {
    rowmap: Vec<u32>,
    columnmap: Vec<u32>,
    words: ChunkedMatrix,
}

impl PackedValues {
    /// Every rowmap/columnmap entry must address a word inside `words`.
    pub fn new(
        table: &str,
        rowmap: Vec<u32>,
        columnmap: Vec<u32>,
        words: ChunkedMatrix,
    ) -> Result<Self> {
        if let Some((r, &m)) = rowmap
            .iter()
            .enumerate()
            .find(|&(_, &m)| m as usize >= words.rows())
        {
            return Err(TableError::shape(
                table,
                format!(
                    "rowmap[{r}] = {m}, value matrix has {} rows",
                    words.rows()
                ),
            ));
        }
        if let Some((c, &m)) = columnmap
            .iter()
            .enumerate()
            .find(|&(_, &m)| (m / 2) as usize >= words.cols())
        {
            return Err(TableError::shape(
                table,
                format!(
                    "columnmap[{c}] = {m}, value matrix has {} word columns",
                    words.cols()
                ),
            ));
        }
        Ok(Self {
            rowmap,
            columnmap,
            words,
        })
    }

    /// Stored value for a logical cell. Only meaningful where the sigmap bit is set.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Result<u16> {
        let mapped_row = *self.rowmap.get(row).ok_or(TableError::RowOutOfRange {
            row,
            rows: self.rowmap.len(),
        })?;
        let raw_col = *self.columnmap.get(col).ok_or(TableError::ColumnOutOfRange {
            col,
            cols: self.columnmap.len(),
        })?;
        let w = self.words.word(mapped_row as usize, (raw_col / 2) as usize)?;
        Ok(unpack_half(w, raw_col))
    }

    pub fn rowmap(&self) -> &[u32] {
        &self.rowmap
    }

    pub fn columnmap(&self) -> &[u32] {
        &self.columnmap
    }

    pub fn matrix(&self) -> &ChunkedMatrix {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tables::block::WordMatrix;

    #[test]
    fn halves_do_not_bleed() {
        let w = pack_half(pack_half(0, 0, 0xABCD), 1, 0x1234);
        assert_eq!(w, 0xABCD_1234);
        assert_eq!(unpack_half(w, 0), 0xABCD);
        assert_eq!(unpack_half(w, 1), 0x1234);
        // same parity on a different word index reads the same half
        assert_eq!(unpack_half(w, 6), 0xABCD);
        assert_eq!(unpack_half(w, 7), 0x1234);
    }

    #[test]
    fn pack_half_keeps_other_half() {
        let w = pack_half(0xFFFF_FFFF, 0, 0);
        assert_eq!(w, 0x0000_FFFF);
        let w = pack_half(0xFFFF_FFFF, 1, 0);
        assert_eq!(w, 0xFFFF_0000);
    }

    #[test]
    fn top_values_are_unsigned() {
        let w = pack_half(0, 0, 0xFFFF);
        assert_eq!(unpack_half(w, 0), 0xFFFF);
        assert_eq!(unpack_half(w, 0) as i32, 65535);
    }

    #[test]
    fn remap_through_shared_rows_and_swapped_columns() {
        let mut m = WordMatrix::zeroed(1, 2);
        m.set(0, 0, 0x0001_0002);
        m.set(0, 1, 0x0003_0004);
        let words = ChunkedMatrix::from_chunks("t", vec![m]).unwrap();
        // columns deliberately out of order
        let p = PackedValues::new("t", vec![0, 0], vec![3, 0, 1, 2], words).unwrap();
        for row in 0..2 {
            assert_eq!(p.value(row, 0).unwrap(), 4);
            assert_eq!(p.value(row, 1).unwrap(), 1);
            assert_eq!(p.value(row, 2).unwrap(), 2);
            assert_eq!(p.value(row, 3).unwrap(), 3);
        }
    }

    #[test]
    fn maps_pointing_outside_are_rejected() {
        let words = ChunkedMatrix::from_chunks("t", vec![WordMatrix::zeroed(1, 1)]).unwrap();
        assert!(matches!(
            PackedValues::new("t", vec![1], vec![0], words.clone()),
            Err(TableError::Shape { .. })
        ));
        assert!(matches!(
            PackedValues::new("t", vec![0], vec![2], words),
            Err(TableError::Shape { .. })
        ));
    }
}
