// src/parser/tables/table.rs
use std::{hash::BuildHasher, hash::Hash, time::Instant};

use serde::{Deserialize, Serialize};

use super::chunked::ChunkedMatrix;
use super::error::{Result, TableError};
use super::io::TableDescriptor;
use super::packed::PackedValues;
use super::sigmap::Sigmap;

/// Which of the parser's three tables this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Action,
    Goto,
    Recovery,
}

impl TableKind {
    /// Conventional "nothing here" value. GOTO uses -1 since 0 is a real state.
    pub fn default_value(self) -> i32 {
        match self {
            TableKind::Action | TableKind::Recovery => 0,
            TableKind::Goto => -1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TableKind::Action => "action",
            TableKind::Goto => "goto",
            TableKind::Recovery => "recovery",
        }
    }
}

/// Maps a grammar symbol to its column in one table.
pub trait SymbolIndex<S: ?Sized> {
    fn column_of(&self, sym: &S) -> Option<usize>;
}

impl<S: Hash + Eq, B: BuildHasher> SymbolIndex<S> for hashbrown::HashMap<S, usize, B> {
    fn column_of(&self, sym: &S) -> Option<usize> {
        self.get(sym).copied()
    }
}

/// Adapter for an accessor function (e.g. a nonterminal-index lookup on the driver).
pub struct FnIndex<F>(pub F);

impl<S: ?Sized, F: Fn(&S) -> Option<usize>> SymbolIndex<S> for FnIndex<F> {
    fn column_of(&self, sym: &S) -> Option<usize> {
        (self.0)(sym)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableStats {
    pub logical_cells: usize,
    pub present_cells: usize,
    pub value_rows: usize,
    pub value_words: usize,
    pub sigmap_chunks: usize,
    pub value_chunks: usize,
    pub compressed_bytes: usize,
    pub uncompressed_bytes: usize,
}

/// One decoded sparse table. Immutable; share it by reference.
#[derive(Debug, Clone)]
pub struct SparseTable {
    name: String,
    kind: TableKind,
    default: i32,
    n_rows: usize,
    n_cols: usize,
    sigmap: Sigmap,
    values: PackedValues,
    stats: TableStats,
}

impl SparseTable {
    /// Assemble a table from already-decoded parts and check that they fit together.
    pub fn from_parts(
        name: &str,
        kind: TableKind,
        default: i32,
        n_cols: usize,
        sigmap: Sigmap,
        values: PackedValues,
    ) -> Result<Self> {
        let n_rows = values.rowmap().len();
        if values.columnmap().len() != n_cols {
            return Err(TableError::shape(
                name,
                format!(
                    "columnmap has {} entries, table has {n_cols} columns",
                    values.columnmap().len()
                ),
            ));
        }
        let bits = sigmap.matrix();
        if bits.rows() != n_rows || bits.cols() < Sigmap::words_per_row(n_cols) {
            return Err(TableError::shape(
                name,
                format!(
                    "sigmap is {}x{} words, {n_rows}x{n_cols} cells need {n_rows}x{}",
                    bits.rows(),
                    bits.cols(),
                    Sigmap::words_per_row(n_cols)
                ),
            ));
        }

        let stats = TableStats {
            logical_cells: n_rows * n_cols,
            present_cells: sigmap.count_present(n_cols),
            value_rows: values.matrix().rows(),
            value_words: values.matrix().rows() * values.matrix().cols(),
            sigmap_chunks: bits.chunk_count(),
            value_chunks: values.matrix().chunk_count(),
            compressed_bytes: 0,
            uncompressed_bytes: 0,
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            default,
            n_rows,
            n_cols,
            sigmap,
            values,
            stats,
        })
    }

    pub fn from_descriptor(desc: &TableDescriptor) -> Result<Self> {
        let t0 = Instant::now();
        let name = desc.name.as_ref();
        if desc.rowmap.len() != desc.n_rows {
            return Err(TableError::shape(
                name,
                format!(
                    "rowmap has {} entries, table has {} rows",
                    desc.rowmap.len(),
                    desc.n_rows
                ),
            ));
        }

        let (bits, words) = rayon::join(
            || ChunkedMatrix::decode(&format!("{name}.sigmap"), &desc.sigmap, desc.framing),
            || ChunkedMatrix::decode(&format!("{name}.values"), &desc.values, desc.framing),
        );
        let values = PackedValues::new(
            name,
            desc.rowmap.to_vec(),
            desc.columnmap.to_vec(),
            words?,
        )?;
        let mut t = Self::from_parts(
            name,
            desc.kind,
            desc.default_value(),
            desc.n_cols,
            Sigmap::new(bits?),
            values,
        )?;

        let chunks = desc.sigmap.iter().chain(desc.values.iter());
        (t.stats.compressed_bytes, t.stats.uncompressed_bytes) = chunks.fold((0, 0), |acc, c| {
            (acc.0 + c.compressed_bytes, acc.1 + c.uncompressed_bytes)
        });

        log::info!(
            "[tables] {name}: {}x{} cells, {} present, {} chunks decoded in {:.3} ms",
            t.n_rows,
            t.n_cols,
            t.stats.present_cells,
            t.stats.sigmap_chunks + t.stats.value_chunks,
            t0.elapsed().as_nanos() as f64 / 1.0e6
        );
        Ok(t)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn default_value(&self) -> i32 {
        self.default
    }

    pub fn rows(&self) -> usize {
        self.n_rows
    }

    pub fn cols(&self) -> usize {
        self.n_cols
    }

    pub fn stats(&self) -> TableStats {
        self.stats
    }

    /// True when (row, col) has no entry.
    #[inline]
    pub fn is_error_entry(&self, row: usize, col: usize) -> Result<bool> {
        self.check(row, col)?;
        Ok(!self.sigmap.is_present(row, col)?)
    }

    #[inline]
    fn check(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.n_rows {
            return Err(TableError::RowOutOfRange {
                row,
                rows: self.n_rows,
            });
        }
        if col >= self.n_cols {
            return Err(TableError::ColumnOutOfRange {
                col,
                cols: self.n_cols,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn try_get(&self, row: usize, col: usize) -> Result<i32> {
        if self.is_error_entry(row, col)? {
            return Ok(self.default);
        }
        Ok(self.values.value(row, col)? as i32)
    }

    /// Entry at (row, col), or the table default when absent.
    ///
    /// # Panics
    /// If `row` or `col` is outside the table, like slice indexing.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i32 {
        match self.try_get(row, col) {
            Ok(v) => v,
            Err(e) => panic!("{}: {e}", self.name),
        }
    }

    /// Lookup by symbol. A symbol the index doesn't know reads as the default.
    #[inline]
    pub fn get_symbol<S: ?Sized>(&self, row: usize, sym: &S, index: &impl SymbolIndex<S>) -> i32 {
        match index.column_of(sym) {
            Some(col) => self.get(row, col),
            None => self.default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tables::block::WordMatrix;

    fn matrix(rows: usize, cols: usize, words: Vec<u32>) -> ChunkedMatrix {
        ChunkedMatrix::from_chunks("t", vec![WordMatrix { rows, cols, words }]).unwrap()
    }

    /// Rows [0,5,0,9] and [5,0,9,0] sharing one compacted row.
    fn shared_row_table(kind: TableKind) -> SparseTable {
        let sigmap = Sigmap::new(matrix(2, 1, vec![0x5000_0000, 0xA000_0000]));
        let values = PackedValues::new(
            "t",
            vec![0, 0],
            vec![0, 1, 2, 3],
            matrix(1, 2, vec![(5 << 16) | 5, (9 << 16) | 9]),
        )
        .unwrap();
        SparseTable::from_parts("t", kind, kind.default_value(), 4, sigmap, values).unwrap()
    }

    #[test]
    fn shared_row_lookups() {
        let t = shared_row_table(TableKind::Action);
        let got: Vec<Vec<i32>> = (0..2)
            .map(|r| (0..4).map(|c| t.get(r, c)).collect())
            .collect();
        assert_eq!(got, vec![vec![0, 5, 0, 9], vec![5, 0, 9, 0]]);
        assert_eq!(t.stats().present_cells, 4);
        assert_eq!(t.stats().value_words, 2);
    }

    #[test]
    fn goto_default_is_minus_one() {
        let t = shared_row_table(TableKind::Goto);
        assert_eq!(t.get(0, 0), -1);
        assert_eq!(t.get(0, 1), 5);
    }

    #[test]
    fn unknown_symbol_reads_as_default() {
        let t = shared_row_table(TableKind::Goto);
        let mut index = hashbrown::HashMap::new();
        index.insert("expr", 1usize);
        assert_eq!(t.get_symbol(0, &"expr", &index), 5);
        assert_eq!(t.get_symbol(0, &"unseen", &index), -1);

        let by_fn = FnIndex(|s: &str| s.strip_prefix('c').and_then(|n| n.parse::<usize>().ok()));
        assert_eq!(t.get_symbol(1, "c2", &by_fn), 9);
        assert_eq!(t.get_symbol(1, "x", &by_fn), -1);
    }

    #[test]
    fn out_of_range_is_an_error_not_a_default() {
        let t = shared_row_table(TableKind::Action);
        assert!(matches!(
            t.try_get(2, 0),
            Err(TableError::RowOutOfRange { row: 2, rows: 2 })
        ));
        // col 4 is still inside the sigmap word, but not inside the table
        assert!(matches!(
            t.try_get(0, 4),
            Err(TableError::ColumnOutOfRange { col: 4, cols: 4 })
        ));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_panics_outside_the_table() {
        shared_row_table(TableKind::Action).get(0, 9);
    }

    #[test]
    fn present_cells_never_exceed_logical_cells() {
        // every bit set, but only the top two belong to columns
        let sigmap = Sigmap::new(matrix(1, 1, vec![u32::MAX]));
        let values =
            PackedValues::new("t", vec![0], vec![0, 1], matrix(1, 1, vec![(3 << 16) | 4])).unwrap();
        let t = SparseTable::from_parts("t", TableKind::Action, 0, 2, sigmap, values).unwrap();
        assert_eq!(t.stats().logical_cells, 2);
        assert_eq!(t.stats().present_cells, 2);
        assert_eq!((t.get(0, 0), t.get(0, 1)), (3, 4));
    }

    #[test]
    fn short_sigmap_is_rejected() {
        let sigmap = Sigmap::new(matrix(1, 1, vec![0]));
        let values =
            PackedValues::new("t", vec![0, 0], vec![0], matrix(1, 1, vec![0])).unwrap();
        assert!(matches!(
            SparseTable::from_parts("t", TableKind::Action, 0, 1, sigmap, values),
            Err(TableError::Shape { .. })
        ));
    }
}
