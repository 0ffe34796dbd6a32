// src/parser/tables/encode.rs
// Dense (state x symbol) matrix -> sigmap + compacted packed values + chunked payloads.
//
// Compaction is first-fit: a line (row, then column) joins an existing compacted line
// when every cell both of them define agrees. Absent cells are don't-cares because the
// sigmap masks them at lookup time.

use std::{borrow::Cow, time::Instant};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::block::{Framing, WordMatrix, encode_chunk};
use super::chunked::split_rows;
use super::error::{Result, TableError};
use super::io::{TableDescriptor, TableSetDescriptor};
use super::packed::pack_half;
use super::sigmap::Sigmap;
use super::table::{SparseTable, TableKind};

/// Uncompressed chunk ceiling used when nothing else is asked for.
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 19_000;

/// Row-major logical table. Cells equal to `default` are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseTable {
    pub rows: Vec<Vec<i32>>,
    pub default: i32,
}

impl DenseTable {
    pub fn new(rows: Vec<Vec<i32>>, default: i32) -> Self {
        Self { rows, default }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

/// Generator input: the three dense tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseTableSet {
    pub action: DenseTable,
    pub goto: DenseTable,
    pub recovery: DenseTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub framing: Framing,
    pub max_chunk_bytes: usize,
    /// Merge compatible lines, not just identical ones.
    pub merge_compatible: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            framing: Framing::Zlib,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            merge_compatible: true,
        }
    }
}

type Line = Vec<Option<u16>>;

#[inline]
fn fits(target: &[Option<u16>], line: &[Option<u16>]) -> bool {
    target.iter().zip(line).all(|pair| match pair {
        (Some(a), Some(b)) => a == b,
        _ => true,
    })
}

/// Returns (map from input line to compacted line, compacted lines).
fn compact_lines(lines: &[Line], merge_compatible: bool) -> (Vec<u32>, Vec<Line>) {
    let mut map = Vec::with_capacity(lines.len());
    let mut merged: Vec<Line> = Vec::new();
    let mut exact: HashMap<&[Option<u16>], u32> = HashMap::new();

    for line in lines {
        if let Some(&id) = exact.get(line.as_slice()) {
            map.push(id);
            continue;
        }
        let slot = if merge_compatible {
            merged.iter().position(|m| fits(m, line))
        } else {
            None
        };
        let idx = match slot {
            Some(i) => {
                for (dst, src) in merged[i].iter_mut().zip(line) {
                    if dst.is_none() {
                        *dst = *src;
                    }
                }
                i
            }
            None => {
                merged.push(line.clone());
                merged.len() - 1
            }
        };
        let id = idx as u32;
        exact.insert(line.as_slice(), id);
        map.push(id);
    }
    (map, merged)
}

fn transpose(lines: &[Line], width: usize) -> Vec<Line> {
    (0..width)
        .map(|c| lines.iter().map(|l| l[c]).collect())
        .collect()
}

pub fn encode_table(
    name: &str,
    kind: TableKind,
    dense: &DenseTable,
    opts: &EncodeOptions,
) -> Result<TableDescriptor> {
    let t0 = Instant::now();
    let n_rows = dense.n_rows();
    let n_cols = dense.n_cols();

    // presence + 16-bit range
    let mut cells: Vec<Line> = Vec::with_capacity(n_rows);
    for (r, row) in dense.rows.iter().enumerate() {
        if row.len() != n_cols {
            return Err(TableError::shape(
                name,
                format!("row {r} has {} cells, row 0 has {n_cols}", row.len()),
            ));
        }
        let mut line = Vec::with_capacity(n_cols);
        for (c, &v) in row.iter().enumerate() {
            if v == dense.default {
                line.push(None);
                continue;
            }
            let v16 = u16::try_from(v).map_err(|_| TableError::ValueOutOfRange {
                table: name.to_string(),
                row: r,
                col: c,
                value: v as i64,
            })?;
            line.push(Some(v16));
        }
        cells.push(line);
    }

    // sigmap
    let width = Sigmap::words_per_row(n_cols);
    let mut bits = WordMatrix::zeroed(n_rows, width);
    for (r, line) in cells.iter().enumerate() {
        let flags: Vec<bool> = line.iter().map(Option::is_some).collect();
        for (w, word) in Sigmap::pack_row(&flags).into_iter().enumerate() {
            bits.set(r, w, word);
        }
    }

    // rows, then columns of the compacted rows
    let (rowmap, crows) = compact_lines(&cells, opts.merge_compatible);
    let (columnmap, ccols) = compact_lines(&transpose(&crows, n_cols), opts.merge_compatible);

    // two compacted columns per word: raw index j -> word j/2, half j%2
    let mut words = WordMatrix::zeroed(crows.len(), ccols.len().div_ceil(2));
    for (j, col) in ccols.iter().enumerate() {
        for (i, v) in col.iter().enumerate() {
            let w = words.get(i, j / 2);
            words.set(i, j / 2, pack_half(w, j as u32, v.unwrap_or(0)));
        }
    }

    let encode_all = |m: &WordMatrix| -> Result<Vec<_>> {
        split_rows(m, opts.max_chunk_bytes)
            .iter()
            .map(|c| encode_chunk(c, opts.framing))
            .collect()
    };
    let sigmap = encode_all(&bits)?;
    let values = encode_all(&words)?;

    log::info!(
        "[tables] encoded {name}: {n_rows}x{n_cols} -> {}x{} compacted, {} + {} chunks in {} ms",
        crows.len(),
        ccols.len(),
        sigmap.len(),
        values.len(),
        t0.elapsed().as_millis()
    );

    Ok(TableDescriptor {
        name: Cow::Owned(name.to_string()),
        kind,
        default: (dense.default != kind.default_value()).then_some(dense.default),
        n_rows,
        n_cols,
        framing: opts.framing,
        rowmap: Cow::Owned(rowmap),
        columnmap: Cow::Owned(columnmap),
        sigmap: Cow::Owned(sigmap),
        values: Cow::Owned(values),
    })
}

pub fn encode_table_set(
    action: &DenseTable,
    goto: &DenseTable,
    recovery: &DenseTable,
    opts: &EncodeOptions,
) -> Result<TableSetDescriptor> {
    Ok(TableSetDescriptor {
        action: encode_table(TableKind::Action.name(), TableKind::Action, action, opts)?,
        goto: encode_table(TableKind::Goto.name(), TableKind::Goto, goto, opts)?,
        recovery: encode_table(TableKind::Recovery.name(), TableKind::Recovery, recovery, opts)?,
    })
}

/// Read every cell back out. Inverse of [`encode_table`] for the logical content.
pub fn expand(t: &SparseTable) -> Result<DenseTable> {
    let rows = (0..t.rows())
        .map(|r| (0..t.cols()).map(|c| t.try_get(r, c)).collect())
        .collect::<Result<Vec<Vec<i32>>>>()?;
    Ok(DenseTable::new(rows, t.default_value()))
}
