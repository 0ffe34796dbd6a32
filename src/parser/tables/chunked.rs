// src/parser/tables/chunked.rs
use rayon::prelude::*;

use super::block::{ChunkDescriptor, Framing, WordMatrix, decode_chunk};
use super::error::{Result, TableError};

/// Several row-stacked chunks addressed as one matrix.
///
/// Chunks must agree on `cols`; heights may differ (the last chunk is usually short).
/// `starts[i]` is the first logical row of chunk `i`, so row dispatch is a binary
/// search over `starts`.
#[derive(Debug, Clone)]
pub struct ChunkedMatrix {
    chunks: Vec<WordMatrix>,
    starts: Vec<usize>,
    rows: usize,
    cols: usize,
}

impl ChunkedMatrix {
    pub fn from_chunks(table: &str, chunks: Vec<WordMatrix>) -> Result<Self> {
        let cols = chunks.first().map_or(0, |c| c.cols);
        let mut starts = Vec::with_capacity(chunks.len());
        let mut rows = 0usize;
        for (i, c) in chunks.iter().enumerate() {
            if c.cols != cols {
                return Err(TableError::shape(
                    table,
                    format!("chunk {i} has {} cols, chunk 0 has {cols}", c.cols),
                ));
            }
            starts.push(rows);
            rows += c.rows;
        }
        Ok(Self {
            chunks,
            starts,
            rows,
            cols,
        })
    }

    /// Decode every chunk (in parallel) and stack them. Nothing is returned unless
    /// all chunks decoded.
    pub fn decode(table: &str, descs: &[ChunkDescriptor], framing: Framing) -> Result<Self> {
        let chunks = descs
            .par_iter()
            .enumerate()
            .map(|(i, d)| decode_chunk(table, i, d, framing))
            .collect::<Result<Vec<_>>>()?;
        Self::from_chunks(table, chunks)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Which chunk holds `row`, and the row inside it.
    #[inline]
    fn locate(&self, row: usize) -> Result<(usize, usize)> {
        if row >= self.rows {
            return Err(TableError::RowOutOfRange {
                row,
                rows: self.rows,
            });
        }
        // Number of chunks starting at or before `row`, minus one. Empty chunks share a
        // start with their successor and are skipped by taking the last match.
        let idx = self.starts.partition_point(|&s| s <= row) - 1;
        Ok((idx, row - self.starts[idx]))
    }

    #[inline]
    pub fn word(&self, row: usize, col: usize) -> Result<u32> {
        if col >= self.cols {
            return Err(TableError::ColumnOutOfRange {
                col,
                cols: self.cols,
            });
        }
        let (chunk, local) = self.locate(row)?;
        Ok(self.chunks[chunk].get(local, col))
    }
}

/// Slice a full matrix into row bands of at most `max_chunk_bytes` each (at least one
/// row per band).
pub fn split_rows(m: &WordMatrix, max_chunk_bytes: usize) -> Vec<WordMatrix> {
    let row_bytes = (m.cols * 4).max(1);
    let band = (max_chunk_bytes / row_bytes).max(1);
    if m.rows == 0 {
        return vec![WordMatrix::zeroed(0, m.cols)];
    }
    (0..m.rows)
        .step_by(band)
        .map(|start| {
            let end = (start + band).min(m.rows);
            WordMatrix {
                rows: end - start,
                cols: m.cols,
                words: m.words[start * m.cols..end * m.cols].to_vec(),
            }
        })
        .collect()
}
