// src/parser/tables/block.rs
// One compressed chunk <-> one rows x cols matrix of u32 words.
//
// At rest a chunk is base64 text of a deflate stream. Inflated, the bytes are read
// 4 at a time big-endian and laid out row-major. A trailing partial group
// (at most 3 bytes) is padding and ignored.

use std::{borrow::Cow, io::Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};

use super::error::{Result, TableError};

/// Declared metadata plus payload for one chunk, exactly as the generator wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub rows: usize,
    pub cols: usize,
    pub compressed_bytes: usize,
    pub uncompressed_bytes: usize,
    pub payload: Cow<'static, str>,
}

/// Deflate wrapper around the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// RFC 1950 header + adler32 trailer.
    #[default]
    Zlib,
    /// Bare RFC 1951 stream.
    Raw,
}

impl Framing {
    fn zlib_header(self) -> bool {
        matches!(self, Framing::Zlib)
    }
}

/// Dense row-major matrix of 32-bit words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordMatrix {
    pub rows: usize,
    pub cols: usize,
    pub words: Vec<u32>, // rows*cols row-major
}

impl WordMatrix {
    pub fn zeroed(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            words: vec![0; rows * cols],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.words[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, w: u32) {
        self.words[row * self.cols + col] = w;
    }

    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 4);
        for w in &self.words {
            out.extend_from_slice(&w.to_be_bytes());
        }
        out
    }
}

/// Decode one chunk. `table` and `index` only label errors.
pub fn decode_chunk(
    table: &str,
    index: usize,
    desc: &ChunkDescriptor,
    framing: Framing,
) -> Result<WordMatrix> {
    let (cells, need) = desc
        .rows
        .checked_mul(desc.cols)
        .and_then(|cells| Some((cells, cells.checked_mul(4)?)))
        .ok_or_else(|| {
            TableError::shape(
                table,
                format!("chunk {index}: {}x{} words overflow", desc.rows, desc.cols),
            )
        })?;
    if desc.uncompressed_bytes < need || desc.uncompressed_bytes - need >= 4 {
        return Err(TableError::shape(
            table,
            format!(
                "chunk {index}: {}x{} words need {need} bytes, declared {}",
                desc.rows, desc.cols, desc.uncompressed_bytes
            ),
        ));
    }

    let compressed = STANDARD
        .decode(desc.payload.as_bytes())
        .map_err(|source| TableError::Base64 {
            table: table.to_string(),
            chunk: index,
            source,
        })?;
    if compressed.len() != desc.compressed_bytes {
        return Err(TableError::CompressedLength {
            table: table.to_string(),
            chunk: index,
            declared: desc.compressed_bytes,
            actual: compressed.len(),
        });
    }

    let bytes = inflate_exact(table, index, &compressed, desc.uncompressed_bytes, framing)?;

    let mut m = WordMatrix::zeroed(desc.rows, desc.cols);
    for (i, group) in bytes.chunks_exact(4).take(cells).enumerate() {
        m.words[i] = u32::from_be_bytes([group[0], group[1], group[2], group[3]]);
    }

    log::debug!(
        "[tables] {table} chunk {index}: {}x{} words from {} -> {} bytes",
        desc.rows,
        desc.cols,
        desc.compressed_bytes,
        desc.uncompressed_bytes
    );
    Ok(m)
}

/// Inflate `input` into exactly `declared` bytes, consuming all of `input`.
fn inflate_exact(
    table: &str,
    index: usize,
    input: &[u8],
    declared: usize,
    framing: Framing,
) -> Result<Vec<u8>> {
    let inflate_err = |message: String| TableError::Inflate {
        table: table.to_string(),
        chunk: index,
        message,
    };

    let mut d = Decompress::new(framing.zlib_header());
    let mut out = vec![0u8; declared];
    let mut ended = false;
    loop {
        let (read, written) = (d.total_in() as usize, d.total_out() as usize);
        let status = d
            .decompress(&input[read..], &mut out[written..], FlushDecompress::None)
            .map_err(|e| inflate_err(e.to_string()))?;
        if status == Status::StreamEnd {
            ended = true;
            break;
        }
        // A full output buffer still gets another call so the zlib trailer is consumed.
        if d.total_in() as usize == read && d.total_out() as usize == written {
            break;
        }
    }

    let produced = d.total_out() as usize;
    if !ended {
        if produced < declared {
            return Err(inflate_err(format!(
                "stream truncated after {produced} of {declared} bytes"
            )));
        }
        // Output buffer is full but the stream goes on: measure how long it really is.
        let extra = drain_remaining(&mut d, input).map_err(inflate_err)?;
        if extra == 0 {
            return Err(inflate_err(format!(
                "stream not terminated after {produced} bytes"
            )));
        }
        return Err(TableError::UncompressedLength {
            table: table.to_string(),
            chunk: index,
            declared,
            actual: produced + extra,
        });
    }
    if produced != declared {
        return Err(TableError::UncompressedLength {
            table: table.to_string(),
            chunk: index,
            declared,
            actual: produced,
        });
    }
    let consumed = d.total_in() as usize;
    if consumed != input.len() {
        return Err(TableError::CompressedLength {
            table: table.to_string(),
            chunk: index,
            declared: input.len(),
            actual: consumed,
        });
    }
    Ok(out)
}

fn drain_remaining(d: &mut Decompress, input: &[u8]) -> std::result::Result<usize, String> {
    let mut scratch = [0u8; 4096];
    let mut extra = 0usize;
    loop {
        let (read, written) = (d.total_in() as usize, d.total_out());
        let status = d
            .decompress(&input[read..], &mut scratch, FlushDecompress::None)
            .map_err(|e| e.to_string())?;
        extra += (d.total_out() - written) as usize;
        if status == Status::StreamEnd || d.total_out() == written {
            return Ok(extra);
        }
    }
}

/// Compress a matrix into a chunk descriptor. Inverse of [`decode_chunk`].
pub fn encode_chunk(m: &WordMatrix, framing: Framing) -> Result<ChunkDescriptor> {
    let raw = m.to_be_bytes();
    let compressed = match framing {
        Framing::Zlib => {
            let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), Compression::best());
            enc.write_all(&raw)?;
            enc.finish()?
        }
        Framing::Raw => {
            let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), Compression::best());
            enc.write_all(&raw)?;
            enc.finish()?
        }
    };
    Ok(ChunkDescriptor {
        rows: m.rows,
        cols: m.cols,
        compressed_bytes: compressed.len(),
        uncompressed_bytes: raw.len(),
        payload: Cow::Owned(STANDARD.encode(&compressed)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WordMatrix {
        WordMatrix {
            rows: 2,
            cols: 3,
            words: vec![0xDEAD_BEEF, 1, 2, 0x0001_0002, 0, u32::MAX],
        }
    }

    fn zlib(bytes: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    fn desc_for(rows: usize, cols: usize, raw: &[u8], declared: usize) -> ChunkDescriptor {
        let c = zlib(raw);
        ChunkDescriptor {
            rows,
            cols,
            compressed_bytes: c.len(),
            uncompressed_bytes: declared,
            payload: Cow::Owned(STANDARD.encode(&c)),
        }
    }

    #[test]
    fn words_are_big_endian_row_major() {
        let raw = [0x12, 0x34, 0x56, 0x78, 0, 0, 0, 1];
        let d = desc_for(1, 2, &raw, raw.len());
        let m = decode_chunk("t", 0, &d, Framing::Zlib).unwrap();
        assert_eq!(m.words, vec![0x1234_5678, 1]);
    }

    #[test]
    fn both_framings_decode() {
        for framing in [Framing::Zlib, Framing::Raw] {
            let d = encode_chunk(&sample(), framing).unwrap();
            assert_eq!(decode_chunk("t", 0, &d, framing).unwrap(), sample());
        }
    }

    #[test]
    fn trailing_partial_word_is_ignored() {
        let mut raw = sample().to_be_bytes();
        raw.extend_from_slice(&[0xAA, 0xBB]);
        let d = desc_for(2, 3, &raw, raw.len());
        assert_eq!(decode_chunk("t", 0, &d, Framing::Zlib).unwrap(), sample());
    }

    #[test]
    fn declared_size_must_cover_matrix() {
        let raw = sample().to_be_bytes();
        let d = desc_for(2, 3, &raw[..20], 20);
        assert!(matches!(
            decode_chunk("t", 0, &d, Framing::Zlib),
            Err(TableError::Shape { .. })
        ));
    }

    #[test]
    fn huge_declared_shape_is_a_shape_error() {
        for (rows, cols) in [(1usize << 62, 1), (usize::MAX, 2), (1 << 40, 1 << 30)] {
            let d = ChunkDescriptor {
                rows,
                cols,
                compressed_bytes: 0,
                uncompressed_bytes: 0,
                payload: Cow::Borrowed(""),
            };
            assert!(
                matches!(
                    decode_chunk("t", 0, &d, Framing::Zlib),
                    Err(TableError::Shape { .. })
                ),
                "{rows}x{cols}"
            );
        }
    }

    #[test]
    fn longer_stream_than_declared_is_rejected() {
        // 2x3 words declared, but the stream holds 32 bytes
        let mut raw = sample().to_be_bytes();
        raw.extend_from_slice(&[0; 8]);
        let d = desc_for(2, 3, &raw, 24);
        match decode_chunk("t", 0, &d, Framing::Zlib) {
            Err(TableError::UncompressedLength {
                declared, actual, ..
            }) => {
                assert_eq!(declared, 24);
                assert_eq!(actual, 32);
            }
            other => panic!("expected UncompressedLength, got {other:?}"),
        }
    }

    #[test]
    fn wrong_framing_fails_to_inflate() {
        let d = encode_chunk(&sample(), Framing::Zlib).unwrap();
        assert!(decode_chunk("t", 0, &d, Framing::Raw).is_err());
    }

    #[test]
    fn bad_base64_is_reported() {
        let mut d = encode_chunk(&sample(), Framing::Zlib).unwrap();
        d.payload = Cow::Borrowed("not base64!!");
        assert!(matches!(
            decode_chunk("t", 3, &d, Framing::Zlib),
            Err(TableError::Base64 { chunk: 3, .. })
        ));
    }
}
