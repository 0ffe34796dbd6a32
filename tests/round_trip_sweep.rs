//! Randomized encode -> decode sweeps:
//!  - a handful of small/medium shapes, several densities (run by default)
//!  - parser-sized tables split over many chunks (ignored by default)
//!
//! Seed with ROUND_TRIP_SEED to replay a failure.

use lalrtab::parser::tables::{
    DenseTable, EncodeOptions, Framing, SparseTable, TableKind, encode::expand, encode_table,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

/// Sparse random table. Some rows are copies or near-copies of earlier rows so that
/// compaction has something to share.
fn random_table<R: Rng>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    density: f64,
    default: i32,
) -> DenseTable {
    let mut out: Vec<Vec<i32>> = Vec::with_capacity(rows);
    for r in 0..rows {
        if r > 0 && rng.random_bool(0.25) {
            let src = out[rng.random_range(0..r)].clone();
            let row = src
                .into_iter()
                .map(|v| if rng.random_bool(0.2) { default } else { v })
                .collect();
            out.push(row);
            continue;
        }
        let row = (0..cols)
            .map(|_| {
                if rng.random_bool(density) {
                    // never the default itself, or the cell would read back as absent
                    rng.random_range((default + 1).max(0)..=u16::MAX as i32)
                } else {
                    default
                }
            })
            .collect();
        out.push(row);
    }
    DenseTable::new(out, default)
}

fn first_divergence(a: &DenseTable, b: &DenseTable) -> Option<(usize, usize, i32, i32)> {
    for (r, (ra, rb)) in a.rows.iter().zip(&b.rows).enumerate() {
        for (c, (&va, &vb)) in ra.iter().zip(rb).enumerate() {
            if va != vb {
                return Some((r, c, va, vb));
            }
        }
    }
    None
}

fn run_one(kind: TableKind, rows: usize, cols: usize, density: f64, opts: &EncodeOptions, seed: u64) {
    let mut rng = StdRng::seed_from_u64(
        seed ^ ((rows * 1_000 + cols) as u64).wrapping_mul(0x9E3779B97F4A7C15),
    );
    let dense = random_table(&mut rng, rows, cols, density, kind.default_value());

    let d = encode_table(kind.name(), kind, &dense, opts).unwrap();
    let t = SparseTable::from_descriptor(&d).unwrap();
    let back = expand(&t).unwrap();
    if let Some((r, c, want, got)) = first_divergence(&dense, &back) {
        panic!(
            "[round_trip] {kind:?} {rows}x{cols} density={density} seed={seed}: \
             ({r}, {c}) want {want} got {got}"
        );
    }

    let present = dense
        .rows
        .iter()
        .flatten()
        .filter(|&&v| v != dense.default)
        .count();
    assert_eq!(t.stats().present_cells, present);
    assert!(t.stats().value_rows <= rows.max(1));
}

#[test]
fn round_trip_small_shapes() {
    let seed = env_u64("ROUND_TRIP_SEED", 42);
    let opts = EncodeOptions {
        max_chunk_bytes: 256,
        ..EncodeOptions::default()
    };
    for kind in [TableKind::Action, TableKind::Goto, TableKind::Recovery] {
        for (rows, cols) in [(1, 1), (1, 33), (7, 31), (20, 32), (35, 65), (64, 100)] {
            for density in [0.0, 0.05, 0.3, 1.0] {
                run_one(kind, rows, cols, density, &opts, seed);
            }
        }
    }
}

#[test]
fn round_trip_exact_sharing_only() {
    let seed = env_u64("ROUND_TRIP_SEED", 7);
    let opts = EncodeOptions {
        max_chunk_bytes: 100,
        merge_compatible: false,
        framing: Framing::Raw,
    };
    run_one(TableKind::Action, 50, 40, 0.1, &opts, seed);
    run_one(TableKind::Goto, 50, 40, 0.1, &opts, seed);
}

/// Parser-sized tables (a few thousand states) at the default chunk ceiling.
#[test]
#[ignore]
fn round_trip_parser_sized() {
    let seed = env_u64("ROUND_TRIP_SEED", 42);
    let opts = EncodeOptions::default();
    run_one(TableKind::Action, 3_000, 300, 0.02, &opts, seed);
    run_one(TableKind::Goto, 3_000, 200, 0.01, &opts, seed);
    run_one(TableKind::Recovery, 3_000, 300, 0.005, &opts, seed);
    eprintln!("[round_trip] ok: parser-sized tables");
}
