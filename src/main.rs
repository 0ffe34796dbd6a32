// src/main.rs
// Load compressed parse tables and inspect them.
// Usage:
//   lalrtab [tables.json]                               # per-table stats
//   lalrtab [tables.json] <action|goto|recovery> <state> <col>
// The table path falls back to $LALRTAB_TABLES, then tables/parse_tables.json.

use std::{env, path::PathBuf, time::Instant};

use anyhow::{Context, Result, anyhow, bail};
use lalrtab::parser::tables::{ParseTables, TableKind, load_tables_json_path};

fn table_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| env::var("LALRTAB_TABLES").ok())
        .unwrap_or_else(|| "tables/parse_tables.json".to_string())
        .into()
}

fn parse_kind(s: &str) -> Result<TableKind> {
    match s.to_ascii_lowercase().as_str() {
        "action" => Ok(TableKind::Action),
        "goto" => Ok(TableKind::Goto),
        "recovery" => Ok(TableKind::Recovery),
        other => Err(anyhow!("unknown table {other:?} (action, goto, recovery)")),
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    // a lone query (3 args) means the path comes from the environment
    let (path_arg, query) = match args.len() {
        0 => (None, &args[..]),
        1 | 4 => (Some(args[0].clone()), &args[1..]),
        3 => (None, &args[..]),
        _ => bail!("usage: lalrtab [tables.json] [<action|goto|recovery> <state> <col>]"),
    };
    let path = table_path(path_arg);

    let t0 = Instant::now();
    let set = load_tables_json_path(&path).with_context(|| format!("loading {}", path.display()))?;
    let tables = ParseTables::from_descriptors(&set).context("decoding tables")?;
    println!(
        "[lalrtab] decoded {} in {:.3} ms",
        path.display(),
        t0.elapsed().as_nanos() as f64 / 1.0e6
    );

    if let [kind, state, col] = query {
        let t = tables.table(parse_kind(kind)?);
        let state: usize = state.parse().context("state must be a number")?;
        let col: usize = col.parse().context("col must be a number")?;
        let v = t.try_get(state, col)?;
        let note = if v == t.default_value() { " (default)" } else { "" };
        println!("{}[{state}][{col}] = {v}{note}", t.name());
        return Ok(());
    }

    for t in [&tables.action, &tables.goto, &tables.recovery] {
        let s = t.stats();
        let density = if s.logical_cells == 0 {
            0.0
        } else {
            100.0 * s.present_cells as f64 / s.logical_cells as f64
        };
        println!(
            "{:<8} {:>5}x{:<5} default={:>2}  present={} ({density:.2}%)  packed rows={}  chunks={}+{}  {:.1} KiB compressed",
            t.name(),
            t.rows(),
            t.cols(),
            t.default_value(),
            s.present_cells,
            s.value_rows,
            s.sigmap_chunks,
            s.value_chunks,
            s.compressed_bytes as f64 / 1024.0
        );
    }
    Ok(())
}
