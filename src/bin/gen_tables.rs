// src/bin/gen_tables.rs
// Compress dense ACTION / GOTO / RECOVERY tables into chunked descriptors.
// Usage:
//   cargo run --bin gen_tables -- dense.json                 # writes tables/parse_tables.json
//   cargo run --bin gen_tables -- dense.json /path/out.json
//
// Env:
//   GEN_TABLES_MAX_CHUNK   uncompressed byte ceiling per chunk (default 19000)
//   GEN_TABLES_FRAMING     "zlib" (default) or "raw"
//   GEN_TABLES_EXACT=1     only share identical rows/columns
//   GEN_TABLES_RUST=path   also write a Rust module with static descriptors

use std::{env, fs, path::Path};

use anyhow::{Context, Result, bail};
use lalrtab::parser::tables::{
    DenseTableSet, EncodeOptions, Framing, ParseTables, TableSetDescriptor, emit_rust_module,
    encode::DEFAULT_MAX_CHUNK_BYTES, encode_table_set, save_tables_json,
};

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_flag_true(var: &str, default: bool) -> bool {
    env::var(var)
        .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
        .unwrap_or(default)
}

fn options_from_env() -> Result<EncodeOptions> {
    let framing = match env::var("GEN_TABLES_FRAMING")
        .unwrap_or_else(|_| "zlib".into())
        .to_ascii_lowercase()
        .as_str()
    {
        "zlib" => Framing::Zlib,
        "raw" | "deflate" => Framing::Raw,
        other => bail!("GEN_TABLES_FRAMING must be zlib or raw, got {other:?}"),
    };
    Ok(EncodeOptions {
        framing,
        max_chunk_bytes: env_usize("GEN_TABLES_MAX_CHUNK", DEFAULT_MAX_CHUNK_BYTES),
        merge_compatible: !env_flag_true("GEN_TABLES_EXACT", false),
    })
}

fn print_summary(set: &TableSetDescriptor) -> Result<()> {
    // decode what we are about to write so a bad payload never leaves this tool
    let decoded = ParseTables::from_descriptors(set).context("re-decoding encoded tables")?;
    for t in [&decoded.action, &decoded.goto, &decoded.recovery] {
        let s = t.stats();
        println!(
            "[gen_tables] {:<8} {}x{}  present={}  packed={}x{} words  chunks={}+{}  {} -> {} bytes",
            t.name(),
            t.rows(),
            t.cols(),
            s.present_cells,
            s.value_rows,
            s.value_words.checked_div(s.value_rows).unwrap_or(0),
            s.sigmap_chunks,
            s.value_chunks,
            s.uncompressed_bytes,
            s.compressed_bytes
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(input) = args.next() else {
        bail!("usage: gen_tables <dense.json> [out.json]");
    };
    let out = args
        .next()
        .unwrap_or_else(|| "tables/parse_tables.json".to_string());
    let out_path = Path::new(&out);

    let raw = fs::read(&input).with_context(|| format!("reading {input}"))?;
    let dense: DenseTableSet =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {input}"))?;

    let opts = options_from_env()?;
    println!(
        "[gen_tables] encoding with {:?} framing, chunk ceiling {} bytes",
        opts.framing, opts.max_chunk_bytes
    );
    let set = encode_table_set(&dense.action, &dense.goto, &dense.recovery, &opts)
        .context("encoding tables")?;
    print_summary(&set)?;

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    save_tables_json(out_path, &set).with_context(|| format!("writing {}", out_path.display()))?;
    println!("[gen_tables] wrote {}", out_path.display());

    if let Ok(rs) = env::var("GEN_TABLES_RUST") {
        fs::write(&rs, emit_rust_module(&set)).with_context(|| format!("writing {rs}"))?;
        println!("[gen_tables] wrote {rs}");
    }
    Ok(())
}
