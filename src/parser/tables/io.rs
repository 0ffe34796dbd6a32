// src/parser/tables/io.rs
use std::{
    borrow::Cow,
    fmt::Write as _,
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

use serde::{Deserialize, Serialize};

use super::block::{ChunkDescriptor, Framing};
use super::error::Result;
use super::table::TableKind;

// -------------------- descriptors --------------------

/// Everything the generator emits for one table. `Cow`s let generated Rust code
/// borrow `static` data while JSON loads own theirs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: Cow<'static, str>,
    pub kind: TableKind,
    /// Overrides `kind.default_value()` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<i32>,
    pub n_rows: usize,
    pub n_cols: usize,
    #[serde(default)]
    pub framing: Framing,
    pub rowmap: Cow<'static, [u32]>,
    pub columnmap: Cow<'static, [u32]>,
    pub sigmap: Cow<'static, [ChunkDescriptor]>,
    pub values: Cow<'static, [ChunkDescriptor]>,
}

impl TableDescriptor {
    pub fn default_value(&self) -> i32 {
        self.default.unwrap_or_else(|| self.kind.default_value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSetDescriptor {
    pub action: TableDescriptor,
    pub goto: TableDescriptor,
    pub recovery: TableDescriptor,
}

// -------------------- JSON --------------------

pub fn save_tables_json(path: &Path, t: &TableSetDescriptor) -> Result<()> {
    let instant = Instant::now();
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, t)?;
    w.flush()?;
    log::info!(
        "[tables] saved {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    Ok(())
}

pub fn load_tables_json_bytes(data: &[u8]) -> Result<TableSetDescriptor> {
    Ok(serde_json::from_slice(data)?)
}

pub fn load_tables_json_path(path: &Path) -> Result<TableSetDescriptor> {
    log::debug!("[tables] reading descriptors from {}", path.display());
    let data = std::fs::read(path)?;
    load_tables_json_bytes(&data)
}

// -------------------- Rust source --------------------

/// Render a module of `static` descriptors so payloads compile into the binary.
/// The module exposes `pub static TABLES: TableSetDescriptor`.
pub fn emit_rust_module(t: &TableSetDescriptor) -> String {
    let mut out = String::new();
    out.push_str("// @generated by gen_tables. Do not edit.\n");
    out.push_str("use std::borrow::Cow;\n\n");
    out.push_str(
        "use lalrtab::parser::tables::{ChunkDescriptor, Framing, TableDescriptor, \
         TableKind, TableSetDescriptor};\n\n",
    );

    for d in [&t.action, &t.goto, &t.recovery] {
        emit_table_statics(&mut out, d);
    }

    out.push_str("pub static TABLES: TableSetDescriptor = TableSetDescriptor {\n");
    for (field, d) in [("action", &t.action), ("goto", &t.goto), ("recovery", &t.recovery)] {
        let _ = writeln!(out, "    {field}: {},", table_literal(d));
    }
    out.push_str("};\n");
    out
}

fn ident(d: &TableDescriptor) -> String {
    d.name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn emit_table_statics(out: &mut String, d: &TableDescriptor) {
    let id = ident(d);
    let _ = writeln!(
        out,
        "static {id}_ROWMAP: [u32; {}] = {:?};",
        d.rowmap.len(),
        d.rowmap.as_ref()
    );
    let _ = writeln!(
        out,
        "static {id}_COLUMNMAP: [u32; {}] = {:?};",
        d.columnmap.len(),
        d.columnmap.as_ref()
    );
    for (suffix, chunks) in [("SIGMAP", &d.sigmap), ("VALUES", &d.values)] {
        let _ = writeln!(
            out,
            "static {id}_{suffix}: [ChunkDescriptor; {}] = [",
            chunks.len()
        );
        for c in chunks.iter() {
            let _ = writeln!(
                out,
                "    ChunkDescriptor {{ rows: {}, cols: {}, compressed_bytes: {}, \
                 uncompressed_bytes: {}, payload: Cow::Borrowed({:?}) }},",
                c.rows, c.cols, c.compressed_bytes, c.uncompressed_bytes, c.payload
            );
        }
        out.push_str("];\n");
    }
    out.push('\n');
}

fn table_literal(d: &TableDescriptor) -> String {
    let id = ident(d);
    let kind = match d.kind {
        TableKind::Action => "Action",
        TableKind::Goto => "Goto",
        TableKind::Recovery => "Recovery",
    };
    let framing = match d.framing {
        Framing::Zlib => "Zlib",
        Framing::Raw => "Raw",
    };
    format!(
        "TableDescriptor {{ name: Cow::Borrowed({:?}), kind: TableKind::{kind}, \
         default: {:?}, n_rows: {}, n_cols: {}, framing: Framing::{framing}, \
         rowmap: Cow::Borrowed(&{id}_ROWMAP), columnmap: Cow::Borrowed(&{id}_COLUMNMAP), \
         sigmap: Cow::Borrowed(&{id}_SIGMAP), values: Cow::Borrowed(&{id}_VALUES) }}",
        d.name, d.default, d.n_rows, d.n_cols
    )
}
