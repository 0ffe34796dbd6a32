// src/parser/tables/mod.rs
// Runtime lookup for compressed LALR(1) ACTION / GOTO / RECOVERY tables.
//
//   get(row, col) -> sigmap bit? -> rowmap/columnmap -> packed word -> 16-bit half
//
// Payloads are produced by `encode` (or an external table compiler writing the same
// format) and decoded once into immutable `SparseTable`s.
pub mod block;
pub mod chunked;
pub mod encode;
pub mod error;
pub mod io;
pub mod packed;
pub mod set;
pub mod sigmap;
pub mod table;

pub use block::{ChunkDescriptor, Framing, WordMatrix};
pub use encode::{DenseTable, DenseTableSet, EncodeOptions, encode_table, encode_table_set};
pub use error::TableError;
pub use io::{
    TableDescriptor, TableSetDescriptor, emit_rust_module, load_tables_json_bytes,
    load_tables_json_path, save_tables_json,
};
pub use set::{LazyParseTables, ParseTables};
pub use table::{FnIndex, SparseTable, SymbolIndex, TableKind, TableStats};
