// src/parser/tables/error.rs
use thiserror::Error;

/// Internal table corruption.
///
/// Every variant means the embedded data and its declared metadata disagree, or a
/// caller stepped outside the table. Regenerating the tables is the only fix, so
/// nothing here is retried.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("{table} chunk {chunk}: payload is not valid base64: {source}")]
    Base64 {
        table: String,
        chunk: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{table} chunk {chunk}: payload is {actual} bytes, declared {declared}")]
    CompressedLength {
        table: String,
        chunk: usize,
        declared: usize,
        actual: usize,
    },

    #[error("{table} chunk {chunk}: inflate failed: {message}")]
    Inflate {
        table: String,
        chunk: usize,
        message: String,
    },

    #[error("{table} chunk {chunk}: inflated to {actual} bytes, declared {declared}")]
    UncompressedLength {
        table: String,
        chunk: usize,
        declared: usize,
        actual: usize,
    },

    #[error("{table}: shape mismatch: {detail}")]
    Shape { table: String, detail: String },

    #[error("row {row} out of range (rows = {rows})")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("column {col} out of range (cols = {cols})")]
    ColumnOutOfRange { col: usize, cols: usize },

    #[error("{table}: value {value} at ({row}, {col}) does not fit in 16 bits")]
    ValueOutOfRange {
        table: String,
        row: usize,
        col: usize,
        value: i64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TableError {
    pub fn shape(table: &str, detail: impl Into<String>) -> Self {
        TableError::Shape {
            table: table.to_string(),
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = TableError> = std::result::Result<T, E>;
