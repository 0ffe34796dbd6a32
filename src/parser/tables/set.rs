// src/parser/tables/set.rs
use std::sync::OnceLock;

use super::error::{Result, TableError};
use super::io::TableSetDescriptor;
use super::table::{SparseTable, TableKind};

/// ACTION, GOTO and RECOVERY, decoded. Build once and hand `&ParseTables` to the driver.
#[derive(Debug, Clone)]
pub struct ParseTables {
    pub action: SparseTable,
    pub goto: SparseTable,
    pub recovery: SparseTable,
}

impl ParseTables {
    pub fn from_descriptors(set: &TableSetDescriptor) -> Result<Self> {
        let (action, (goto, recovery)) = rayon::join(
            || SparseTable::from_descriptor(&set.action),
            || {
                rayon::join(
                    || SparseTable::from_descriptor(&set.goto),
                    || SparseTable::from_descriptor(&set.recovery),
                )
            },
        );
        Ok(Self {
            action: action?,
            goto: goto?,
            recovery: recovery?,
        })
    }

    pub fn table(&self, kind: TableKind) -> &SparseTable {
        match kind {
            TableKind::Action => &self.action,
            TableKind::Goto => &self.goto,
            TableKind::Recovery => &self.recovery,
        }
    }
}

/// Decode-on-first-use wrapper.
///
/// The first `get` decodes every chunk of all three tables; concurrent first callers
/// block until that finishes and nobody sees a partial table. The outcome, success or
/// failure, is cached for the life of the value.
pub struct LazyParseTables<F = fn() -> Result<TableSetDescriptor>> {
    source: F,
    cell: OnceLock<Result<ParseTables>>,
}

impl<F> LazyParseTables<F>
where
    F: Fn() -> Result<TableSetDescriptor>,
{
    pub const fn new(source: F) -> Self {
        Self {
            source,
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> std::result::Result<&ParseTables, &TableError> {
        self.cell
            .get_or_init(|| (self.source)().and_then(|set| ParseTables::from_descriptors(&set)))
            .as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl LazyParseTables {
    /// Gate over generated `static` descriptors, held in a local or behind a `OnceLock`.
    /// It is not `const`. For a `static` gate, use `new` with a non-capturing closure:
    ///
    /// ```ignore
    /// static PARSE_TABLES: LazyParseTables = LazyParseTables::new(|| Ok(TABLES.clone()));
    /// ```
    pub fn from_static(
        set: &'static TableSetDescriptor,
    ) -> LazyParseTables<impl Fn() -> Result<TableSetDescriptor>> {
        // Cloning only copies the borrowed `Cow`s.
        LazyParseTables::new(move || Ok(set.clone()))
    }
}
