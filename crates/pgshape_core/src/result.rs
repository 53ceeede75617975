use indexmap::IndexMap;

use crate::Value;

/// The statement kind a backend reports it executed. `Unknown` absorbs
/// anything the driver doesn't recognize rather than failing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select,
    Insert,
    Update,
    Delete,
    Copy,
    RefreshMaterializedView,
    Unknown,
}

/// One column's name and backend type OID, in declaration order. Order here
/// is load-bearing: the query-method layer's `*First` methods read "the
/// first column" as `fields[0]`, not as an arbitrary map key.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub data_type_id: u32,
}

/// A single decoded row. Backed by an [`IndexMap`] rather than a `HashMap`
/// so iteration order matches declaration order, which is what "first
/// column" means throughout the query-method layer.
pub type Row = IndexMap<String, Value>;

/// The normalized result of a single-shot `query` call. `row_count` is
/// `None` for statements that don't report an affected-row count; `fields`
/// reflects the statement's declared columns even when `rows` is empty.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub command: Command,
    pub fields: Vec<Field>,
    pub row_count: Option<u64>,
    pub rows: Vec<Row>,
}

/// One element of a `stream` call's lazy sequence: the fields known so far
/// (captured from the row-description event once it has fired) paired with
/// one decoded row.
#[derive(Debug, Clone)]
pub struct StreamItem {
    pub fields: Vec<Field>,
    pub row: Row,
}
