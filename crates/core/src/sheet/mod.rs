//! Remote sheet access helpers and the service port

pub mod ports;
mod row_accessor;

pub use row_accessor::{ColumnMap, RowAccessor, RowDraft};
