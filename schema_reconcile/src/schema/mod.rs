//! Schema model, datatypes, diffing and reconciliation

pub mod datatype;
pub mod diff;
pub mod reconciler;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use datatype::{DatatypeCatalog, LogicalType, SqlDatatype};
pub use reconciler::{Capabilities, Reconciler};
pub use types::{
    ColumnDefinition, ConstraintDefinition, IndexDefinition, SchemaDefinition, TableDefinition,
};
