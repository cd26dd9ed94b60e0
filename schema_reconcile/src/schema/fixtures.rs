//! Builders shared by unit tests

use crate::dialect::Dialect;
use crate::schema::datatype::{DatatypeCatalog, LogicalType, SqlDatatype};
use crate::schema::types::{ColumnDefinition, IndexDefinition, TableDefinition};

pub fn datatype(dialect: Dialect, logical: LogicalType) -> SqlDatatype {
    DatatypeCatalog::builtin()
        .resolve(logical, dialect)
        .expect("builtin catalog is complete")
}

pub fn column(dialect: Dialect, table: &str, name: &str, logical: LogicalType) -> ColumnDefinition {
    ColumnDefinition::new(table, name, datatype(dialect, logical))
}

/// `t (id autoincrement int primary key, name short_text(32) null)`
pub fn simple_table(dialect: Dialect) -> TableDefinition {
    let mut table = TableDefinition::new("t");
    table.add_column(column(dialect, "t", "id", LogicalType::Int).auto_increment(true));
    table.add_column(column(dialect, "t", "name", LogicalType::ShortText(32)).nullable(true));
    table.add_index(
        IndexDefinition::new("t_pk", "t", &["id"])
            .primary()
            .uppercase(dialect.forces_uppercase()),
    );
    table
}
