//! Dialect renderers
//!
//! One renderer per database family turns definitions and diffs into literal
//! DDL. Every renderer is a pure function set: statements come back as an
//! ordered list, one executable unit per entry, because some databases cannot
//! mix DDL kinds in a single statement.

pub mod common;
pub mod hsql;
pub mod mssql;
pub mod mysql;
pub mod oracle;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::types::{
    ColumnDefinition, ConstraintDefinition, IndexDefinition, TableDefinition,
};

pub use hsql::HsqlRenderer;
pub use mssql::MsSqlRenderer;
pub use mysql::MySqlRenderer;
pub use oracle::OracleRenderer;

/// Supported database families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    MsSql,
    Oracle,
    Hsql,
}

static MYSQL: MySqlRenderer = MySqlRenderer;
static MSSQL: MsSqlRenderer = MsSqlRenderer;
static ORACLE: OracleRenderer = OracleRenderer;
static HSQL: HsqlRenderer = HsqlRenderer;

impl Dialect {
    pub fn all() -> [Dialect; 4] {
        [Dialect::MySql, Dialect::MsSql, Dialect::Oracle, Dialect::Hsql]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::MsSql => "mssql",
            Dialect::Oracle => "oracle",
            Dialect::Hsql => "hsql",
        }
    }

    /// The renderer implementing this dialect
    pub fn renderer(&self) -> &'static dyn DialectRenderer {
        match self {
            Dialect::MySql => &MYSQL,
            Dialect::MsSql => &MSSQL,
            Dialect::Oracle => &ORACLE,
            Dialect::Hsql => &HSQL,
        }
    }

    /// Whether unquoted identifiers are folded to upper case
    pub fn forces_uppercase(&self) -> bool {
        matches!(self, Dialect::Oracle | Dialect::Hsql)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "mssql" | "sqlserver" | "sql_server" => Ok(Dialect::MsSql),
            "oracle" => Ok(Dialect::Oracle),
            "hsql" | "hsqldb" => Ok(Dialect::Hsql),
            other => Err(Error::UnsupportedDialect(other.to_string())),
        }
    }
}

/// Rendering contract every dialect implements
pub trait DialectRenderer: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Escape a column or index identifier
    fn quote_ident(&self, name: &str) -> String;

    /// Escape a table identifier
    fn table_ident(&self, name: &str) -> String {
        name.to_string()
    }

    /// CREATE TABLE plus whatever the dialect cannot inline into it
    fn render_create_table(&self, table: &TableDefinition) -> Result<Vec<String>>;

    fn render_column_add(&self, column: &ColumnDefinition) -> Result<Vec<String>>;

    /// Move `old` to `new`, restating only the clauses that changed
    fn render_column_alter(
        &self,
        old: &ColumnDefinition,
        new: &ColumnDefinition,
    ) -> Result<Vec<String>>;

    /// `table` supplies the column types an index may need a key length for
    fn render_index_add(
        &self,
        table: &TableDefinition,
        index: &IndexDefinition,
    ) -> Result<Vec<String>>;

    fn render_index_drop(&self, index: &IndexDefinition) -> Result<Vec<String>>;

    /// Drop `existing` if present, then add `reference` if present
    fn render_constraint_sync(
        &self,
        existing: Option<&ConstraintDefinition>,
        reference: Option<&ConstraintDefinition>,
    ) -> Result<Vec<String>>;

    /// Strip catalog decoration from a reported default. Idempotent.
    fn normalize_default(&self, raw: Option<&str>) -> Option<String>;

    /// Canonical type name with dialect aliases folded
    fn normalize_type_name(&self, name: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() {
        assert_eq!("MySQL".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("sqlserver".parse::<Dialect>().unwrap(), Dialect::MsSql);
        assert_eq!("hsqldb".parse::<Dialect>().unwrap(), Dialect::Hsql);
        assert!(matches!(
            "db2".parse::<Dialect>(),
            Err(Error::UnsupportedDialect(_))
        ));
    }

    #[test]
    fn test_renderer_selection() {
        for dialect in Dialect::all() {
            assert_eq!(dialect.renderer().dialect(), dialect);
        }
    }
}
