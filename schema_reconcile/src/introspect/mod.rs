//! Introspection
//!
//! The engine reads the actual schema one table at a time through the
//! [`Introspector`] trait. [`SchemaSnapshot`] is the materialized form: it is
//! filled either by a live introspector such as
//! [`MySqlIntrospector`](mysql::MySqlIntrospector) or from a snapshot file,
//! which lets any dialect be reconciled offline.

pub mod mysql;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::reference::{ConstraintEntry, IndexEntry};
use crate::schema::datatype::{type_codes, SqlDatatype};
use crate::schema::types::{
    ColumnDefinition, ConstraintDefinition, IndexDefinition, TableDefinition,
};
use crate::utils::document::{read_document, write_document};

pub use mysql::MySqlIntrospector;

/// Read access to the actual schema
pub trait Introspector {
    /// `Ok(None)` when the table does not exist.
    ///
    /// `Err(Error::IntrospectionError { .. })` when this one table could not
    /// be read; any other error means nothing can be read.
    fn table(&self, name: &str) -> Result<Option<TableDefinition>>;
}

/// Introspected tables keyed case-insensitively, plus tables that failed
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    tables: IndexMap<String, TableDefinition>,
    failures: IndexMap<String, String>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: TableDefinition) {
        let key = table.table_name.to_lowercase();
        self.failures.shift_remove(&key);
        self.tables.insert(key, table);
    }

    /// Record that `table` could not be introspected
    pub fn add_failure(&mut self, table: &str, message: impl Into<String>) {
        self.failures.insert(table.to_lowercase(), message.into());
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.values()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.failures
            .iter()
            .map(|(table, message)| (table.as_str(), message.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Load a snapshot from a TOML, YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: SnapshotFile = read_document(path)?;
        Ok(Self::from(file))
    }

    /// Write the snapshot to a TOML, YAML or JSON file
    pub fn write_to(&self, path: &Path) -> Result<()> {
        write_document(path, &SnapshotFile::from(self))
    }
}

impl Introspector for SchemaSnapshot {
    fn table(&self, name: &str) -> Result<Option<TableDefinition>> {
        let key = name.to_lowercase();

        if let Some(message) = self.failures.get(&key) {
            return Err(Error::IntrospectionError {
                table: name.to_string(),
                message: message.clone(),
            });
        }

        Ok(self.tables.get(&key).cloned())
    }
}

/// On-disk form of a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub tables: Vec<SnapshotTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTable {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<SnapshotColumn>,
    #[serde(default)]
    pub indexes: Vec<IndexEntry>,
    #[serde(default)]
    pub constraints: Vec<ConstraintEntry>,
}

/// A column exactly as the metadata catalog reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub type_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default)]
    pub nullable: bool,
    /// Raw, un-normalized default text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
}

impl SnapshotTable {
    fn to_table_definition(&self) -> TableDefinition {
        let mut table = TableDefinition::new(&self.name);

        for column in &self.columns {
            let data_type = SqlDatatype::reported(&column.type_name, column.type_code, column.length);
            let mut definition = ColumnDefinition::new(&self.name, &column.name, data_type)
                .nullable(column.nullable)
                .auto_increment(column.auto_increment);
            definition.default_value = column.default.clone();
            table.add_column(definition);
        }

        for index in &self.indexes {
            let columns: Vec<&str> = index.columns.iter().map(String::as_str).collect();
            let mut definition =
                IndexDefinition::new(&index.name, &self.name, &columns).unique(index.unique);
            if index.primary {
                definition = definition.primary();
            }
            table.add_index(definition);
        }

        for constraint in &self.constraints {
            table.add_constraint(ConstraintDefinition {
                constraint_name: constraint.name.clone(),
                table_name: self.name.clone(),
                column_name: constraint.column.clone(),
                foreign_table_name: constraint.references_table.clone(),
                foreign_column_name: constraint.references_column.clone(),
                on_delete: constraint.on_delete.clone(),
                on_update: constraint.on_update.clone(),
            });
        }

        table
    }

    fn from_table_definition(table: &TableDefinition) -> Self {
        let columns = table
            .columns
            .values()
            .map(|column| {
                let signature = column.data_type.signature();
                SnapshotColumn {
                    name: column.column_name.clone(),
                    type_name: signature.type_name,
                    type_code: signature.type_code,
                    length: signature.length,
                    nullable: column.nullable,
                    default: column.default_value.clone(),
                    auto_increment: column.auto_increment,
                }
            })
            .collect();

        let indexes = table
            .indexes
            .values()
            .map(|index| IndexEntry {
                name: index.index_name.clone(),
                primary: index.primary,
                unique: index.unique,
                columns: index.column_names().map(str::to_string).collect(),
            })
            .collect();

        let constraints = table
            .constraints
            .values()
            .map(|constraint| ConstraintEntry {
                name: constraint.constraint_name.clone(),
                column: constraint.column_name.clone(),
                references_table: constraint.foreign_table_name.clone(),
                references_column: constraint.foreign_column_name.clone(),
                on_delete: constraint.on_delete.clone(),
                on_update: constraint.on_update.clone(),
            })
            .collect();

        Self {
            name: table.table_name.clone(),
            columns,
            indexes,
            constraints,
        }
    }
}

impl From<SnapshotFile> for SchemaSnapshot {
    fn from(file: SnapshotFile) -> Self {
        let mut snapshot = SchemaSnapshot::new();
        for table in &file.tables {
            snapshot.add_table(table.to_table_definition());
        }
        snapshot
    }
}

impl From<&SchemaSnapshot> for SnapshotFile {
    fn from(snapshot: &SchemaSnapshot) -> Self {
        Self {
            tables: snapshot
                .tables()
                .map(SnapshotTable::from_table_definition)
                .collect(),
        }
    }
}

/// Type code for a reported type name when the catalog does not supply one
pub fn type_code_for_name(type_name: &str) -> i32 {
    match crate::schema::datatype::base_type_name(type_name).as_str() {
        "VARCHAR" | "VARCHAR2" | "CHARACTER VARYING" => type_codes::VARCHAR,
        "NVARCHAR" | "NVARCHAR2" => type_codes::NVARCHAR,
        "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "LONGVARCHAR" => type_codes::LONGVARCHAR,
        "CLOB" | "NCLOB" => type_codes::CLOB,
        "BLOB" | "LONGBLOB" | "MEDIUMBLOB" => type_codes::BLOB,
        "VARBINARY" => type_codes::VARBINARY,
        "TINYINT" => type_codes::TINYINT,
        "INT" | "INTEGER" => type_codes::INTEGER,
        "BIGINT" => type_codes::BIGINT,
        "NUMBER" | "NUMERIC" | "DECIMAL" => type_codes::NUMERIC,
        "FLOAT" => type_codes::FLOAT,
        "DOUBLE" | "DOUBLE PRECISION" => type_codes::DOUBLE,
        "DATETIME" | "TIMESTAMP" => type_codes::TIMESTAMP,
        _ => type_codes::UNKNOWN,
    }
}
