//! Type definitions for schema objects
//!
//! These describe both sides of a reconciliation: the reference schema loaded
//! from configuration, and the actual schema synthesized from introspection.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::datatype::SqlDatatype;

/// A complete schema: tables keyed by name, in load order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub tables: IndexMap<String, TableDefinition>,
}

impl SchemaDefinition {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: TableDefinition) {
        self.tables.insert(table.table_name.clone(), table);
    }

    /// Look up a table by name, ignoring ASCII case
    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        lookup(&self.tables, name)
    }
}

/// Represents a database table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table_name: String,
    /// Insertion order is the physical column order
    pub columns: IndexMap<String, ColumnDefinition>,
    pub indexes: IndexMap<String, IndexDefinition>,
    #[serde(default)]
    pub constraints: IndexMap<String, ConstraintDefinition>,
}

impl TableDefinition {
    /// Create a new table with the given name
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: ColumnDefinition) {
        self.columns.insert(column.column_name.clone(), column);
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: IndexDefinition) {
        self.indexes.insert(index.index_name.clone(), index);
    }

    /// Add a foreign key to the table
    pub fn add_constraint(&mut self, constraint: ConstraintDefinition) {
        self.constraints
            .insert(constraint.constraint_name.clone(), constraint);
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        lookup(&self.columns, name)
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        lookup(&self.indexes, name)
    }

    pub fn constraint(&self, name: &str) -> Option<&ConstraintDefinition> {
        lookup(&self.constraints, name)
    }

    /// The table's primary index, whatever the database named it
    pub fn primary_index(&self) -> Option<&IndexDefinition> {
        self.indexes.values().find(|index| index.primary)
    }

    /// The first autoincrement column, if any
    pub fn auto_increment_column(&self) -> Option<&ColumnDefinition> {
        self.columns.values().find(|column| column.auto_increment)
    }
}

/// Represents a table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub table_name: String,
    pub column_name: String,
    pub data_type: SqlDatatype,
    pub nullable: bool,
    /// Always NOT NULL with a generated value; `nullable` and
    /// `default_value` are ignored
    pub auto_increment: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    /// Create a new NOT NULL column without a default
    pub fn new(table_name: &str, column_name: &str, data_type: SqlDatatype) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            data_type,
            nullable: false,
            auto_increment: false,
            default_value: None,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    /// Set a default value for the column
    pub fn default_value(mut self, default: &str) -> Self {
        self.default_value = Some(default.to_string());
        self
    }

    /// Effective nullability once autoincrement is taken into account
    pub fn is_nullable(&self) -> bool {
        self.nullable && !self.auto_increment
    }

    /// Effective default once autoincrement is taken into account
    pub fn effective_default(&self) -> Option<&str> {
        if self.auto_increment {
            None
        } else {
            self.default_value.as_deref()
        }
    }
}

/// Represents an index, including the primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub index_name: String,
    pub table_name: String,
    pub primary: bool,
    pub unique: bool,
    /// Position → column name; order is the physical order in the index
    pub columns: BTreeMap<u32, String>,
    /// Whether the dialect forces identifier case
    pub uppercase: bool,
}

impl IndexDefinition {
    /// Create an index over `columns` in the given order
    pub fn new(index_name: &str, table_name: &str, columns: &[&str]) -> Self {
        Self {
            index_name: index_name.to_string(),
            table_name: table_name.to_string(),
            primary: false,
            unique: false,
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, c)| (i as u32 + 1, c.to_string()))
                .collect(),
            uppercase: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn uppercase(mut self, uppercase: bool) -> Self {
        self.uppercase = uppercase;
        self
    }

    /// Column names in index order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.values().map(String::as_str)
    }

    /// Primary implies unique
    pub fn is_unique(&self) -> bool {
        self.unique || self.primary
    }

    /// Name as it must be emitted
    pub fn rendered_name(&self) -> String {
        if self.uppercase {
            self.index_name.to_uppercase()
        } else {
            self.index_name.clone()
        }
    }
}

/// Represents a single-column foreign key constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDefinition {
    pub constraint_name: String,
    pub table_name: String,
    pub column_name: String,
    pub foreign_table_name: String,
    pub foreign_column_name: String,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl ConstraintDefinition {
    pub fn new(
        constraint_name: &str,
        table_name: &str,
        column_name: &str,
        foreign_table_name: &str,
        foreign_column_name: &str,
    ) -> Self {
        Self {
            constraint_name: constraint_name.to_string(),
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            foreign_table_name: foreign_table_name.to_string(),
            foreign_column_name: foreign_column_name.to_string(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn on_delete(mut self, action: &str) -> Self {
        self.on_delete = Some(action.to_string());
        self
    }

    pub fn on_update(mut self, action: &str) -> Self {
        self.on_update = Some(action.to_string());
        self
    }
}

/// Canonical form of a referential action.
///
/// `NO ACTION` and `RESTRICT` are what every supported database does when no
/// action is declared, so they collapse to `None`.
pub fn normalize_action(action: Option<&str>) -> Option<String> {
    let action = action?
        .trim()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    match action.as_str() {
        "" | "NO ACTION" | "RESTRICT" => None,
        _ => Some(action),
    }
}

fn lookup<'a, T>(map: &'a IndexMap<String, T>, name: &str) -> Option<&'a T> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}
