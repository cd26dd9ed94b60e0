//! Reference schema files
//!
//! A reference file lists tables in logical terms: columns carry a logical
//! datatype name rather than SQL, so one file describes the schema for every
//! dialect. The [`ReferenceRegistry`] turns a set of files into a
//! [`SchemaDefinition`](crate::schema::types::SchemaDefinition) for one
//! dialect.

pub mod registry;

use serde::{Deserialize, Serialize};

pub use registry::ReferenceRegistry;

/// Top-level structure of a reference file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceFile {
    #[serde(default)]
    pub tables: Vec<TableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnEntry>,
    #[serde(default)]
    pub indexes: Vec<IndexEntry>,
    #[serde(default)]
    pub constraints: Vec<ConstraintEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    /// Logical datatype name, e.g. `short_text` or `long`
    #[serde(rename = "type")]
    pub logical_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

/// Index entry, shared by reference and snapshot files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Foreign key entry, shared by reference and snapshot files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintEntry {
    pub name: String,
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

/// A default as written in a file: `default = 0` and `default = "0"` both work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl DefaultValue {
    /// Raw default text; booleans become `1`/`0`
    pub fn to_sql_value(&self) -> String {
        match self {
            DefaultValue::Bool(value) => (if *value { "1" } else { "0" }).to_string(),
            DefaultValue::Integer(value) => value.to_string(),
            DefaultValue::Float(value) => value.to_string(),
            DefaultValue::Text(value) => value.clone(),
        }
    }
}
