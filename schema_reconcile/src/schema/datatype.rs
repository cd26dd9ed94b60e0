//! Portable datatype catalog
//!
//! Maps every logical type to a concrete SQL type per dialect, together with
//! the metadata needed to index it and to compare it against what the
//! database reports back through its catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// JDBC `java.sql.Types` codes, the lingua franca of metadata catalogs
pub mod type_codes {
    pub const UNKNOWN: i32 = 0;
    pub const VARCHAR: i32 = 12;
    pub const LONGVARCHAR: i32 = -1;
    pub const NVARCHAR: i32 = -9;
    pub const CLOB: i32 = 2005;
    pub const BLOB: i32 = 2004;
    pub const VARBINARY: i32 = -3;
    pub const TINYINT: i32 = -6;
    pub const INTEGER: i32 = 4;
    pub const BIGINT: i32 = -5;
    pub const NUMERIC: i32 = 2;
    pub const FLOAT: i32 = 6;
    pub const DOUBLE: i32 = 8;
    pub const TIMESTAMP: i32 = 93;
}

/// Default length for a short text column declared without one
pub const DEFAULT_SHORT_TEXT_LENGTH: u32 = 255;

/// Logical, dialect-independent column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    ShortText(u32),
    Text,
    Clob,
    Blob,
    TinyInt,
    Int,
    Long,
    Double,
    Date,
}

impl LogicalType {
    /// Parse a logical type from its reference-file name
    pub fn from_name(name: &str, length: Option<u32>) -> Result<Self> {
        let logical = match name.trim().to_lowercase().as_str() {
            "short_text" | "shorttext" | "varchar" => {
                LogicalType::ShortText(length.unwrap_or(DEFAULT_SHORT_TEXT_LENGTH))
            }
            "text" => LogicalType::Text,
            "clob" => LogicalType::Clob,
            "blob" => LogicalType::Blob,
            "tiny_int" | "tinyint" | "boolean" => LogicalType::TinyInt,
            "int" | "integer" => LogicalType::Int,
            "long" | "bigint" => LogicalType::Long,
            "double" => LogicalType::Double,
            "date" | "timestamp" => LogicalType::Date,
            other => {
                return Err(Error::ConfigError(format!(
                    "Unknown logical datatype '{}'",
                    other
                )))
            }
        };

        if length.is_some() && !matches!(logical, LogicalType::ShortText(_)) {
            return Err(Error::ConfigError(format!(
                "Logical datatype '{}' does not take a length",
                name
            )));
        }

        Ok(logical)
    }

    /// Catalog key, independent of any length parameter
    pub fn name(&self) -> &'static str {
        match self {
            LogicalType::ShortText(_) => "short_text",
            LogicalType::Text => "text",
            LogicalType::Clob => "clob",
            LogicalType::Blob => "blob",
            LogicalType::TinyInt => "tiny_int",
            LogicalType::Int => "int",
            LogicalType::Long => "long",
            LogicalType::Double => "double",
            LogicalType::Date => "date",
        }
    }

    /// Every catalog key, in declaration order
    pub fn names() -> [&'static str; 9] {
        [
            "short_text",
            "text",
            "clob",
            "blob",
            "tiny_int",
            "int",
            "long",
            "double",
            "date",
        ]
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::TinyInt | LogicalType::Int | LogicalType::Long | LogicalType::Double
        )
    }

    /// Generic type code used when no dialect-specific report is registered
    pub fn type_code(&self) -> i32 {
        match self {
            LogicalType::ShortText(_) | LogicalType::Text => type_codes::VARCHAR,
            LogicalType::Clob => type_codes::CLOB,
            LogicalType::Blob => type_codes::BLOB,
            LogicalType::TinyInt => type_codes::TINYINT,
            LogicalType::Int => type_codes::INTEGER,
            LogicalType::Long => type_codes::BIGINT,
            LogicalType::Double => type_codes::DOUBLE,
            LogicalType::Date => type_codes::TIMESTAMP,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::ShortText(length) => write!(f, "short_text({})", length),
            other => f.write_str(other.name()),
        }
    }
}

/// Type as reported by a database's metadata catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedType {
    pub type_code: i32,
    pub type_name: String,
    pub length: Option<u32>,
}

/// A concrete SQL datatype for one dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlDatatype {
    /// `None` when synthesized from introspection
    pub logical: Option<LogicalType>,
    pub sql_type_name: String,
    pub length: Option<u32>,
    pub key_length: Option<u32>,
    pub needs_key_length: bool,
    pub castable: bool,
    pub reported: Option<ReportedType>,
}

impl SqlDatatype {
    /// Build a datatype from what an introspected catalog reports
    pub fn reported(type_name: &str, type_code: i32, length: Option<u32>) -> Self {
        let type_name = type_name.trim().to_string();
        let sql_type_name = match length {
            Some(length) if !type_name.contains('(') => format!("{}({})", type_name, length),
            _ => type_name.clone(),
        };

        Self {
            logical: None,
            sql_type_name,
            length,
            key_length: None,
            needs_key_length: false,
            castable: true,
            reported: Some(ReportedType {
                type_code,
                type_name,
                length,
            }),
        }
    }

    /// The signature compared against introspected columns
    pub fn signature(&self) -> ReportedType {
        if let Some(reported) = &self.reported {
            return reported.clone();
        }

        ReportedType {
            type_code: self.logical.map(|l| l.type_code()).unwrap_or(type_codes::UNKNOWN),
            type_name: base_type_name(&self.sql_type_name),
            length: parse_type_length(&self.sql_type_name),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.logical.map(|l| l.is_numeric()).unwrap_or(false)
    }
}

/// Upper-cased type name without any parenthesized parameters
pub fn base_type_name(sql_type: &str) -> String {
    let base = sql_type.split('(').next().unwrap_or(sql_type);
    base.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// First numeric parameter of a type such as `VARCHAR(32)` or `NUMBER(10,2)`
pub fn parse_type_length(sql_type: &str) -> Option<u32> {
    let start = sql_type.find('(')?;
    let end = sql_type[start..].find(')')? + start;
    let inner = &sql_type[start + 1..end];
    inner
        .split(|c| c == ',' || c == ' ')
        .next()
        .and_then(|n| n.trim().parse().ok())
}

/// Registration entry; `{length}` in `sql_type` is replaced for short text
#[derive(Debug, Clone)]
pub struct DatatypeTemplate {
    pub sql_type: String,
    pub key_length: Option<u32>,
    pub needs_key_length: bool,
    pub castable: bool,
    pub reported: Option<ReportedType>,
}

impl DatatypeTemplate {
    pub fn new(sql_type: &str) -> Self {
        Self {
            sql_type: sql_type.to_string(),
            key_length: None,
            needs_key_length: false,
            castable: true,
            reported: None,
        }
    }

    /// Indexes over this type must declare a prefix of `key_length`
    pub fn keyed(mut self, key_length: u32) -> Self {
        self.key_length = Some(key_length);
        self.needs_key_length = true;
        self
    }

    pub fn not_castable(mut self) -> Self {
        self.castable = false;
        self
    }

    pub fn reported_as(mut self, type_code: i32, type_name: &str, length: Option<u32>) -> Self {
        self.reported = Some(ReportedType {
            type_code,
            type_name: type_name.to_string(),
            length,
        });
        self
    }
}

/// Registry of (dialect, logical type) → SQL datatype
#[derive(Debug, Clone, Default)]
pub struct DatatypeCatalog {
    entries: HashMap<(Dialect, String), DatatypeTemplate>,
}

impl DatatypeCatalog {
    /// An empty catalog; every dialect in use must be registered completely
    pub fn empty() -> Self {
        Self::default()
    }

    /// The complete built-in mapping for all supported dialects
    pub fn builtin() -> Self {
        use type_codes::*;

        let mut catalog = Self::empty();

        // MySQL
        let d = Dialect::MySql;
        catalog.register(d, "short_text", DatatypeTemplate::new("VARCHAR({length})"));
        catalog.register(d, "text", DatatypeTemplate::new("TEXT").keyed(255));
        catalog.register(d, "clob", DatatypeTemplate::new("LONGTEXT").keyed(255));
        catalog.register(d, "blob", DatatypeTemplate::new("LONGBLOB").keyed(255));
        catalog.register(d, "tiny_int", DatatypeTemplate::new("TINYINT"));
        catalog.register(d, "int", DatatypeTemplate::new("INT"));
        catalog.register(d, "long", DatatypeTemplate::new("BIGINT"));
        catalog.register(d, "double", DatatypeTemplate::new("DOUBLE"));
        catalog.register(d, "date", DatatypeTemplate::new("DATETIME"));

        // SQL Server
        let d = Dialect::MsSql;
        catalog.register(d, "short_text", DatatypeTemplate::new("NVARCHAR({length})"));
        catalog.register(d, "text", DatatypeTemplate::new("NVARCHAR(4000)"));
        catalog.register(
            d,
            "clob",
            DatatypeTemplate::new("NVARCHAR(MAX)").reported_as(NVARCHAR, "NVARCHAR", None),
        );
        catalog.register(
            d,
            "blob",
            DatatypeTemplate::new("VARBINARY(MAX)").reported_as(VARBINARY, "VARBINARY", None),
        );
        catalog.register(d, "tiny_int", DatatypeTemplate::new("TINYINT"));
        catalog.register(d, "int", DatatypeTemplate::new("INT"));
        catalog.register(d, "long", DatatypeTemplate::new("BIGINT"));
        catalog.register(d, "double", DatatypeTemplate::new("FLOAT"));
        catalog.register(d, "date", DatatypeTemplate::new("DATETIME"));

        // Oracle
        let d = Dialect::Oracle;
        catalog.register(d, "short_text", DatatypeTemplate::new("VARCHAR2({length})"));
        catalog.register(d, "text", DatatypeTemplate::new("VARCHAR2(4000)"));
        catalog.register(d, "clob", DatatypeTemplate::new("CLOB").not_castable());
        catalog.register(d, "blob", DatatypeTemplate::new("BLOB").not_castable());
        catalog.register(d, "tiny_int", DatatypeTemplate::new("NUMBER(3)"));
        catalog.register(d, "int", DatatypeTemplate::new("NUMBER(10)"));
        catalog.register(d, "long", DatatypeTemplate::new("NUMBER(19)"));
        catalog.register(
            d,
            "double",
            DatatypeTemplate::new("DOUBLE PRECISION").reported_as(FLOAT, "FLOAT", Some(126)),
        );
        catalog.register(d, "date", DatatypeTemplate::new("TIMESTAMP"));

        // HSQL
        let d = Dialect::Hsql;
        catalog.register(d, "short_text", DatatypeTemplate::new("VARCHAR({length})"));
        catalog.register(
            d,
            "text",
            DatatypeTemplate::new("LONGVARCHAR").reported_as(VARCHAR, "VARCHAR", Some(16_777_216)),
        );
        catalog.register(d, "clob", DatatypeTemplate::new("CLOB"));
        catalog.register(d, "blob", DatatypeTemplate::new("BLOB"));
        catalog.register(d, "tiny_int", DatatypeTemplate::new("TINYINT"));
        catalog.register(d, "int", DatatypeTemplate::new("INTEGER"));
        catalog.register(d, "long", DatatypeTemplate::new("BIGINT"));
        catalog.register(d, "double", DatatypeTemplate::new("DOUBLE"));
        catalog.register(d, "date", DatatypeTemplate::new("TIMESTAMP"));

        catalog
    }

    /// Register or replace the mapping for one logical type on one dialect
    pub fn register(&mut self, dialect: Dialect, logical: &str, template: DatatypeTemplate) {
        self.entries
            .insert((dialect, logical.to_string()), template);
    }

    /// Resolve a logical type to its concrete datatype on `dialect`
    pub fn resolve(&self, logical: LogicalType, dialect: Dialect) -> Result<SqlDatatype> {
        let template = self.entries.get(&(dialect, logical.name().to_string())).ok_or_else(|| {
            Error::UnregisteredDatatype {
                dialect: dialect.to_string(),
                logical: logical.to_string(),
            }
        })?;

        let sql_type_name = match logical {
            LogicalType::ShortText(length) => {
                template.sql_type.replace("{length}", &length.to_string())
            }
            _ => template.sql_type.clone(),
        };

        let length = match logical {
            LogicalType::ShortText(length) => Some(length),
            _ => parse_type_length(&sql_type_name),
        };

        Ok(SqlDatatype {
            logical: Some(logical),
            sql_type_name,
            length,
            key_length: template.key_length,
            needs_key_length: template.needs_key_length,
            castable: template.castable,
            reported: template.reported.clone(),
        })
    }

    /// Check that every logical type is registered for `dialect`
    pub fn ensure_complete(&self, dialect: Dialect) -> Result<()> {
        for name in LogicalType::names() {
            if !self.entries.contains_key(&(dialect, name.to_string())) {
                return Err(Error::UnregisteredDatatype {
                    dialect: dialect.to_string(),
                    logical: name.to_string(),
                });
            }
        }
        Ok(())
    }
}
