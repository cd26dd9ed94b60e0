//! Drift detection
//!
//! Pairwise comparison of reference definitions against introspected ones.
//! Everything here goes through the active renderer's normalization so that
//! what a database reports back compares equal to what was asked for.

use std::fmt;

use crate::dialect::DialectRenderer;
use crate::schema::datatype::SqlDatatype;
use crate::schema::types::{
    normalize_action, ColumnDefinition, ConstraintDefinition, IndexDefinition,
};

/// Which aspects of a column differ between two definitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnDelta {
    pub data_type: bool,
    pub nullable: bool,
    pub auto_increment: bool,
    pub default: bool,
}

impl ColumnDelta {
    /// Compare `old` (usually introspected) against `new` (usually reference)
    pub fn between(
        renderer: &dyn DialectRenderer,
        old: &ColumnDefinition,
        new: &ColumnDefinition,
    ) -> Self {
        let data_type = !types_match(renderer, &new.data_type, &old.data_type);
        let auto_increment = old.auto_increment != new.auto_increment;

        // An autoincrement target owns its nullability and default
        let (nullable, default) = if new.auto_increment {
            (false, false)
        } else {
            (
                old.is_nullable() != new.is_nullable(),
                renderer.normalize_default(old.effective_default())
                    != renderer.normalize_default(new.effective_default()),
            )
        };

        Self {
            data_type,
            nullable,
            auto_increment,
            default,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.data_type || self.nullable || self.auto_increment || self.default)
    }

    /// Human-readable summary of what changes from `old` to `new`
    pub fn describe(
        &self,
        renderer: &dyn DialectRenderer,
        old: &ColumnDefinition,
        new: &ColumnDefinition,
    ) -> String {
        let mut parts = Vec::new();

        if self.data_type {
            parts.push(format!(
                "type {} -> {}",
                old.data_type.sql_type_name, new.data_type.sql_type_name
            ));
        }
        if self.nullable {
            parts.push(format!(
                "nullable {} -> {}",
                old.is_nullable(),
                new.is_nullable()
            ));
        }
        if self.auto_increment {
            parts.push(format!(
                "autoincrement {} -> {}",
                old.auto_increment, new.auto_increment
            ));
        }
        if self.default {
            parts.push(format!(
                "default {} -> {}",
                DefaultDisplay(renderer.normalize_default(old.effective_default())),
                DefaultDisplay(renderer.normalize_default(new.effective_default()))
            ));
        }

        parts.join("; ")
    }
}

struct DefaultDisplay(Option<String>);

impl fmt::Display for DefaultDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => write!(f, "'{}'", value),
            None => f.write_str("none"),
        }
    }
}

/// Whether two datatypes are the same once reporting artifacts are removed.
///
/// Type names are compared after alias folding; when either side has no name
/// the JDBC type codes decide. Lengths only matter when both sides carry one.
pub fn types_match(
    renderer: &dyn DialectRenderer,
    expected: &SqlDatatype,
    actual: &SqlDatatype,
) -> bool {
    let expected = expected.signature();
    let actual = actual.signature();

    let names_match = if !expected.type_name.is_empty() && !actual.type_name.is_empty() {
        renderer.normalize_type_name(&expected.type_name)
            == renderer.normalize_type_name(&actual.type_name)
    } else {
        expected.type_code != 0 && expected.type_code == actual.type_code
    };

    let lengths_match = match (expected.length, actual.length) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    };

    names_match && lengths_match
}

/// Same kind, same uniqueness and the same columns in the same order
pub fn index_matches(reference: &IndexDefinition, actual: &IndexDefinition) -> bool {
    reference.primary == actual.primary
        && reference.is_unique() == actual.is_unique()
        && reference.columns.len() == actual.columns.len()
        && reference
            .column_names()
            .zip(actual.column_names())
            .all(|(r, a)| r.eq_ignore_ascii_case(a))
}

/// Same column, same target and the same referential actions
pub fn constraint_matches(
    reference: &ConstraintDefinition,
    actual: &ConstraintDefinition,
) -> bool {
    reference.column_name.eq_ignore_ascii_case(&actual.column_name)
        && reference
            .foreign_table_name
            .eq_ignore_ascii_case(&actual.foreign_table_name)
        && reference
            .foreign_column_name
            .eq_ignore_ascii_case(&actual.foreign_column_name)
        && normalize_action(reference.on_delete.as_deref())
            == normalize_action(actual.on_delete.as_deref())
        && normalize_action(reference.on_update.as_deref())
            == normalize_action(actual.on_update.as_deref())
}

pub fn describe_column(column: &ColumnDefinition) -> String {
    let mut summary = column.data_type.sql_type_name.clone();
    if column.auto_increment {
        summary.push_str(" AUTOINCREMENT");
    } else {
        summary.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = &column.default_value {
            summary.push_str(&format!(" DEFAULT '{}'", default));
        }
    }
    summary
}

pub fn describe_index(index: &IndexDefinition) -> String {
    let kind = if index.primary {
        "PRIMARY"
    } else if index.unique {
        "UNIQUE"
    } else {
        "INDEX"
    };
    format!(
        "{} ({})",
        kind,
        index.column_names().collect::<Vec<_>>().join(", ")
    )
}

pub fn describe_constraint(constraint: &ConstraintDefinition) -> String {
    let mut summary = format!(
        "{} -> {}.{}",
        constraint.column_name, constraint.foreign_table_name, constraint.foreign_column_name
    );
    if let Some(action) = normalize_action(constraint.on_delete.as_deref()) {
        summary.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = normalize_action(constraint.on_update.as_deref()) {
        summary.push_str(&format!(" ON UPDATE {}", action));
    }
    summary
}
