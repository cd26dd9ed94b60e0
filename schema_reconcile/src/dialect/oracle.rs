//! Oracle renderer
//!
//! Oracle has no identity columns before 12c, so autoincrement is emulated
//! with a sequence and a `BEFORE INSERT` trigger named after the table.

use crate::dialect::common::{
    default_clause, fold_type_alias, ident_list, normalize_default_with, referential_actions,
};
use crate::dialect::{Dialect, DialectRenderer};
use crate::error::{Error, Result};
use crate::schema::datatype::base_type_name;
use crate::schema::diff::ColumnDelta;
use crate::schema::types::{
    normalize_action, ColumnDefinition, ConstraintDefinition, IndexDefinition, TableDefinition,
};
use crate::utils::naming::derived_identifier;

const TYPE_ALIASES: &[(&str, &str)] = &[
    ("INTEGER", "NUMBER"),
    ("INT", "NUMBER"),
    ("SMALLINT", "NUMBER"),
    ("DECIMAL", "NUMBER"),
    ("NUMERIC", "NUMBER"),
    ("DOUBLE PRECISION", "FLOAT"),
    ("VARCHAR", "VARCHAR2"),
];

/// Types that cannot be converted to or from with `MODIFY`
const LOB_TYPES: &[&str] = &["CLOB", "NCLOB", "BLOB", "LONG", "LONG RAW"];

/// Renderer for Oracle 11g and later
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleRenderer;

impl OracleRenderer {
    fn sequence_name(&self, table_name: &str) -> String {
        format!("\"{}\"", derived_identifier(Dialect::Oracle, table_name, "sequence"))
    }

    fn trigger_name(&self, table_name: &str) -> String {
        format!("\"{}\"", derived_identifier(Dialect::Oracle, table_name, "trigger"))
    }

    fn column_clause(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.column_name),
            column.data_type.sql_type_name
        );

        if column.auto_increment {
            sql.push_str(" NOT NULL");
            return sql;
        }

        let default = self.normalize_default(column.default_value.as_deref());
        if let Some(clause) = default_clause(&column.data_type, default.as_deref()) {
            sql.push(' ');
            sql.push_str(&clause);
        }

        if !column.nullable {
            sql.push_str(" NOT NULL");
        }

        sql
    }

    /// Sequence, trigger and trigger enable for an autoincrement column
    fn auto_increment_statements(&self, column: &ColumnDefinition) -> Vec<String> {
        let table = self.table_ident(&column.table_name);
        let sequence = self.sequence_name(&column.table_name);
        let trigger = self.trigger_name(&column.table_name);
        let name = self.quote_ident(&column.column_name);

        vec![
            format!(
                "CREATE SEQUENCE {} START WITH 1 INCREMENT BY 1 NOCACHE",
                sequence
            ),
            format!(
                "CREATE OR REPLACE TRIGGER {} BEFORE INSERT ON {} FOR EACH ROW \
                 WHEN (new.{} IS NULL) BEGIN SELECT {}.NEXTVAL INTO :new.{} FROM dual; END;",
                trigger, table, name, sequence, name
            ),
            format!("ALTER TRIGGER {} ENABLE", trigger),
        ]
    }

    fn primary_key_clause(&self, index: &IndexDefinition) -> String {
        format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_ident(&index.rendered_name()),
            ident_list(index.column_names(), |name| self.quote_ident(name))
        )
    }
}

impl DialectRenderer for OracleRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn quote_ident(&self, name: &str) -> String {
        name.to_string()
    }

    fn render_create_table(&self, table: &TableDefinition) -> Result<Vec<String>> {
        if table.columns.is_empty() {
            return Err(Error::RenderError(format!(
                "Table {} has no columns",
                table.table_name
            )));
        }

        let mut clauses: Vec<String> = table
            .columns
            .values()
            .map(|column| self.column_clause(column))
            .collect();

        // Unique keys stay plain indexes so a later DROP INDEX can rebuild them
        if let Some(primary) = table.primary_index() {
            clauses.push(self.primary_key_clause(primary));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({})",
            self.table_ident(&table.table_name),
            clauses.join(", ")
        )];

        for index in table.indexes.values().filter(|i| !i.primary) {
            statements.extend(self.render_index_add(table, index)?);
        }

        if let Some(column) = table.auto_increment_column() {
            statements.extend(self.auto_increment_statements(column));
        }

        Ok(statements)
    }

    fn render_column_add(&self, column: &ColumnDefinition) -> Result<Vec<String>> {
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD {}",
            self.table_ident(&column.table_name),
            self.column_clause(column)
        )];

        if column.auto_increment {
            statements.extend(self.auto_increment_statements(column));
        }

        Ok(statements)
    }

    fn render_column_alter(
        &self,
        old: &ColumnDefinition,
        new: &ColumnDefinition,
    ) -> Result<Vec<String>> {
        let delta = ColumnDelta::between(self, old, new);
        if delta.is_empty() {
            return Ok(Vec::new());
        }

        if delta.data_type {
            let old_base = base_type_name(&old.data_type.sql_type_name);
            if !new.data_type.castable
                || !old.data_type.castable
                || LOB_TYPES.contains(&old_base.as_str())
            {
                return Err(Error::RenderError(format!(
                    "Cannot convert {}.{} from {} to {}",
                    new.table_name,
                    new.column_name,
                    old.data_type.sql_type_name,
                    new.data_type.sql_type_name
                )));
            }
        }

        // MODIFY fails when a clause restates the current nullability, so
        // only the changed parts are emitted
        let mut parts = Vec::new();
        if delta.data_type {
            parts.push(new.data_type.sql_type_name.clone());
        }
        if delta.default {
            let default = self.normalize_default(new.effective_default());
            parts.push(
                default_clause(&new.data_type, default.as_deref())
                    .unwrap_or_else(|| "DEFAULT NULL".to_string()),
            );
        }
        if delta.nullable {
            parts.push((if new.is_nullable() { "NULL" } else { "NOT NULL" }).to_string());
        } else if delta.auto_increment && new.auto_increment && old.is_nullable() {
            parts.push("NOT NULL".to_string());
        }

        let mut statements = Vec::new();
        if !parts.is_empty() {
            statements.push(format!(
                "ALTER TABLE {} MODIFY ({} {})",
                self.table_ident(&new.table_name),
                self.quote_ident(&new.column_name),
                parts.join(" ")
            ));
        }

        if delta.auto_increment {
            if new.auto_increment {
                statements.extend(self.auto_increment_statements(new));
            } else {
                statements.push(format!(
                    "DROP TRIGGER {}",
                    self.trigger_name(&new.table_name)
                ));
            }
        }

        Ok(statements)
    }

    fn render_index_add(
        &self,
        _table: &TableDefinition,
        index: &IndexDefinition,
    ) -> Result<Vec<String>> {
        let table_name = self.table_ident(&index.table_name);

        if index.primary {
            return Ok(vec![format!(
                "ALTER TABLE {} ADD {}",
                table_name,
                self.primary_key_clause(index)
            )]);
        }

        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_ident(&index.rendered_name()),
            table_name,
            ident_list(index.column_names(), |name| self.quote_ident(name))
        )])
    }

    fn render_index_drop(&self, index: &IndexDefinition) -> Result<Vec<String>> {
        if index.primary {
            return Ok(vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.table_ident(&index.table_name),
                self.quote_ident(&index.rendered_name())
            )]);
        }

        Ok(vec![format!(
            "DROP INDEX {}",
            self.quote_ident(&index.rendered_name())
        )])
    }

    fn render_constraint_sync(
        &self,
        existing: Option<&ConstraintDefinition>,
        reference: Option<&ConstraintDefinition>,
    ) -> Result<Vec<String>> {
        if let Some(reference) = reference {
            if let Some(action) = normalize_action(reference.on_update.as_deref()) {
                return Err(Error::RenderError(format!(
                    "Foreign key {} declares ON UPDATE {}, which Oracle does not support",
                    reference.constraint_name, action
                )));
            }
        }

        let mut statements = Vec::new();

        if let Some(existing) = existing {
            statements.push(format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.table_ident(&existing.table_name),
                self.quote_ident(&existing.constraint_name)
            ));
        }

        if let Some(reference) = reference {
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}){}",
                self.table_ident(&reference.table_name),
                self.quote_ident(&reference.constraint_name),
                self.quote_ident(&reference.column_name),
                self.table_ident(&reference.foreign_table_name),
                self.quote_ident(&reference.foreign_column_name),
                referential_actions(reference, false)
            ));
        }

        Ok(statements)
    }

    fn normalize_default(&self, raw: Option<&str>) -> Option<String> {
        normalize_default_with(raw, false)
    }

    fn normalize_type_name(&self, name: &str) -> String {
        fold_type_alias(name, TYPE_ALIASES)
    }
}
