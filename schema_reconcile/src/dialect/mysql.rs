//! MySQL renderer
//!
//! Column and index identifiers are backtick-quoted; table names are emitted
//! as given. Autoincrement uses `AUTO_INCREMENT`, which MySQL only accepts on
//! a key column, so adding one also declares the primary key.

use crate::dialect::common::{
    default_clause, default_literal, fold_type_alias, index_column_list, normalize_default_with,
    referential_actions,
};
use crate::dialect::{Dialect, DialectRenderer};
use crate::error::{Error, Result};
use crate::schema::diff::ColumnDelta;
use crate::schema::types::{
    ColumnDefinition, ConstraintDefinition, IndexDefinition, TableDefinition,
};

const TYPE_ALIASES: &[(&str, &str)] = &[
    ("INTEGER", "INT"),
    ("BOOL", "TINYINT"),
    ("BOOLEAN", "TINYINT"),
    ("REAL", "DOUBLE"),
    ("DOUBLE PRECISION", "DOUBLE"),
    ("NUMERIC", "DECIMAL"),
    ("CHARACTER VARYING", "VARCHAR"),
];

/// Renderer for MySQL and MariaDB
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlRenderer;

impl MySqlRenderer {
    fn column_clause(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.column_name),
            column.data_type.sql_type_name
        );

        if column.auto_increment {
            sql.push_str(" NOT NULL AUTO_INCREMENT");
            return sql;
        }

        if !column.nullable {
            sql.push_str(" NOT NULL");
        }

        let default = self.normalize_default(column.default_value.as_deref());
        match default_clause(&column.data_type, default.as_deref()) {
            Some(clause) => {
                sql.push(' ');
                sql.push_str(&clause);
            }
            None if column.nullable => sql.push_str(" DEFAULT NULL"),
            None => {}
        }

        sql
    }

    fn index_columns(&self, table: &TableDefinition, index: &IndexDefinition) -> String {
        index_column_list(
            index,
            |name| self.quote_ident(name),
            |name| {
                table
                    .column(name)
                    .filter(|column| column.data_type.needs_key_length)
                    .and_then(|column| column.data_type.key_length)
            },
        )
    }
}

impl DialectRenderer for MySqlRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
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

        match table.primary_index() {
            Some(primary) => {
                clauses.push(format!("PRIMARY KEY ({})", self.index_columns(table, primary)));
            }
            None => {
                if let Some(column) = table.auto_increment_column() {
                    clauses.push(format!(
                        "PRIMARY KEY ({})",
                        self.quote_ident(&column.column_name)
                    ));
                }
            }
        }

        for index in table.indexes.values().filter(|i| !i.primary && i.unique) {
            clauses.push(format!(
                "UNIQUE KEY {} ({})",
                self.quote_ident(&index.rendered_name()),
                self.index_columns(table, index)
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({}) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.table_ident(&table.table_name),
            clauses.join(", ")
        )];

        for index in table.indexes.values().filter(|i| !i.is_unique()) {
            statements.extend(self.render_index_add(table, index)?);
        }

        Ok(statements)
    }

    fn render_column_add(&self, column: &ColumnDefinition) -> Result<Vec<String>> {
        let mut sql = format!(
            "ALTER TABLE {} ADD {}",
            self.table_ident(&column.table_name),
            self.column_clause(column)
        );

        if column.auto_increment {
            sql.push_str(&format!(
                ", ADD PRIMARY KEY ({})",
                self.quote_ident(&column.column_name)
            ));
        }

        Ok(vec![sql])
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

        let table = self.table_ident(&new.table_name);
        let column = self.quote_ident(&new.column_name);

        // MODIFY restates the whole column, so a default-only change uses
        // the narrower ALTER form
        if delta.default && !delta.data_type && !delta.nullable && !delta.auto_increment {
            let sql = match self.normalize_default(new.effective_default()) {
                Some(value) => format!(
                    "ALTER TABLE {} ALTER {} SET DEFAULT {}",
                    table,
                    column,
                    default_literal(&new.data_type, &value)
                ),
                None => format!("ALTER TABLE {} ALTER {} DROP DEFAULT", table, column),
            };
            return Ok(vec![sql]);
        }

        Ok(vec![format!(
            "ALTER TABLE {} MODIFY {}",
            table,
            self.column_clause(new)
        )])
    }

    fn render_index_add(
        &self,
        table: &TableDefinition,
        index: &IndexDefinition,
    ) -> Result<Vec<String>> {
        let columns = self.index_columns(table, index);
        let table_name = self.table_ident(&index.table_name);

        if index.primary {
            return Ok(vec![format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                table_name, columns
            )]);
        }

        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_ident(&index.rendered_name()),
            table_name,
            columns
        )])
    }

    fn render_index_drop(&self, index: &IndexDefinition) -> Result<Vec<String>> {
        let table_name = self.table_ident(&index.table_name);

        if index.primary {
            return Ok(vec![format!("ALTER TABLE {} DROP PRIMARY KEY", table_name)]);
        }

        Ok(vec![format!(
            "DROP INDEX {} ON {}",
            self.quote_ident(&index.rendered_name()),
            table_name
        )])
    }

    fn render_constraint_sync(
        &self,
        existing: Option<&ConstraintDefinition>,
        reference: Option<&ConstraintDefinition>,
    ) -> Result<Vec<String>> {
        let mut statements = Vec::new();

        if let Some(existing) = existing {
            statements.push(format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
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
                referential_actions(reference, true)
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
