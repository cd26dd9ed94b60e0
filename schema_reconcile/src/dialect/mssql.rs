//! SQL Server renderer
//!
//! Defaults on SQL Server are named constraints. The catalog generates the
//! name, so dropping one looks it up at execution time in a dynamic batch.

use crate::dialect::common::{
    default_literal, fold_type_alias, ident_list, normalize_default_with, quote_literal,
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
    ("NUMERIC", "DECIMAL"),
    ("DOUBLE PRECISION", "FLOAT"),
    ("CHARACTER VARYING", "VARCHAR"),
    ("NATIONAL CHARACTER VARYING", "NVARCHAR"),
];

/// Renderer for Microsoft SQL Server 2012 and later
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlRenderer;

impl MsSqlRenderer {
    fn column_clause(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.column_name),
            column.data_type.sql_type_name
        );

        if column.auto_increment {
            sql.push_str(" IDENTITY(1,1) NOT NULL");
            return sql;
        }

        if let Some(value) = self.normalize_default(column.default_value.as_deref()) {
            sql.push_str(&format!(" DEFAULT {}", default_literal(&column.data_type, &value)));
        }

        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        sql
    }

    /// Drop whatever default constraint is bound to `column`
    fn drop_default(&self, column: &ColumnDefinition) -> String {
        let table = quote_literal(&column.table_name);
        let name = quote_literal(&column.column_name);
        let drop = quote_literal(&format!(
            "ALTER TABLE {} DROP CONSTRAINT ",
            self.table_ident(&column.table_name)
        ));

        format!(
            "DECLARE @constraint NVARCHAR(256); \
             SELECT @constraint = dc.name FROM sys.default_constraints dc \
             JOIN sys.columns c ON c.object_id = dc.parent_object_id AND c.column_id = dc.parent_column_id \
             WHERE dc.parent_object_id = OBJECT_ID(N{}) AND c.name = N{}; \
             IF @constraint IS NOT NULL EXEC(N{} + QUOTENAME(@constraint))",
            table, name, drop
        )
    }

    fn add_default(&self, column: &ColumnDefinition, value: &str) -> String {
        format!(
            "ALTER TABLE {} ADD DEFAULT {} FOR {}",
            self.table_ident(&column.table_name),
            default_literal(&column.data_type, value),
            self.quote_ident(&column.column_name)
        )
    }
}

impl DialectRenderer for MsSqlRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::MsSql
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

        if let Some(primary) = table.primary_index() {
            clauses.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.quote_ident(&primary.rendered_name()),
                ident_list(primary.column_names(), |name| self.quote_ident(name))
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({})",
            self.table_ident(&table.table_name),
            clauses.join(", ")
        )];

        for index in table.indexes.values().filter(|i| !i.primary) {
            statements.extend(self.render_index_add(table, index)?);
        }

        Ok(statements)
    }

    fn render_column_add(&self, column: &ColumnDefinition) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD {}",
            self.table_ident(&column.table_name),
            self.column_clause(column)
        )])
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

        if delta.auto_increment {
            return Err(Error::RenderError(format!(
                "Cannot change IDENTITY on {}.{} in place",
                new.table_name, new.column_name
            )));
        }

        let old_default = self.normalize_default(old.effective_default());
        let new_default = self.normalize_default(new.effective_default());

        // A bound default blocks a type change, so it is dropped first and
        // restored afterwards
        let rebind_default = delta.default || (delta.data_type && old_default.is_some());

        let mut statements = Vec::new();
        if rebind_default && old_default.is_some() {
            statements.push(self.drop_default(old));
        }

        if delta.data_type || delta.nullable {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} {} {}",
                self.table_ident(&new.table_name),
                self.quote_ident(&new.column_name),
                new.data_type.sql_type_name,
                if new.is_nullable() { "NULL" } else { "NOT NULL" }
            ));
        }

        if rebind_default {
            if let Some(value) = &new_default {
                statements.push(self.add_default(new, value));
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
        let columns = ident_list(index.column_names(), |name| self.quote_ident(name));

        if index.primary {
            return Ok(vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                table_name,
                self.quote_ident(&index.rendered_name()),
                columns
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
            return Ok(vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                table_name,
                self.quote_ident(&index.rendered_name())
            )]);
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
                referential_actions(reference, true)
            ));
        }

        Ok(statements)
    }

    /// SQL Server reports `(('x'))` for `DEFAULT 'x'` and `((0))` for `DEFAULT 0`
    fn normalize_default(&self, raw: Option<&str>) -> Option<String> {
        normalize_default_with(raw, true)
    }

    fn normalize_type_name(&self, name: &str) -> String {
        fold_type_alias(name, TYPE_ALIASES)
    }
}
