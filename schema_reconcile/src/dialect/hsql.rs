//! HSQLDB renderer
//!
//! HSQL alters one column property per statement, so a differential alter
//! becomes a short sequence of `ALTER COLUMN` statements.

use crate::dialect::common::{
    default_clause, default_literal, fold_type_alias, ident_list, normalize_default_with,
    referential_actions,
};
use crate::dialect::{Dialect, DialectRenderer};
use crate::error::{Error, Result};
use crate::schema::diff::ColumnDelta;
use crate::schema::types::{
    ColumnDefinition, ConstraintDefinition, IndexDefinition, TableDefinition,
};

const TYPE_ALIASES: &[(&str, &str)] = &[
    ("INT", "INTEGER"),
    ("CHARACTER VARYING", "VARCHAR"),
    ("LONGVARCHAR", "VARCHAR"),
    ("DOUBLE PRECISION", "DOUBLE"),
    ("FLOAT", "DOUBLE"),
    ("CHARACTER LARGE OBJECT", "CLOB"),
    ("BINARY LARGE OBJECT", "BLOB"),
];

const IDENTITY: &str = "GENERATED BY DEFAULT AS IDENTITY (START WITH 1)";

/// Renderer for HSQLDB 2.x
#[derive(Debug, Clone, Copy, Default)]
pub struct HsqlRenderer;

impl HsqlRenderer {
    fn column_clause(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.column_name),
            column.data_type.sql_type_name
        );

        if column.auto_increment {
            sql.push(' ');
            sql.push_str(IDENTITY);
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
}

impl DialectRenderer for HsqlRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Hsql
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
            "ALTER TABLE {} ADD COLUMN {}",
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
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.table_ident(&new.table_name),
            self.quote_ident(&new.column_name)
        );

        let mut statements = Vec::new();

        if delta.data_type {
            statements.push(format!(
                "{} SET DATA TYPE {}",
                prefix, new.data_type.sql_type_name
            ));
        }

        if delta.default {
            statements.push(match self.normalize_default(new.effective_default()) {
                Some(value) => format!(
                    "{} SET DEFAULT {}",
                    prefix,
                    default_literal(&new.data_type, &value)
                ),
                None => format!("{} DROP DEFAULT", prefix),
            });
        }

        if delta.nullable {
            statements.push(format!(
                "{} SET {}",
                prefix,
                if new.is_nullable() { "NULL" } else { "NOT NULL" }
            ));
        }

        if delta.auto_increment {
            statements.push(if new.auto_increment {
                format!("{} {} {}", prefix, new.data_type.sql_type_name, IDENTITY)
            } else {
                format!("{} DROP GENERATED", prefix)
            });
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

    fn normalize_default(&self, raw: Option<&str>) -> Option<String> {
        normalize_default_with(raw, false)
    }

    fn normalize_type_name(&self, name: &str) -> String {
        fold_type_alias(name, TYPE_ALIASES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::datatype::{LogicalType, SqlDatatype};
    use crate::schema::fixtures::{column, simple_table};
    use pretty_assertions::assert_eq;

    const D: Dialect = Dialect::Hsql;

    #[test]
    fn test_create_table() {
        let mut table = simple_table(D);
        table.add_column(column(D, "t", "body", LogicalType::Text).default_value("n/a"));
        assert_eq!(
            HsqlRenderer.render_create_table(&table).unwrap(),
            vec![
                "CREATE TABLE t (id INTEGER GENERATED BY DEFAULT AS IDENTITY (START WITH 1), \
                 name VARCHAR(32), body LONGVARCHAR DEFAULT 'n/a' NOT NULL, \
                 CONSTRAINT T_PK PRIMARY KEY (id))"
            ]
        );
    }

    #[test]
    fn test_add_column() {
        let count = column(D, "t", "hits", LogicalType::Long).default_value("0");
        assert_eq!(
            HsqlRenderer.render_column_add(&count).unwrap(),
            vec!["ALTER TABLE t ADD COLUMN hits BIGINT DEFAULT 0 NOT NULL"]
        );
    }

    #[test]
    fn test_alter_emits_one_statement_per_property() {
        let old = ColumnDefinition::new("t", "name", SqlDatatype::reported("VARCHAR", 12, Some(16)))
            .nullable(true)
            .default_value("'a'");
        let new = column(D, "t", "name", LogicalType::ShortText(32));
        assert_eq!(
            HsqlRenderer.render_column_alter(&old, &new).unwrap(),
            vec![
                "ALTER TABLE t ALTER COLUMN name SET DATA TYPE VARCHAR(32)",
                "ALTER TABLE t ALTER COLUMN name DROP DEFAULT",
                "ALTER TABLE t ALTER COLUMN name SET NOT NULL",
            ]
        );
    }

    #[test]
    fn test_alter_identity() {
        let old = ColumnDefinition::new("t", "id", SqlDatatype::reported("INTEGER", 4, None));
        let new = column(D, "t", "id", LogicalType::Int).auto_increment(true);
        assert_eq!(
            HsqlRenderer.render_column_alter(&old, &new).unwrap(),
            vec!["ALTER TABLE t ALTER COLUMN id INTEGER GENERATED BY DEFAULT AS IDENTITY (START WITH 1)"]
        );
        assert_eq!(
            HsqlRenderer.render_column_alter(&new, &old).unwrap(),
            vec!["ALTER TABLE t ALTER COLUMN id DROP GENERATED"]
        );
    }

    #[test]
    fn test_reported_longvarchar_matches() {
        let old = ColumnDefinition::new("t", "body", SqlDatatype::reported("VARCHAR", 12, Some(16_777_216)));
        let new = column(D, "t", "body", LogicalType::Text);
        assert!(HsqlRenderer.render_column_alter(&old, &new).unwrap().is_empty());
    }
}
