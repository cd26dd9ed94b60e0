//! Live MySQL introspection
//!
//! Reads `information_schema` one table at a time. Every text column is cast
//! to `CHAR` because MySQL 8 reports several of them as binary strings.

use indexmap::IndexMap;
use sqlx::{FromRow, MySql, Pool};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::introspect::{type_code_for_name, SchemaSnapshot};
use crate::schema::datatype::SqlDatatype;
use crate::schema::types::{
    ColumnDefinition, ConstraintDefinition, IndexDefinition, TableDefinition,
};

/// MySQL names the primary key index `PRIMARY`
const PRIMARY_INDEX_NAME: &str = "PRIMARY";

/// Types whose reported length is part of their signature
const LENGTH_TYPES: &[&str] = &["varchar", "char", "varbinary", "binary"];

#[derive(Debug, FromRow)]
struct TableRow {
    #[allow(dead_code)]
    table_name: String,
}

#[derive(Debug, FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    character_maximum_length: Option<i64>,
    is_nullable: String,
    column_default: Option<String>,
    extra: Option<String>,
}

#[derive(Debug, FromRow)]
struct IndexRow {
    index_name: String,
    column_name: Option<String>,
    non_unique: i64,
    seq_in_index: i64,
}

#[derive(Debug, FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    column_name: String,
    referenced_table: String,
    referenced_column: String,
    delete_rule: Option<String>,
    update_rule: Option<String>,
}

/// Reads table metadata from a MySQL or MariaDB server
pub struct MySqlIntrospector<'a> {
    pool: &'a Pool<MySql>,
    schema: Option<String>,
}

impl<'a> MySqlIntrospector<'a> {
    /// `schema` defaults to the connection's current database
    pub fn new(pool: &'a Pool<MySql>, schema: Option<&str>) -> Self {
        Self {
            pool,
            schema: schema.map(str::to_string),
        }
    }

    /// Introspect `table_names` into a snapshot.
    ///
    /// A table that cannot be read is recorded as a failure in the snapshot;
    /// only an unreachable server fails the whole call.
    pub async fn snapshot<'n>(
        &self,
        table_names: impl IntoIterator<Item = &'n str>,
    ) -> Result<SchemaSnapshot> {
        sqlx::query("SELECT 1")
            .execute(self.pool)
            .await
            .map_err(|e| Error::IntrospectionUnavailable(e.to_string()))?;

        let mut snapshot = SchemaSnapshot::new();
        for name in table_names {
            match self.read_table(name).await {
                Ok(Some(table)) => snapshot.add_table(table),
                Ok(None) => debug!(table = %name, "Table not present"),
                Err(Error::SqlxError(e)) if is_connection_error(&e) => {
                    return Err(Error::IntrospectionUnavailable(e.to_string()));
                }
                Err(e) => {
                    warn!(table = %name, error = %e, "Table could not be introspected");
                    snapshot.add_failure(name, e.to_string());
                }
            }
        }

        info!(
            tables = snapshot.len(),
            failures = snapshot.failures().count(),
            "MySQL schema introspected"
        );
        Ok(snapshot)
    }

    /// Read one table, or `None` when it does not exist
    pub async fn read_table(&self, table_name: &str) -> Result<Option<TableDefinition>> {
        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR) AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
              AND TABLE_NAME = ?
              AND TABLE_TYPE = 'BASE TABLE'
        "#;

        let exists = sqlx::query_as::<_, TableRow>(sql)
            .bind(self.schema.as_deref())
            .bind(table_name)
            .fetch_optional(self.pool)
            .await?;

        if exists.is_none() {
            return Ok(None);
        }

        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
                   CAST(DATA_TYPE AS CHAR) AS data_type,
                   CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS character_maximum_length,
                   CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                   CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                   CAST(EXTRA AS CHAR) AS extra
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let column_rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(self.schema.as_deref())
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        let sql = r#"
            SELECT CAST(INDEX_NAME AS CHAR) AS index_name,
                   CAST(COLUMN_NAME AS CHAR) AS column_name,
                   CAST(NON_UNIQUE AS SIGNED) AS non_unique,
                   CAST(SEQ_IN_INDEX AS SIGNED) AS seq_in_index
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

        let index_rows = sqlx::query_as::<_, IndexRow>(sql)
            .bind(self.schema.as_deref())
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        let sql = r#"
            SELECT CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
                   CAST(k.COLUMN_NAME AS CHAR) AS column_name,
                   CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
                   CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column,
                   CAST(r.DELETE_RULE AS CHAR) AS delete_rule,
                   CAST(r.UPDATE_RULE AS CHAR) AS update_rule
            FROM information_schema.KEY_COLUMN_USAGE k
            JOIN information_schema.REFERENTIAL_CONSTRAINTS r
              ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
             AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
             AND r.TABLE_NAME = k.TABLE_NAME
            WHERE k.TABLE_SCHEMA = COALESCE(?, DATABASE())
              AND k.TABLE_NAME = ?
              AND k.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#;

        let fk_rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(self.schema.as_deref())
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        Ok(Some(build_table(table_name, column_rows, index_rows, fk_rows)))
    }
}

fn is_connection_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

fn build_table(
    table_name: &str,
    column_rows: Vec<ColumnRow>,
    index_rows: Vec<IndexRow>,
    fk_rows: Vec<ForeignKeyRow>,
) -> TableDefinition {
    let mut table = TableDefinition::new(table_name);

    for row in column_rows {
        table.add_column(build_column(table_name, row));
    }

    let mut indexes: IndexMap<String, IndexDefinition> = IndexMap::new();
    for row in index_rows {
        // Functional index parts have no column
        let Some(column_name) = row.column_name else {
            continue;
        };

        let index = indexes.entry(row.index_name.clone()).or_insert_with(|| {
            let index = IndexDefinition::new(&row.index_name, table_name, &[])
                .unique(row.non_unique == 0);
            if row.index_name == PRIMARY_INDEX_NAME {
                index.primary()
            } else {
                index
            }
        });
        index.columns.insert(row.seq_in_index as u32, column_name);
    }
    for (_, index) in indexes {
        table.add_index(index);
    }

    for row in fk_rows {
        if table.constraint(&row.constraint_name).is_some() {
            debug!(
                table = %table_name,
                constraint = %row.constraint_name,
                "Ignoring additional column of a composite foreign key"
            );
            continue;
        }

        let mut constraint = ConstraintDefinition::new(
            &row.constraint_name,
            table_name,
            &row.column_name,
            &row.referenced_table,
            &row.referenced_column,
        );
        constraint.on_delete = row.delete_rule;
        constraint.on_update = row.update_rule;
        table.add_constraint(constraint);
    }

    table
}

fn build_column(table_name: &str, row: ColumnRow) -> ColumnDefinition {
    let data_type = row.data_type.to_lowercase();
    let length = if LENGTH_TYPES.contains(&data_type.as_str()) {
        row.character_maximum_length
            .and_then(|length| u32::try_from(length).ok())
    } else {
        None
    };

    let auto_increment = row
        .extra
        .as_deref()
        .map(|extra| extra.to_lowercase().contains("auto_increment"))
        .unwrap_or(false);

    let mut column = ColumnDefinition::new(
        table_name,
        &row.column_name,
        SqlDatatype::reported(&data_type, type_code_for_name(&data_type), length),
    )
    .nullable(row.is_nullable.eq_ignore_ascii_case("YES"))
    .auto_increment(auto_increment);
    column.default_value = row.column_default;
    column
}
