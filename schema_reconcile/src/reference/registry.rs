//! Reference registry
//!
//! Discovers reference files on disk and materializes them into a schema
//! definition for one dialect.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ReferenceConfig;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::reference::{ColumnEntry, ConstraintEntry, IndexEntry, ReferenceFile, TableEntry};
use crate::schema::datatype::{DatatypeCatalog, LogicalType};
use crate::schema::types::{
    ColumnDefinition, ConstraintDefinition, IndexDefinition, SchemaDefinition, TableDefinition,
};
use crate::utils::document::{read_document, DocumentFormat};

/// Registry of reference tables collected from files
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    /// Lower-cased table name → (source, entry), in load order
    tables: IndexMap<String, (String, TableEntry)>,
}

impl ReferenceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the configured paths for reference files and register them
    pub fn scan_and_register(&mut self, config: &ReferenceConfig) -> Result<()> {
        let exclude_paths: Vec<PathBuf> = config.exclude_paths.iter().map(PathBuf::from).collect();

        for base in &config.paths {
            let base_path = Path::new(base);
            if !base_path.exists() {
                return Err(Error::ConfigError(format!(
                    "Reference path does not exist: {}",
                    base
                )));
            }

            if base_path.is_file() {
                self.load_file(base_path)?;
                continue;
            }

            let max_depth = if config.recursive_scan { usize::MAX } else { 1 };
            for entry in WalkDir::new(base_path)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !exclude_paths.iter().any(|ex| e.path().starts_with(ex)))
            {
                let entry = entry.map_err(|e| {
                    Error::ConfigError(format!("Failed to scan {}: {}", base, e))
                })?;
                let path = entry.path();

                if path.is_file() && DocumentFormat::from_path(path).is_some() {
                    self.load_file(path)?;
                }
            }
        }

        info!(tables = self.tables.len(), "Reference schema registered");
        Ok(())
    }

    /// Load a single reference file
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let file: ReferenceFile = read_document(path)?;
        debug!(path = %path.display(), tables = file.tables.len(), "Loaded reference file");
        self.register_file(&path.display().to_string(), file)
    }

    /// Register every table of `file`; `source` names it in errors
    pub fn register_file(&mut self, source: &str, file: ReferenceFile) -> Result<()> {
        for table in file.tables {
            let key = table.name.to_lowercase();
            if let Some((previous, _)) = self.tables.get(&key) {
                return Err(Error::ConfigError(format!(
                    "Table {} is defined in both {} and {}",
                    table.name, previous, source
                )));
            }
            self.tables.insert(key, (source.to_string(), table));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Registered table names in load order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.values().map(|(_, table)| table.name.as_str())
    }

    /// Materialize the registered tables for `dialect`
    pub fn to_schema_definition(
        &self,
        dialect: Dialect,
        catalog: &DatatypeCatalog,
    ) -> Result<SchemaDefinition> {
        let mut schema = SchemaDefinition::new();

        for (source, entry) in self.tables.values() {
            let table = build_table(entry, dialect, catalog).map_err(|e| match e {
                Error::ConfigError(message) => {
                    Error::ConfigError(format!("{} ({})", message, source))
                }
                other => other,
            })?;
            schema.add_table(table);
        }

        Ok(schema)
    }
}

fn build_table(
    entry: &TableEntry,
    dialect: Dialect,
    catalog: &DatatypeCatalog,
) -> Result<TableDefinition> {
    if entry.columns.is_empty() {
        return Err(Error::ConfigError(format!(
            "Table {} has no columns",
            entry.name
        )));
    }

    let mut table = TableDefinition::new(&entry.name);
    let mut seen = HashSet::new();

    for column in &entry.columns {
        if !seen.insert(column.name.to_lowercase()) {
            return Err(Error::ConfigError(format!(
                "Duplicate column {}.{}",
                entry.name, column.name
            )));
        }
        table.add_column(build_column(&entry.name, column, dialect, catalog)?);
    }

    if entry.columns.iter().filter(|c| c.auto_increment).count() > 1 {
        return Err(Error::ConfigError(format!(
            "Table {} has more than one autoincrement column",
            entry.name
        )));
    }

    let mut has_primary = false;
    for index in &entry.indexes {
        if index.primary {
            if has_primary {
                return Err(Error::ConfigError(format!(
                    "Table {} has more than one primary index",
                    entry.name
                )));
            }
            has_primary = true;
        }
        table.add_index(build_index(&table, index, dialect)?);
    }

    for constraint in &entry.constraints {
        table.add_constraint(build_constraint(&table, constraint)?);
    }

    Ok(table)
}

fn build_column(
    table_name: &str,
    entry: &ColumnEntry,
    dialect: Dialect,
    catalog: &DatatypeCatalog,
) -> Result<ColumnDefinition> {
    let logical =
        LogicalType::from_name(&entry.logical_type, entry.length).map_err(|e| match e {
            Error::ConfigError(message) => {
                Error::ConfigError(format!("Column {}.{}: {}", table_name, entry.name, message))
            }
            other => other,
        })?;
    let data_type = catalog.resolve(logical, dialect)?;

    let mut column = ColumnDefinition::new(table_name, &entry.name, data_type)
        .nullable(entry.nullable)
        .auto_increment(entry.auto_increment);
    if let Some(default) = &entry.default {
        column = column.default_value(&default.to_sql_value());
    }

    Ok(column)
}

fn build_index(table: &TableDefinition, entry: &IndexEntry, dialect: Dialect) -> Result<IndexDefinition> {
    if entry.columns.is_empty() {
        return Err(Error::ConfigError(format!(
            "Index {} on {} has no columns",
            entry.name, table.table_name
        )));
    }

    let mut columns = Vec::with_capacity(entry.columns.len());
    for name in &entry.columns {
        let column = table.column(name).ok_or_else(|| {
            Error::ConfigError(format!(
                "Index {} references unknown column {}.{}",
                entry.name, table.table_name, name
            ))
        })?;
        columns.push(column.column_name.as_str());
    }

    let mut index = IndexDefinition::new(&entry.name, &table.table_name, &columns)
        .unique(entry.unique)
        .uppercase(dialect.forces_uppercase());
    if entry.primary {
        index = index.primary();
    }

    Ok(index)
}

fn build_constraint(table: &TableDefinition, entry: &ConstraintEntry) -> Result<ConstraintDefinition> {
    let column = table.column(&entry.column).ok_or_else(|| {
        Error::ConfigError(format!(
            "Foreign key {} references unknown column {}.{}",
            entry.name, table.table_name, entry.column
        ))
    })?;

    let mut constraint = ConstraintDefinition::new(
        &entry.name,
        &table.table_name,
        &column.column_name,
        &entry.references_table,
        &entry.references_column,
    );
    if let Some(action) = &entry.on_delete {
        constraint = constraint.on_delete(action);
    }
    if let Some(action) = &entry.on_update {
        constraint = constraint.on_update(action);
    }

    Ok(constraint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::document::{parse_document, DocumentFormat};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const USERS: &str = r#"
        [[tables]]
        name = "users"
        columns = [
            { name = "id", type = "long", auto_increment = true },
            { name = "email", type = "short_text", length = 128 },
            { name = "bio", type = "text", nullable = true },
        ]
        indexes = [
            { name = "users_pk", primary = true, columns = ["id"] },
            { name = "users_email", unique = true, columns = ["EMAIL"] },
        ]
    "#;

    const POSTS: &str = r#"
tables:
  - name: posts
    columns:
      - { name: id, type: long, auto_increment: true }
      - { name: user_id, type: long }
    constraints:
      - name: fk_posts_user
        column: user_id
        references_table: users
        references_column: id
        on_delete: cascade
"#;

    fn reference(content: &str, format: DocumentFormat) -> ReferenceFile {
        parse_document(content, format).unwrap()
    }

    #[test]
    fn test_materialize_for_dialect() {
        let mut registry = ReferenceRegistry::new();
        registry
            .register_file("users.toml", reference(USERS, DocumentFormat::Toml))
            .unwrap();

        let schema = registry
            .to_schema_definition(Dialect::Oracle, &DatatypeCatalog::builtin())
            .unwrap();
        let users = schema.table("USERS").unwrap();

        assert_eq!(
            users.columns.keys().collect::<Vec<_>>(),
            vec!["id", "email", "bio"]
        );
        assert_eq!(users.column("email").unwrap().data_type.sql_type_name, "VARCHAR2(128)");
        assert_eq!(users.column("bio").unwrap().data_type.sql_type_name, "VARCHAR2(4000)");
        let unique = users.index("users_email").unwrap();
        assert_eq!(unique.rendered_name(), "USERS_EMAIL");
        assert_eq!(unique.column_names().collect::<Vec<_>>(), vec!["email"]);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut registry = ReferenceRegistry::new();
        registry
            .register_file("a.toml", reference(USERS, DocumentFormat::Toml))
            .unwrap();
        let err = registry
            .register_file("b.toml", reference(USERS, DocumentFormat::Toml))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref m) if m.contains("a.toml") && m.contains("b.toml")));
    }

    #[test]
    fn test_invalid_definitions_rejected() {
        let cases = [
            r#"{"tables":[{"name":"t","columns":[{"name":"a","type":"geometry"}]}]}"#,
            r#"{"tables":[{"name":"t","columns":[{"name":"a","type":"int"},{"name":"A","type":"int"}]}]}"#,
            r#"{"tables":[{"name":"t","columns":[{"name":"a","type":"int"}],
                "indexes":[{"name":"i","columns":["b"]}]}]}"#,
            r#"{"tables":[{"name":"t","columns":[{"name":"a","type":"int"}],
                "indexes":[{"name":"p1","primary":true,"columns":["a"]},
                           {"name":"p2","primary":true,"columns":["a"]}]}]}"#,
            r#"{"tables":[{"name":"t","columns":[{"name":"a","type":"int"}],
                "constraints":[{"name":"fk","column":"b","references_table":"u","references_column":"id"}]}]}"#,
            r#"{"tables":[{"name":"t","columns":[]}]}"#,
        ];

        for case in cases {
            let mut registry = ReferenceRegistry::new();
            registry
                .register_file("case.json", reference(case, DocumentFormat::Json))
                .unwrap();
            let err = registry
                .to_schema_definition(Dialect::MySql, &DatatypeCatalog::builtin())
                .unwrap_err();
            assert!(matches!(err, Error::ConfigError(_)), "{}", case);
        }
    }

    #[test]
    fn test_scan_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("users.toml"), USERS).unwrap();
        fs::create_dir(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("blog/posts.yaml"), POSTS).unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts/posts.yml"), POSTS).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a reference").unwrap();

        let config = ReferenceConfig {
            paths: vec![dir.path().display().to_string()],
            exclude_paths: vec![dir.path().join("drafts").display().to_string()],
            recursive_scan: true,
        };

        let mut registry = ReferenceRegistry::new();
        registry.scan_and_register(&config).unwrap();
        assert_eq!(registry.table_names().collect::<Vec<_>>(), vec!["posts", "users"]);

        let schema = registry
            .to_schema_definition(Dialect::MySql, &DatatypeCatalog::builtin())
            .unwrap();
        let fk = schema.table("posts").unwrap().constraint("fk_posts_user").unwrap();
        assert_eq!(fk.on_delete.as_deref(), Some("cascade"));
    }

    #[test]
    fn test_scan_missing_path() {
        let config = ReferenceConfig {
            paths: vec!["/nonexistent/reference".into()],
            exclude_paths: Vec::new(),
            recursive_scan: false,
        };
        assert!(ReferenceRegistry::new().scan_and_register(&config).is_err());
    }
}
