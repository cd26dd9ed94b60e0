use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

use schema_reconcile::dialect::Dialect;
use schema_reconcile::introspect::SnapshotFile;
use schema_reconcile::plan::{FindingKind, RepairAction};
use schema_reconcile::reference::ReferenceFile;
use schema_reconcile::schema::types::{ColumnDefinition, TableDefinition};
use schema_reconcile::schema::LogicalType;
use schema_reconcile::utils::document::{parse_document, DocumentFormat};
use schema_reconcile::{
    Capabilities, DatatypeCatalog, Reconciler, ReferenceRegistry, SchemaDefinition,
    SchemaSnapshot,
};

const BLOG: &str = r#"
tables:
  - name: users
    columns:
      - { name: id, type: long, auto_increment: true }
      - { name: email, type: short_text, length: 128 }
      - { name: status, type: short_text, length: 16, default: open }
      - { name: score, type: int, nullable: true, default: 0 }
      - { name: bio, type: text, nullable: true }
    indexes:
      - { name: users_pk, primary: true, columns: [id] }
      - { name: users_email, unique: true, columns: [email] }
      - { name: users_status, columns: [status, score] }
  - name: posts
    columns:
      - { name: id, type: long, auto_increment: true }
      - { name: user_id, type: long }
      - { name: title, type: short_text, length: 200 }
    indexes:
      - { name: posts_pk, primary: true, columns: [id] }
    constraints:
      - { name: fk_posts_user, column: user_id, references_table: users, references_column: id, on_delete: cascade }
"#;

/// What each database reports back after the blog schema was applied
const MYSQL_REPORTED: &str = r#"
tables:
  - name: users
    columns:
      - { name: id, type: bigint, auto_increment: true }
      - { name: email, type: varchar, length: 128 }
      - { name: status, type: varchar, length: 16, default: open }
      - { name: score, type: int, nullable: true, default: "0" }
      - { name: bio, type: text, nullable: true }
    indexes:
      - { name: PRIMARY, primary: true, columns: [id] }
      - { name: users_email, unique: true, columns: [email] }
      - { name: users_status, columns: [status, score] }
  - name: posts
    columns:
      - { name: id, type: bigint, auto_increment: true }
      - { name: user_id, type: bigint }
      - { name: title, type: varchar, length: 200 }
    indexes:
      - { name: PRIMARY, primary: true, columns: [id] }
      - { name: fk_posts_user, columns: [user_id] }
    constraints:
      - { name: fk_posts_user, column: user_id, references_table: users, references_column: id, on_delete: CASCADE, on_update: RESTRICT }
"#;

const MSSQL_REPORTED: &str = r#"
tables:
  - name: users
    columns:
      - { name: id, type: bigint, auto_increment: true }
      - { name: email, type: nvarchar, length: 128 }
      - { name: status, type: nvarchar, length: 16, default: "('open')" }
      - { name: score, type: int, nullable: true, default: "((0))" }
      - { name: bio, type: nvarchar, length: 4000, nullable: true }
    indexes:
      - { name: PK__users__3213E83F, primary: true, columns: [id] }
      - { name: users_email, unique: true, columns: [email] }
      - { name: users_status, columns: [status, score] }
  - name: posts
    columns:
      - { name: id, type: bigint, auto_increment: true }
      - { name: user_id, type: bigint }
      - { name: title, type: nvarchar, length: 200 }
    indexes:
      - { name: PK__posts__3213E83F, primary: true, columns: [id] }
    constraints:
      - { name: fk_posts_user, column: user_id, references_table: users, references_column: id, on_delete: CASCADE, on_update: NO_ACTION }
"#;

const ORACLE_REPORTED: &str = r#"
tables:
  - name: USERS
    columns:
      - { name: ID, type: NUMBER, length: 19, auto_increment: true }
      - { name: EMAIL, type: VARCHAR2, length: 128 }
      - { name: STATUS, type: VARCHAR2, length: 16, default: "'open' " }
      - { name: SCORE, type: NUMBER, length: 10, nullable: true, default: "0 " }
      - { name: BIO, type: VARCHAR2, length: 4000, nullable: true }
    indexes:
      - { name: SYS_C0010, primary: true, columns: [ID] }
      - { name: USERS_EMAIL, unique: true, columns: [EMAIL] }
      - { name: USERS_STATUS, columns: [STATUS, SCORE] }
  - name: POSTS
    columns:
      - { name: ID, type: NUMBER, length: 19, auto_increment: true }
      - { name: USER_ID, type: NUMBER, length: 19 }
      - { name: TITLE, type: VARCHAR2, length: 200 }
    indexes:
      - { name: SYS_C0011, primary: true, columns: [ID] }
    constraints:
      - { name: FK_POSTS_USER, column: USER_ID, references_table: USERS, references_column: ID, on_delete: CASCADE }
"#;

const HSQL_REPORTED: &str = r#"
tables:
  - name: USERS
    columns:
      - { name: ID, type: BIGINT, auto_increment: true }
      - { name: EMAIL, type: VARCHAR, length: 128 }
      - { name: STATUS, type: VARCHAR, length: 16, default: "'open'" }
      - { name: SCORE, type: INTEGER, nullable: true, default: "0" }
      - { name: BIO, type: VARCHAR, length: 16777216, nullable: true }
    indexes:
      - { name: SYS_IDX_SYS_PK_10092_10093, primary: true, columns: [ID] }
      - { name: USERS_EMAIL, unique: true, columns: [EMAIL] }
      - { name: USERS_STATUS, columns: [STATUS, SCORE] }
  - name: POSTS
    columns:
      - { name: ID, type: BIGINT, auto_increment: true }
      - { name: USER_ID, type: BIGINT }
      - { name: TITLE, type: VARCHAR, length: 200 }
    indexes:
      - { name: SYS_IDX_SYS_PK_10100_10101, primary: true, columns: [ID] }
    constraints:
      - { name: FK_POSTS_USER, column: USER_ID, references_table: USERS, references_column: ID, on_delete: CASCADE }
"#;

fn reference(yaml: &str, dialect: Dialect) -> SchemaDefinition {
    let file: ReferenceFile = parse_document(yaml, DocumentFormat::Yaml).unwrap();
    let mut registry = ReferenceRegistry::new();
    registry.register_file("inline", file).unwrap();
    registry
        .to_schema_definition(dialect, &DatatypeCatalog::builtin())
        .unwrap()
}

fn snapshot(yaml: &str) -> SchemaSnapshot {
    let file: SnapshotFile = parse_document(yaml, DocumentFormat::Yaml).unwrap();
    SchemaSnapshot::from(file)
}

/// The reference schema as if every table had been created exactly
fn applied(schema: &SchemaDefinition) -> SchemaSnapshot {
    let mut snapshot = SchemaSnapshot::new();
    for table in schema.tables.values() {
        snapshot.add_table(table.clone());
    }
    snapshot
}

fn reconciler(dialect: Dialect) -> Reconciler<'static> {
    Reconciler::new(dialect.renderer(), Capabilities::default())
}

#[rstest]
#[case(Dialect::MySql, MYSQL_REPORTED)]
#[case(Dialect::MsSql, MSSQL_REPORTED)]
#[case(Dialect::Oracle, ORACLE_REPORTED)]
#[case(Dialect::Hsql, HSQL_REPORTED)]
fn test_empty_database_gets_everything_created(#[case] dialect: Dialect, #[case] reported: &str) {
    let schema = reference(BLOG, dialect);
    let result = reconciler(dialect).reconcile(&schema, &SchemaSnapshot::new()).unwrap();

    let actions: Vec<_> = result.plan.groups.iter().map(|g| g.action).collect();
    assert_eq!(
        actions,
        vec![
            RepairAction::CreateTable,
            RepairAction::CreateTable,
            RepairAction::SyncConstraint
        ]
    );
    assert!(result.findings.is_empty());

    let created: Vec<_> = result
        .plan
        .groups
        .iter()
        .filter(|g| g.action == RepairAction::CreateTable)
        .map(|g| g.table_name.as_str())
        .collect();
    assert_eq!(created, vec!["users", "posts"]);

    // What the database reports after running the plan needs no further repair
    let after = snapshot(reported);
    for table in &created {
        assert!(after.tables().any(|t| t.table_name.eq_ignore_ascii_case(table)));
    }
    let second = reconciler(dialect).reconcile(&schema, &after).unwrap();
    assert!(second.is_clean(), "{:#?}", second);
}

#[rstest]
#[case(Dialect::MySql, MYSQL_REPORTED)]
#[case(Dialect::MsSql, MSSQL_REPORTED)]
#[case(Dialect::Oracle, ORACLE_REPORTED)]
#[case(Dialect::Hsql, HSQL_REPORTED)]
fn test_reported_metadata_converges(#[case] dialect: Dialect, #[case] reported: &str) {
    let schema = reference(BLOG, dialect);
    let result = reconciler(dialect).reconcile(&schema, &snapshot(reported)).unwrap();
    assert!(result.is_clean(), "{:#?}", result);
}

#[rstest]
#[case(Dialect::MySql)]
#[case(Dialect::MsSql)]
#[case(Dialect::Oracle)]
#[case(Dialect::Hsql)]
fn test_normalized_default_is_a_fixed_point(#[case] dialect: Dialect) {
    let renderer = dialect.renderer();
    let samples = [
        "(('x'))",
        "'open' ",
        "((0))",
        "\"quoted\"",
        "NULL",
        "''",
        "getdate()",
        "'(a)'",
        "  CURRENT_TIMESTAMP ",
    ];

    for raw in samples {
        let once = renderer.normalize_default(Some(raw));
        let twice = renderer.normalize_default(once.as_deref());
        assert_eq!(once, twice, "{} on {}", raw, dialect);
    }
    for null in ["NULL", "'NULL'", "\"NULL\"", "null", ""] {
        assert_eq!(renderer.normalize_default(Some(null)), None, "{} on {}", null, dialect);
    }
    assert_eq!(renderer.normalize_default(None), None);
}

#[rstest]
#[case(Dialect::MySql, "current_timestamp", "DATETIME", "CURRENT_TIMESTAMP")]
#[case(Dialect::MsSql, "GETDATE()", "datetime", "(getdate())")]
#[case(Dialect::Oracle, "sysdate", "TIMESTAMP", "SYSDATE ")]
#[case(Dialect::Hsql, "Current_Timestamp", "TIMESTAMP", "CURRENT_TIMESTAMP")]
fn test_expression_default_ignores_case(
    #[case] dialect: Dialect,
    #[case] declared: &str,
    #[case] reported_type: &str,
    #[case] reported_default: &str,
) {
    let schema = reference(
        &format!(
            "tables:\n  - name: t\n    columns:\n      - {{ name: created, type: date, nullable: true, default: \"{}\" }}\n",
            declared
        ),
        dialect,
    );
    let actual = snapshot(&format!(
        "tables:\n  - name: t\n    columns:\n      - {{ name: created, type: {}, nullable: true, default: \"{}\" }}\n",
        reported_type, reported_default
    ));

    let result = reconciler(dialect).reconcile(&schema, &actual).unwrap();
    assert!(result.is_clean(), "{:#?}", result);

    let renderer = dialect.renderer();
    assert_eq!(
        renderer.normalize_default(Some(declared)),
        renderer.normalize_default(Some(reported_default))
    );
}

#[rstest]
#[case(vec![0, 1, 2, 3, 4])]
#[case(vec![4, 3, 2, 1, 0])]
#[case(vec![2, 0, 4, 1, 3])]
#[case(vec![1, 0, 2, 3, 4])]
fn test_column_order_is_ignored(#[case] order: Vec<usize>) {
    let schema = reference(BLOG, Dialect::MySql);
    let mut snapshot = applied(&schema);

    let mut users = schema.table("users").unwrap().clone();
    let columns: Vec<_> = users.columns.values().cloned().collect();
    users.columns = order
        .iter()
        .map(|&i| (columns[i].column_name.clone(), columns[i].clone()))
        .collect();
    snapshot.add_table(users);

    let result = reconciler(Dialect::MySql).reconcile(&schema, &snapshot).unwrap();
    assert!(result.is_clean());
}

/// users has drifted in every way the engine repairs; posts is missing
const MYSQL_DRIFTED: &str = r#"
tables:
  - name: users
    columns:
      - { name: id, type: bigint, auto_increment: true }
      - { name: email, type: varchar, length: 64 }
      - { name: status, type: varchar, length: 16, default: open }
      - { name: score, type: int, nullable: true, default: "0" }
      - { name: legacy_a, type: int }
      - { name: legacy_b, type: varchar, length: 10 }
      - { name: legacy_c, type: datetime, nullable: true }
      - { name: legacy_d, type: text, nullable: true }
      - { name: legacy_e, type: tinyint, default: "1" }
      - { name: legacy_f, type: bigint }
    indexes:
      - { name: PRIMARY, primary: true, columns: [id] }
      - { name: users_email, columns: [email] }
      - { name: users_legacy, columns: [legacy_a] }
"#;

#[test]
fn test_capabilities_gate_emission_only() {
    let schema = reference(BLOG, Dialect::MySql);
    let actual = snapshot(MYSQL_DRIFTED);

    let repaired = reconciler(Dialect::MySql).reconcile(&schema, &actual).unwrap();
    let groups: Vec<_> = repaired
        .plan
        .groups
        .iter()
        .map(|g| (g.action, g.table_name.as_str(), g.target_name.as_str()))
        .collect();
    assert_eq!(
        groups,
        vec![
            (RepairAction::CreateTable, "posts", "posts"),
            (RepairAction::AddColumn, "users", "bio"),
            (RepairAction::AlterColumn, "users", "email"),
            (RepairAction::RebuildIndex, "users", "users_email"),
            (RepairAction::AddIndex, "users", "users_status"),
            (RepairAction::SyncConstraint, "posts", "fk_posts_user"),
        ]
    );
    assert!(repaired.findings.is_empty());

    let detected = Reconciler::new(Dialect::MySql.renderer(), Capabilities::none())
        .reconcile(&schema, &actual)
        .unwrap();
    assert!(detected.plan.is_empty());
    let kinds: Vec<_> = detected.findings.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FindingKind::MissingTable,
            FindingKind::IncorrectColumn,
            FindingKind::MissingColumn,
            FindingKind::MismatchedIndex,
            FindingKind::MissingIndex,
        ]
    );
}

#[rstest]
#[case(Dialect::MySql)]
#[case(Dialect::MsSql)]
#[case(Dialect::Oracle)]
#[case(Dialect::Hsql)]
fn test_nothing_is_ever_dropped(#[case] dialect: Dialect) {
    let schema = reference(BLOG, dialect);
    let result = reconciler(dialect)
        .reconcile(&schema, &snapshot(MYSQL_DRIFTED))
        .unwrap();

    assert!(!result.plan.is_empty());
    for statement in result.plan.statements() {
        let upper = statement.to_uppercase();
        assert!(!upper.contains("DROP TABLE"), "{}", statement);
        assert!(!upper.contains("DROP COLUMN"), "{}", statement);
        assert!(!upper.contains("LEGACY"), "{}", statement);
    }
}

const QUICKNAME: &str = r#"
tables:
  - name: t
    columns:
      - { name: id, type: int, auto_increment: true }
      - { name: name, type: short_text, length: 32, nullable: true }
      - { name: quickname, type: short_text, length: 32, nullable: true }
    indexes:
      - { name: t_pk, primary: true, columns: [id] }
"#;

#[test]
fn test_mysql_adds_missing_nullable_column() {
    let schema = reference(QUICKNAME, Dialect::MySql);
    let actual = snapshot(
        r#"
tables:
  - name: t
    columns:
      - { name: id, type: int, auto_increment: true }
      - { name: name, type: varchar, length: 32, nullable: true }
    indexes:
      - { name: PRIMARY, primary: true, columns: [id] }
"#,
    );

    let result = reconciler(Dialect::MySql).reconcile(&schema, &actual).unwrap();
    assert_eq!(result.plan.groups.len(), 1);
    assert_eq!(result.plan.groups[0].action, RepairAction::AddColumn);
    assert_eq!(
        result.plan.groups[0].statements,
        vec!["ALTER TABLE t ADD `quickname` VARCHAR(32) DEFAULT NULL"]
    );
    assert!(result.findings.is_empty());
}

#[test]
fn test_oracle_adds_autoincrement_column_with_sequence_and_trigger() {
    let schema = reference(QUICKNAME, Dialect::Oracle);
    let actual = snapshot(
        r#"
tables:
  - name: T
    columns:
      - { name: NAME, type: VARCHAR2, length: 32, nullable: true }
      - { name: QUICKNAME, type: VARCHAR2, length: 32, nullable: true }
"#,
    );

    let result = reconciler(Dialect::Oracle).reconcile(&schema, &actual).unwrap();
    let groups = &result.plan.groups;
    assert_eq!(groups.len(), 2);

    assert_eq!(groups[0].action, RepairAction::AddColumn);
    assert_eq!(
        groups[0].statements,
        vec![
            "ALTER TABLE t ADD id NUMBER(10) NOT NULL",
            "CREATE SEQUENCE \"t_sequence\" START WITH 1 INCREMENT BY 1 NOCACHE",
            "CREATE OR REPLACE TRIGGER \"t_trigger\" BEFORE INSERT ON t FOR EACH ROW \
             WHEN (new.id IS NULL) BEGIN SELECT \"t_sequence\".NEXTVAL INTO :new.id FROM dual; END;",
            "ALTER TRIGGER \"t_trigger\" ENABLE",
        ]
    );

    assert_eq!(groups[1].action, RepairAction::AddIndex);
    assert_eq!(
        groups[1].statements,
        vec!["ALTER TABLE t ADD CONSTRAINT T_PK PRIMARY KEY (id)"]
    );
}

#[rstest]
#[case(
    Dialect::MySql,
    MYSQL_REPORTED,
    "[status, score]",
    "[score, status]",
    vec!["DROP INDEX `users_status` ON users", "CREATE INDEX `users_status` ON users (`status`, `score`)"]
)]
#[case(
    Dialect::Oracle,
    ORACLE_REPORTED,
    "[STATUS, SCORE]",
    "[SCORE, STATUS]",
    vec!["DROP INDEX USERS_STATUS", "CREATE INDEX USERS_STATUS ON users (status, score)"]
)]
#[case(
    Dialect::MySql,
    MYSQL_REPORTED,
    "[status, score]",
    "[status]",
    vec!["DROP INDEX `users_status` ON users", "CREATE INDEX `users_status` ON users (`status`, `score`)"]
)]
#[case(
    Dialect::Oracle,
    ORACLE_REPORTED,
    "[STATUS, SCORE]",
    "[STATUS]",
    vec!["DROP INDEX USERS_STATUS", "CREATE INDEX USERS_STATUS ON users (status, score)"]
)]
fn test_changed_index_is_rebuilt_in_one_group(
    #[case] dialect: Dialect,
    #[case] reported: &str,
    #[case] from: &str,
    #[case] to: &str,
    #[case] expected: Vec<&str>,
) {
    let schema = reference(BLOG, dialect);
    let actual = snapshot(&reported.replace(from, to));

    let result = reconciler(dialect).reconcile(&schema, &actual).unwrap();
    assert_eq!(result.plan.groups.len(), 1);
    let group = &result.plan.groups[0];
    assert_eq!(group.action, RepairAction::RebuildIndex);
    assert_eq!(group.target_name, "users_status");
    assert_eq!(group.statements, expected);
}

/// posts as MySQL reports it, without its foreign key
const MYSQL_POSTS_ONLY: &str = r#"
tables:
  - name: posts
    columns:
      - { name: id, type: bigint, auto_increment: true }
      - { name: user_id, type: bigint }
      - { name: title, type: varchar, length: 200 }
    indexes:
      - { name: PRIMARY, primary: true, columns: [id] }
"#;

#[test]
fn test_foreign_key_to_uncreated_table_is_reported() {
    let schema = reference(BLOG, Dialect::MySql);
    let policy = Capabilities {
        create_missing_tables: false,
        ..Capabilities::default()
    };

    let result = Reconciler::new(Dialect::MySql.renderer(), policy)
        .reconcile(&schema, &snapshot(MYSQL_POSTS_ONLY))
        .unwrap();

    assert!(result.plan.is_empty(), "{:#?}", result.plan);
    let findings: Vec<_> = result
        .findings
        .iter()
        .map(|f| (f.kind, f.table_name.as_str(), f.target_name.as_str()))
        .collect();
    assert_eq!(
        findings,
        vec![
            (FindingKind::MissingTable, "users", "users"),
            (FindingKind::ConstraintDrift, "posts", "fk_posts_user"),
        ]
    );
    assert_eq!(
        result.findings[1].actual.as_deref(),
        Some("table users does not exist")
    );
}

#[test]
fn test_foreign_key_to_introspection_failure_is_reported() {
    let schema = reference(BLOG, Dialect::MySql);
    let mut actual = snapshot(MYSQL_POSTS_ONLY);
    actual.add_failure("users", "Lock wait timeout exceeded");

    let result = reconciler(Dialect::MySql).reconcile(&schema, &actual).unwrap();

    assert!(result.plan.partial);
    assert!(result.plan.is_empty());
    let kinds: Vec<_> = result.findings.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![FindingKind::IntrospectionFailed, FindingKind::ConstraintDrift]
    );
}

#[test]
fn test_index_on_unadded_column_is_reported() {
    let schema = reference(BLOG, Dialect::MySql);
    let actual = snapshot(
        &MYSQL_REPORTED
            .replace("      - { name: score, type: int, nullable: true, default: \"0\" }\n", "")
            .replace("      - { name: users_status, columns: [status, score] }\n", ""),
    );
    let policy = Capabilities {
        add_missing_columns: false,
        ..Capabilities::default()
    };

    let result = Reconciler::new(Dialect::MySql.renderer(), policy)
        .reconcile(&schema, &actual)
        .unwrap();

    assert!(result.plan.is_empty(), "{:#?}", result.plan);
    let kinds: Vec<_> = result.findings.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FindingKind::MissingColumn, FindingKind::MissingIndex]);
    assert_eq!(result.findings[1].target_name, "users_status");
    assert_eq!(
        result.findings[1].actual.as_deref(),
        Some("column users.score does not exist")
    );
}

#[rstest]
#[case(Dialect::MySql)]
#[case(Dialect::MsSql)]
#[case(Dialect::Oracle)]
#[case(Dialect::Hsql)]
fn test_created_table_foreign_keys_follow_column_capability(#[case] dialect: Dialect) {
    let schema = reference(BLOG, dialect);
    let policy = Capabilities {
        alter_incorrect_columns: false,
        ..Capabilities::default()
    };

    let result = Reconciler::new(dialect.renderer(), policy)
        .reconcile(&schema, &SchemaSnapshot::new())
        .unwrap();

    let actions: Vec<_> = result.plan.groups.iter().map(|g| g.action).collect();
    assert_eq!(actions, vec![RepairAction::CreateTable, RepairAction::CreateTable]);
    for statement in result.plan.statements() {
        assert!(!statement.to_uppercase().contains("FOREIGN KEY"), "{}", statement);
    }
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].kind, FindingKind::ConstraintDrift);
    assert_eq!(result.findings[0].target_name, "fk_posts_user");
}

#[test]
fn test_unavailable_snapshot_table_makes_plan_partial() {
    let schema = reference(BLOG, Dialect::MySql);
    let mut actual = snapshot(MYSQL_REPORTED);
    actual.add_failure("posts", "Lock wait timeout exceeded");

    let result = reconciler(Dialect::MySql).reconcile(&schema, &actual).unwrap();
    assert!(result.plan.partial);
    assert!(result.plan.is_empty());
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].kind, FindingKind::IntrospectionFailed);
    assert!(!result.is_clean());
}

#[test]
fn test_client_plans_from_config_and_snapshot_file() {
    let dir = tempdir().unwrap();
    let schema_dir = dir.path().join("schema");
    fs::create_dir(&schema_dir).unwrap();
    fs::write(schema_dir.join("blog.yaml"), BLOG).unwrap();
    fs::write(dir.path().join("snapshot.yaml"), MYSQL_REPORTED).unwrap();

    let config_path = dir.path().join("schema_reconcile.toml");
    fs::write(
        &config_path,
        format!(
            "[database]\ndialect = \"mysql\"\n\n[reference]\npaths = [\"{}\"]\n\n[output]\ndirectory = \"{}\"\n",
            schema_dir.display(),
            dir.path().join("plans").display()
        ),
    )
    .unwrap();

    let client = schema_reconcile::init(&config_path).unwrap();
    assert_eq!(client.dialect(), Dialect::MySql);
    assert_eq!(client.reference().tables.len(), 2);

    let reported = SchemaSnapshot::from_file(&dir.path().join("snapshot.yaml")).unwrap();
    assert!(client.plan(&reported).unwrap().is_clean());

    let result = client.plan(&SchemaSnapshot::new()).unwrap();
    let path = client.write_plan(&result).unwrap();
    let script = fs::read_to_string(path).unwrap();
    assert!(script.contains("CREATE TABLE users ("));
    assert!(script.contains(
        "ALTER TABLE posts ADD CONSTRAINT `fk_posts_user` FOREIGN KEY (`user_id`) REFERENCES users (`id`) ON DELETE CASCADE;"
    ));
}

fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut all = Vec::new();
    for (i, first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, *first);
            all.push(tail);
        }
    }
    all
}

#[rstest]
#[case(Dialect::MySql)]
#[case(Dialect::MsSql)]
#[case(Dialect::Oracle)]
#[case(Dialect::Hsql)]
fn test_create_table_keeps_column_order(#[case] dialect: Dialect) {
    let catalog = DatatypeCatalog::builtin();
    let orders = permutations(&["alpha", "bravo", "charlie", "delta", "echo"]);
    assert_eq!(orders.len(), 120);

    for order in orders {
        let mut table = TableDefinition::new("t");
        for name in &order {
            let data_type = catalog.resolve(LogicalType::Int, dialect).unwrap();
            table.add_column(ColumnDefinition::new("t", name, data_type).nullable(true));
        }

        let statements = dialect.renderer().render_create_table(&table).unwrap();
        let positions: Vec<usize> = order
            .iter()
            .map(|name| statements[0].find(name).unwrap())
            .collect();
        assert!(
            positions.windows(2).all(|pair| pair[0] < pair[1]),
            "{:?} rendered as {}",
            order,
            statements[0]
        );
    }
}

#[rstest]
#[case(Dialect::MySql)]
#[case(Dialect::MsSql)]
#[case(Dialect::Oracle)]
#[case(Dialect::Hsql)]
fn test_add_only_policy_adds_exactly_the_missing_column(#[case] dialect: Dialect) {
    let catalog = DatatypeCatalog::builtin();
    let int = || catalog.resolve(LogicalType::Int, dialect).unwrap();

    let mut actual = TableDefinition::new("wide");
    for i in 0..10 {
        actual.add_column(ColumnDefinition::new("wide", &format!("c{}", i), int()).nullable(true));
    }
    let mut snapshot = SchemaSnapshot::new();
    snapshot.add_table(actual);

    let mut wide = TableDefinition::new("wide");
    for name in ["c1", "c4", "c7"] {
        wide.add_column(ColumnDefinition::new("wide", name, int()).nullable(true));
    }
    wide.add_column(ColumnDefinition::new("wide", "added", int()).nullable(true));
    let mut schema = SchemaDefinition::new();
    schema.add_table(wide);

    let policy = Capabilities {
        add_missing_columns: true,
        ..Capabilities::none()
    };
    let result = Reconciler::new(dialect.renderer(), policy)
        .reconcile(&schema, &snapshot)
        .unwrap();

    assert_eq!(result.plan.groups.len(), 1);
    assert_eq!(result.plan.groups[0].action, RepairAction::AddColumn);
    assert_eq!(result.plan.groups[0].target_name, "added");
    assert!(result.findings.is_empty());
}

#[test]
fn test_missing_table_with_creation_disabled_is_only_reported() {
    let schema = reference(QUICKNAME, Dialect::Hsql);
    let policy = Capabilities {
        create_missing_tables: false,
        ..Capabilities::default()
    };

    let result = Reconciler::new(Dialect::Hsql.renderer(), policy)
        .reconcile(&schema, &SchemaSnapshot::new())
        .unwrap();

    assert!(result.plan.is_empty());
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].kind, FindingKind::MissingTable);
    assert_eq!(result.findings[0].table_name, "t");
}

#[test]
fn test_oracle_creates_table_then_sequence_and_trigger() {
    let schema = reference(QUICKNAME, Dialect::Oracle);
    let result = reconciler(Dialect::Oracle)
        .reconcile(&schema, &SchemaSnapshot::new())
        .unwrap();

    assert_eq!(result.plan.groups.len(), 1);
    let statements = &result.plan.groups[0].statements;
    assert_eq!(statements.len(), 4);
    assert_eq!(
        statements[0],
        "CREATE TABLE t (id NUMBER(10) NOT NULL, name VARCHAR2(32), quickname VARCHAR2(32), \
         CONSTRAINT T_PK PRIMARY KEY (id))"
    );
    assert_eq!(
        statements[1],
        "CREATE SEQUENCE \"t_sequence\" START WITH 1 INCREMENT BY 1 NOCACHE"
    );
    assert!(statements[2].starts_with("CREATE OR REPLACE TRIGGER \"t_trigger\" BEFORE INSERT ON t"));
    assert_eq!(statements[3], "ALTER TRIGGER \"t_trigger\" ENABLE");
}
