//! Naming utilities
//!
//! Derived identifiers (sequences, triggers) and plan file names.

use chrono::{DateTime, Utc};

use crate::dialect::Dialect;

/// Hex digits of the md5 kept when an identifier is truncated
const HASH_LENGTH: usize = 8;

/// Truncate an identifier to fit database limits.
///
/// Names that are too long keep a prefix and gain a short md5 of the full
/// name, so two long names sharing a prefix still differ.
pub fn truncate_identifier(name: &str, max_length: usize) -> String {
    if name.len() <= max_length {
        return name.to_string();
    }

    let hash = format!("{:x}", md5::compute(name.as_bytes()));
    if max_length <= HASH_LENGTH + 1 {
        return hash[..max_length.min(hash.len())].to_string();
    }

    let mut keep_length = max_length - HASH_LENGTH - 1;
    while !name.is_char_boundary(keep_length) {
        keep_length -= 1;
    }

    format!("{}_{}", &name[..keep_length], &hash[..HASH_LENGTH])
}

/// Maximum identifier length for a dialect
pub fn max_identifier_length(dialect: Dialect) -> usize {
    match dialect {
        Dialect::MySql => 64,
        Dialect::MsSql => 128,
        // 12.1 and earlier
        Dialect::Oracle => 30,
        Dialect::Hsql => 128,
    }
}

/// `<table>_<suffix>`, shortened to the dialect's identifier limit
pub fn derived_identifier(dialect: Dialect, table_name: &str, suffix: &str) -> String {
    truncate_identifier(
        &format!("{}_{}", table_name, suffix),
        max_identifier_length(dialect),
    )
}

/// Format name as a valid file name
pub fn format_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// `<timestamp>_reconcile_<dialect>.sql`
pub fn create_plan_file_name(dialect: Dialect, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.sql",
        at.format("%Y%m%d%H%M%S"),
        format_file_name(&format!("reconcile {}", dialect))
    )
}
